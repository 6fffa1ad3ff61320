//! Vector index abstraction for knowledge chunks.
//!
//! An index maps positions to vectors. Position `i` is the only link to the
//! chunk map entry `i`, so vectors must be added in chunk-map order.

use crate::types::SearchHit;
use iamsage_core::{AppError, AppResult};

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Bulk insertion in chunk-map order
/// - k-nearest-neighbour search by squared L2 distance
/// - Reporting the number of stored vectors
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and query vector must have.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors; the first gets position `len()`.
    fn add_batch(&mut self, vectors: &[Vec<f32>]) -> AppResult<()>;

    /// Up to `k` nearest positions, nearest first.
    ///
    /// Backends may pad the result with [`crate::types::NO_MATCH`] labels;
    /// callers must skip them.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>>;
}

/// Exhaustive index over contiguous `f32` storage.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Rebuild from raw storage, as read back from disk.
    pub(crate) fn from_raw(dimensions: usize, data: Vec<f32>) -> AppResult<Self> {
        if dimensions == 0 || data.len() % dimensions != 0 {
            return Err(AppError::Knowledge(format!(
                "Index data of {} values does not divide into vectors of dimension {}",
                data.len(),
                dimensions
            )));
        }
        Ok(Self { dimensions, data })
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    fn check_dimensions(&self, vector: &[f32], what: &str) -> AppResult<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "{} has dimension {}, index expects {}",
                what,
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    fn add_batch(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        // Validate the whole batch first so a bad vector leaves the index untouched
        for (i, vector) in vectors.iter().enumerate() {
            self.check_dimensions(vector, &format!("Vector {}", i))?;
        }

        self.data.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        self.check_dimensions(query, "Query")?;

        if k == 0 || self.dimensions == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| SearchHit {
                label: position as i64,
                distance: squared_l2(query, vector),
            })
            .collect();

        // Stable sort keeps position order among equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Build an index in one shot from vectors in chunk-map order.
pub fn build_index(dimensions: usize, vectors: &[Vec<f32>]) -> AppResult<FlatL2Index> {
    let mut index = FlatL2Index::new(dimensions);
    index.add_batch(vectors)?;

    tracing::debug!(
        "Built flat L2 index with {} vectors of dimension {}",
        index.len(),
        dimensions
    );

    Ok(index)
}
