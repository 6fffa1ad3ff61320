//! Stats command handler.
//!
//! Reports what is on disk without loading the index or any model.

use super::print_json;
use clap::Args;
use iamsage_core::{AppConfig, AppResult};
use iamsage_knowledge::inspect;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = inspect(config)?;

        if self.json {
            return print_json(&stats);
        }

        println!("Index directory: {}", stats.processed_dir.display());
        println!(
            "Status: {}",
            if stats.complete { "complete" } else { "not built" }
        );

        if let Some(manifest) = &stats.manifest {
            println!(
                "Embeddings: {}/{} ({} dimensions)",
                manifest.embedding_provider, manifest.embedding_model, manifest.dimensions
            );
            println!(
                "Chunks: {} from {} documents (size {}, overlap {})",
                manifest.chunk_count,
                manifest.document_count,
                manifest.chunk_size,
                manifest.chunk_overlap
            );
            println!("Built at: {}", manifest.built_at);
        }

        for (name, size) in &stats.files {
            println!("  {:<28} {:>10} bytes", name, size);
        }

        Ok(())
    }
}
