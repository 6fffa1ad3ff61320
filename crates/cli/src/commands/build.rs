//! Build command handler.

use super::print_json;
use clap::Args;
use iamsage_core::{AppConfig, AppResult};
use iamsage_knowledge::{KnowledgeBase, Resources};

/// Build the vector index and chunk map from the raw documents
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Rebuild even when complete artifacts exist
    #[arg(short, long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command");
        tracing::debug!("Build options: {:?}", self);

        let resources = Resources::new(config);
        let knowledge = KnowledgeBase::open_or_build(&resources, self.force).await?;
        let manifest = knowledge.manifest();

        if self.json {
            let output = serde_json::json!({
                "built": knowledge.build_stats().is_some(),
                "stats": knowledge.build_stats(),
                "manifest": manifest,
            });
            return print_json(&output);
        }

        match knowledge.build_stats() {
            Some(stats) => {
                println!(
                    "Built index from {} documents: {} chunks, {} dimensions ({:.2}s)",
                    stats.documents, stats.chunks, stats.dimensions, stats.duration_secs
                );
            }
            None => {
                println!(
                    "Index already built ({} chunks from {} documents). Use --force to rebuild.",
                    manifest.chunk_count, manifest.document_count
                );
            }
        }
        println!(
            "Embeddings: {}/{}",
            manifest.embedding_provider, manifest.embedding_model
        );

        Ok(())
    }
}
