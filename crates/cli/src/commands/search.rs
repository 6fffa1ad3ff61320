//! Search command handler.
//!
//! Retrieval only: no LLM call is made.

use super::{print_json, render_source, top_k_or_default};
use clap::Args;
use iamsage_core::{AppConfig, AppResult};
use iamsage_knowledge::{KnowledgeBase, Resources, SourceRef};

/// Show the chunks nearest to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to return (default: retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let top_k = top_k_or_default(self.top_k, &config);
        let resources = Resources::new(config);
        let knowledge = KnowledgeBase::open_or_build(&resources, false).await?;

        let results: Vec<SourceRef> = knowledge
            .search(&self.query, top_k)
            .await?
            .iter()
            .map(SourceRef::from)
            .collect();

        if self.json {
            let output = serde_json::json!({
                "query": self.query,
                "topK": top_k,
                "results": results,
            });
            return print_json(&output);
        }

        if results.is_empty() {
            println!("No chunks found.");
            return Ok(());
        }

        for result in &results {
            println!("{}", render_source(result));
        }

        Ok(())
    }
}
