//! Ask command handler.
//!
//! One question, one grounded answer.

use super::{open_session, outcome_json, print_json, render_outcome, top_k_or_default};
use clap::Args;
use iamsage_core::{AppConfig, AppResult};
use iamsage_knowledge::Resources;

/// Ask a question about the indexed IAM documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (default: retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Temperature for response generation
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask options: {:?}", self);

        let top_k = top_k_or_default(self.top_k, &config);
        let resources = Resources::new(config);
        let (knowledge, generator) = open_session(&resources, self.temperature).await?;

        tracing::debug!("Answering with model {}", generator.model());
        let outcome = knowledge.ask(&self.question, top_k, &generator).await?;

        if self.json {
            return print_json(&outcome_json(&self.question, &outcome));
        }

        println!("{}", render_outcome(&outcome));
        Ok(())
    }
}
