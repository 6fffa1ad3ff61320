//! Chat command handler.
//!
//! Reads questions from stdin until an empty line, `exit`, `quit` or EOF.
//! The knowledge base and clients are loaded once for the whole session.

use super::{open_session, render_outcome, top_k_or_default};
use clap::Args;
use iamsage_core::{AppConfig, AppResult};
use iamsage_knowledge::Resources;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ask questions interactively
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of chunks to retrieve per question (default: retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Temperature for response generation
    #[arg(long)]
    pub temperature: Option<f32>,
}

fn ends_session(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

impl ChatCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");
        tracing::debug!("Chat options: {:?}", self);

        let top_k = top_k_or_default(self.top_k, &config);
        let resources = Resources::new(config);
        let (knowledge, generator) = open_session(&resources, self.temperature).await?;

        println!(
            "IAMSage ready ({} chunks indexed). Ask a question, or press Enter to quit.",
            knowledge.len()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        loop {
            print!("\n> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if ends_session(&line) {
                break;
            }

            match knowledge.ask(line.trim(), top_k, &generator).await {
                Ok(outcome) => {
                    answered += 1;
                    println!("\n{}", render_outcome(&outcome));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("Question failed: {}", e);
                    println!("\nSorry, that question failed: {}", e);
                }
            }
        }

        tracing::info!("Chat session ended after {} answers", answered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_end_words() {
        assert!(ends_session(""));
        assert!(ends_session("   "));
        assert!(ends_session("exit"));
        assert!(ends_session(" QUIT "));
        assert!(!ends_session("what is least privilege?"));
        assert!(!ends_session("exit strategy for service accounts"));
    }
}
