//! Command handlers for the IAMSage CLI.
//!
//! Each subcommand lives in its own module. Answers and results go to stdout;
//! logs go to stderr.

pub mod ask;
pub mod build;
pub mod chat;
pub mod search;
pub mod stats;

pub use ask::AskCommand;
pub use build::BuildCommand;
pub use chat::ChatCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use iamsage_core::config::validate_temperature;
use iamsage_core::{AppConfig, AppError, AppResult};
use iamsage_knowledge::{AnswerGenerator, AskOutcome, KnowledgeBase, Resources, SourceRef};
use serde::Serialize;

/// Shown when retrieval returns nothing.
pub const NO_RELEVANT_INFORMATION: &str = "Could not find any relevant information for your query.";

/// Longest chunk excerpt printed under a source.
const EXCERPT_CHARS: usize = 160;

/// Everything needed to answer questions. The temperature override and the
/// credential are checked before the knowledge base is opened.
pub(crate) async fn open_session(
    resources: &Resources,
    temperature: Option<f32>,
) -> AppResult<(KnowledgeBase, AnswerGenerator)> {
    if let Some(temperature) = temperature {
        validate_temperature(temperature)?;
    }

    let config = resources.config();
    let llm = resources.llm().await?;

    let knowledge = KnowledgeBase::open_or_build(resources, false).await?;
    if let Some(stats) = knowledge.build_stats() {
        tracing::info!(
            "Built index: {} documents, {} chunks in {:.2}s",
            stats.documents,
            stats.chunks,
            stats.duration_secs
        );
    }

    let mut generator = AnswerGenerator::from_settings(llm, &config.llm, &config.workspace)?;
    if let Some(temperature) = temperature {
        generator = generator.with_temperature(temperature);
    }

    Ok((knowledge, generator))
}

pub(crate) fn top_k_or_default(top_k: Option<usize>, config: &AppConfig) -> usize {
    top_k.unwrap_or(config.retrieval.top_k)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Plain-text rendering of an answer and its sources.
pub(crate) fn render_outcome(outcome: &AskOutcome) -> String {
    match outcome {
        AskOutcome::NoRelevantInformation => NO_RELEVANT_INFORMATION.to_string(),
        AskOutcome::Answered(answer) => {
            let mut out = answer.answer.clone();
            if !answer.sources.is_empty() {
                out.push_str("\n\nSources:");
                for source in &answer.sources {
                    out.push('\n');
                    out.push_str(&render_source(source));
                }
            }
            out
        }
    }
}

pub(crate) fn render_source(source: &SourceRef) -> String {
    format!(
        "  [{}] {} ({}, distance {:.4})\n      {}",
        source.rank,
        source.source,
        source.chunk_id,
        source.distance,
        excerpt(&source.content)
    )
}

fn excerpt(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// JSON shape of an ask result.
pub(crate) fn outcome_json(question: &str, outcome: &AskOutcome) -> serde_json::Value {
    match outcome {
        AskOutcome::NoRelevantInformation => serde_json::json!({
            "question": question,
            "answer": serde_json::Value::Null,
            "message": NO_RELEVANT_INFORMATION,
            "sources": [],
        }),
        AskOutcome::Answered(answer) => serde_json::json!({
            "question": question,
            "answer": answer.answer,
            "sources": answer.sources,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamsage_knowledge::RagAnswer;

    fn source(rank: usize, content: &str) -> SourceRef {
        SourceRef {
            rank,
            source: "least-privilege.md".to_string(),
            chunk_id: format!("least-privilege_{}", rank),
            distance: 0.25,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_rejected_before_opening() {
        let workspace = std::env::temp_dir().join("iamsage-cli-temperature-check");
        let config = AppConfig {
            workspace: workspace.clone(),
            ..AppConfig::default()
        };
        let resources = Resources::new(config);

        match open_session(&resources, Some(3.0)).await {
            Err(AppError::Config(msg)) => assert!(msg.contains("Temperature")),
            Err(other) => panic!("expected temperature error, got {}", other),
            Ok(_) => panic!("expected temperature error"),
        }
        assert!(!workspace.join("data").exists());
    }

    #[test]
    fn test_render_no_relevant_information() {
        assert_eq!(
            render_outcome(&AskOutcome::NoRelevantInformation),
            NO_RELEVANT_INFORMATION
        );
    }

    #[test]
    fn test_render_answer_lists_sources_in_rank_order() {
        let outcome = AskOutcome::Answered(RagAnswer {
            answer: "Grant only what is needed.".to_string(),
            sources: vec![source(1, "first\nchunk"), source(2, "second chunk")],
        });

        let text = render_outcome(&outcome);
        assert!(text.starts_with("Grant only what is needed.\n\nSources:"));
        let first = text.find("[1]").unwrap();
        let second = text.find("[2]").unwrap();
        assert!(first < second);
        assert!(text.contains("first chunk"));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(EXCERPT_CHARS + 10);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_outcome_json_shapes() {
        let empty = outcome_json("q", &AskOutcome::NoRelevantInformation);
        assert!(empty["answer"].is_null());
        assert_eq!(empty["message"], NO_RELEVANT_INFORMATION);

        let answered = outcome_json(
            "q",
            &AskOutcome::Answered(RagAnswer {
                answer: "a".to_string(),
                sources: vec![source(1, "c")],
            }),
        );
        assert_eq!(answered["answer"], "a");
        assert_eq!(answered["sources"][0]["chunk_id"], "least-privilege_1");
    }
}
