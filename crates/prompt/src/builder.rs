//! Prompt builder for rendering templates and injecting retrieved context.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use iamsage_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition, a user question and the retrieved context.
///
/// Both the optional system template and the user template are rendered with
/// `{{context}}` and `{{question}}` bound.
///
/// # Example
/// ```no_run
/// use iamsage_prompt::{build_prompt, default_answer_prompt};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = default_answer_prompt();
/// let built = build_prompt(&def, "What is MFA?", "MFA requires two factors.")?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    question: &str,
    context: &str,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt: {} ({} context bytes)",
        definition.id,
        context.len()
    );

    let mut variables = HashMap::new();
    variables.insert("context".to_string(), context.to_string());
    variables.insert("question".to_string(), question.to_string());

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        context.len(),
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::default_answer_prompt;

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let def = default_answer_prompt();
        let context = "Use <role> & \"groups\" for access.";

        let built = build_prompt(&def, "How?", context).unwrap();
        assert!(built.user.contains(context));
        assert_eq!(built.metadata.context_bytes, context.len());
    }

    #[test]
    fn test_build_default_prompt_layout() {
        let def = default_answer_prompt();
        let built = build_prompt(&def, "What is least privilege?", "chunk one\n\n---\n\nchunk two")
            .unwrap();

        let context_at = built.user.find("CONTEXT:\nchunk one").unwrap();
        let question_at = built.user.find("QUESTION:\nWhat is least privilege?").unwrap();
        let answer_at = built.user.find("ANSWER:").unwrap();
        assert!(context_at < question_at && question_at < answer_at);
        assert!(built.system.is_some());
        assert_eq!(built.metadata.source_prompt_id, "iam.answer");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        // Handlebars renders missing variables as empty string
        let result = render_template("Question: {{missing}}", &vars);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let vars = HashMap::new();
        let result = render_template("{{#if}}", &vars);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
