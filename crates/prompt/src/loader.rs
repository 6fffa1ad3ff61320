//! Prompt loader for YAML prompt definitions.
//!
//! Prompts live in `.iamsage/prompts/<id>.yml`. The default answer prompt is
//! built in, so a fresh workspace needs no prompt files at all.

use crate::types::{PromptBehavior, PromptDefinition, PromptOutputSpec};
use iamsage_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the built-in IAM answer prompt.
pub const DEFAULT_ANSWER_PROMPT_ID: &str = "iam.answer";

/// Sentence the model must use when the context cannot answer the question.
pub const INSUFFICIENT_CONTEXT_REPLY: &str =
    "I don't have enough information from the provided context.";

const DEFAULT_SYSTEM: &str = "You are an expert assistant for Identity and Access Management (IAM). \
Your tone is helpful and professional.";

const DEFAULT_TEMPLATE: &str = r#"Answer the question using only the CONTEXT below.
If the CONTEXT does not contain the information needed, reply exactly: "{{insufficient}}"
Be concise (3-6 sentences).

CONTEXT:
{{context}}

QUESTION:
{{question}}

ANSWER:
"#;

/// The built-in answer prompt.
pub fn default_answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_ANSWER_PROMPT_ID.to_string(),
        title: "IAM grounded answer".to_string(),
        api_version: "1.0".to_string(),
        behavior: PromptBehavior {
            tone: "professional".to_string(),
            style: "concise".to_string(),
        },
        system: Some(DEFAULT_SYSTEM.to_string()),
        template: DEFAULT_TEMPLATE.replace("{{insufficient}}", INSUFFICIENT_CONTEXT_REPLY),
        output: PromptOutputSpec {
            format: "markdown".to_string(),
        },
    }
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".iamsage/prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<workspace>/.iamsage/prompts/<id>.yml`; when it is absent and
/// `id` names the built-in prompt, the built-in definition is returned.
///
/// # Example
/// ```no_run
/// use iamsage_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "iam.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_ANSWER_PROMPT_ID {
            tracing::debug!("Using built-in prompt '{}'", prompt_id);
            return Ok(default_answer_prompt());
        }

        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // An answer prompt that drops either slot cannot ground its answers
    for slot in ["context", "question"] {
        if !def.template.contains(&format!("{{{{{}}}}}", slot)) {
            return Err(AppError::Prompt(format!(
                "Prompt template '{}' must reference {{{{{}}}}}",
                def.id, slot
            )));
        }
    }

    Ok(())
}
