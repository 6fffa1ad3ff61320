//! Process-wide cache of expensive handles.
//!
//! The embedder and the LLM client are created on first use and shared for
//! the life of the process. Tests inject fakes through [`Resources::with_handles`].

use crate::embeddings::{create_provider, EmbeddingProvider};
use iamsage_core::{AppConfig, AppResult};
use iamsage_llm::{create_client, LlmClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub struct Resources {
    config: AppConfig,
    embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
    llm: OnceCell<Arc<dyn LlmClient>>,
}

impl Resources {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            embedder: OnceCell::new(),
            llm: OnceCell::new(),
        }
    }

    /// Pre-filled cache; a `None` slot is still created lazily from config.
    pub fn with_handles(
        config: AppConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self {
            config,
            embedder: OnceCell::new_with(embedder),
            llm: OnceCell::new_with(llm),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn embedder(&self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        self.embedder
            .get_or_try_init(|| async {
                let settings = &self.config.embedding;
                tracing::debug!(
                    "Creating embedding provider: provider={}, model={}, dimensions={}",
                    settings.provider,
                    settings.model,
                    settings.dimensions
                );
                create_provider(settings)
            })
            .await
            .cloned()
    }

    /// The LLM client; a missing credential is a configuration error.
    pub async fn llm(&self) -> AppResult<Arc<dyn LlmClient>> {
        self.llm
            .get_or_try_init(|| async {
                let settings = &self.config.llm;
                let api_key = self.config.resolve_api_key()?;
                tracing::debug!("Creating LLM client: provider={}", settings.provider);
                create_client(
                    &settings.provider,
                    settings.endpoint.as_deref(),
                    api_key.as_deref(),
                    settings.timeout_secs.map(Duration::from_secs),
                )
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashProvider;
    use crate::tests::support::{test_config, ScriptedLlm};
    use iamsage_core::AppError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_embedder_created_once() {
        let temp = TempDir::new().unwrap();
        let resources = Resources::new(test_config(temp.path()));

        let first = resources.embedder().await.unwrap();
        let second = resources.embedder().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.provider_name(), "hash");
    }

    #[tokio::test]
    async fn test_injected_handles_are_used() {
        let temp = TempDir::new().unwrap();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashProvider::new(16));
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new(|_| Ok("ok".to_string())));

        let resources = Resources::with_handles(
            test_config(temp.path()),
            Some(embedder.clone()),
            Some(llm.clone()),
        );

        assert!(Arc::ptr_eq(&resources.embedder().await.unwrap(), &embedder));
        assert!(Arc::ptr_eq(&resources.llm().await.unwrap(), &llm));
    }

    #[tokio::test]
    async fn test_missing_gemini_key_is_config_error() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        config.llm.provider = "gemini".to_string();
        config.llm.api_key_env = "IAMSAGE_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        config.api_key = None;

        let resources = Resources::new(config);
        match resources.llm().await {
            Err(err) => {
                assert!(matches!(err, AppError::Config(_)));
                assert!(err.is_fatal());
            }
            Ok(_) => panic!("expected missing credential error"),
        }
    }
}
