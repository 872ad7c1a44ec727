mod prompts;

use crate::domain::csv::Dataset;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{Credential, LLMConfig};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_answer;
use async_trait::async_trait;
use prompts::{build_system_prompt, build_user_prompt};
use std::sync::Arc;
use tracing::{info, warn};

/// Answers natural-language questions about a table.
#[async_trait]
pub trait DataQaAgent {
    async fn answer(
        &self,
        dataset: &Dataset,
        question: &str,
        credential: &Credential,
    ) -> Result<String>;
}

/// `DataQaAgent` backed by a chat-completion model.
pub struct LlmDataQaAgent {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    max_prompt_rows: usize,
}

impl LlmDataQaAgent {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        max_prompt_rows: usize,
    ) -> Self {
        Self {
            llm_client,
            config,
            max_prompt_rows,
        }
    }
}

#[async_trait]
impl DataQaAgent for LlmDataQaAgent {
    async fn answer(
        &self,
        dataset: &Dataset,
        question: &str,
        credential: &Credential,
    ) -> Result<String> {
        let system_prompt = build_system_prompt(dataset, self.max_prompt_rows)?;
        let user_prompt = build_user_prompt(question);

        info!(
            provider = ?self.config.provider,
            model = %self.config.model,
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Asking model about dataset"
        );

        let raw_output = self
            .llm_client
            .generate(&self.config, credential, &system_prompt, &user_prompt)
            .await
            .map_err(|err| {
                warn!(error = %err, "Model call failed");
                err
            })?;

        let answer = clean_answer(&raw_output);
        if answer.is_empty() {
            return Err(AppError::LLMError("Model returned an empty answer".to_string()));
        }

        Ok(answer)
    }
}
