pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::{Credential, LLMConfig};
use async_trait::async_trait;

pub use openai::OpenAIClient;

#[async_trait]
pub trait LLMClient {
    async fn generate(
        &self,
        config: &LLMConfig,
        credential: &Credential,
        system: &str,
        user: &str,
    ) -> Result<String>;
}
