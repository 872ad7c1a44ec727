use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::{LlmDataQaAgent, SessionRegistry};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::llm_clients::OpenAIClient;
use crate::interfaces::http::{start_server, HttpState};

pub async fn run() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = AppConfig::load().map_err(|err| {
        error!(error = %err, "Failed to load configuration");
        err
    })?;

    let credential = config.credential();
    if credential.is_none() {
        warn!("OPENAI_API_KEY is not set; questions will be answered with a warning");
    }

    let llm_client = Arc::new(OpenAIClient::new(Duration::from_secs(config.llm.timeout_secs)));
    let agent = Arc::new(LlmDataQaAgent::new(
        llm_client,
        config.llm.clone(),
        config.agent.max_prompt_rows,
    ));
    let parser = CsvParser::new()
        .with_delimiter(config.server.delimiter()?)
        .with_max_bytes(config.server.max_upload_bytes);
    let sessions = SessionRegistry::new(agent, credential, parser, config.server.session_idle()?);

    let state = HttpState {
        sessions: Arc::new(sessions),
        preview_rows: config.server.preview_rows,
    };

    let server = start_server(state, &config.server).map_err(|err| {
        error!(
            error = %err,
            host = %config.server.host,
            port = config.server.port,
            "Failed to bind HTTP server"
        );
        AppError::from(err)
    })?;

    info!(
        "CSV Q&A Bot listening on http://{}:{}",
        config.server.host, config.server.port
    );

    server.await.map_err(AppError::from)
}
