use crate::application::use_cases::data_qa_agent::DataQaAgent;
use crate::domain::conversation::{ConversationEntry, ConversationLog, RenderedEntry};
use crate::domain::csv::Dataset;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::Credential;
use crate::infrastructure::csv::CsvParser;
use std::sync::Arc;
use tracing::{info, warn};

pub const MISSING_CREDENTIAL_WARNING: &str =
    "OpenAI API Key not found. Please create a .env file with your key.";

/// Result of one question, each variant carrying what the page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(String),
    /// Blank question: nothing asked, nothing shown.
    Ignored,
    /// No API key configured; the agent was not called.
    MissingCredential(String),
    /// The agent failed; the log is unchanged.
    AgentFailed(String),
}

/// One session's dataset and conversation log.
pub struct SessionController {
    agent: Arc<dyn DataQaAgent + Send + Sync>,
    credential: Option<Credential>,
    parser: CsvParser,
    dataset: Option<Dataset>,
    log: ConversationLog,
}

impl SessionController {
    pub fn new(
        agent: Arc<dyn DataQaAgent + Send + Sync>,
        credential: Option<Credential>,
        parser: CsvParser,
    ) -> Self {
        Self {
            agent,
            credential,
            parser,
            dataset: None,
            log: ConversationLog::new(),
        }
    }

    /// Replace the current dataset with a freshly parsed upload.
    ///
    /// A failed parse leaves no dataset loaded. The log is never touched.
    pub fn load_dataset(&mut self, bytes: &[u8]) -> Result<&Dataset> {
        match self.parser.parse_bytes(bytes) {
            Ok(dataset) => {
                info!(
                    rows = dataset.row_count(),
                    columns = dataset.column_count(),
                    "Dataset loaded"
                );
                let dataset: &Dataset = self.dataset.insert(dataset);
                Ok(dataset)
            }
            Err(err) => {
                warn!(error = %err, "Rejected CSV upload");
                self.dataset = None;
                Err(err)
            }
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Ask the agent about the loaded dataset.
    ///
    /// Only an `Answered` outcome appends to the log. Asking before any
    /// dataset is loaded is a `ValidationError`.
    pub async fn ask_question(&mut self, question: &str) -> Result<AskOutcome> {
        if question.trim().is_empty() {
            return Ok(AskOutcome::Ignored);
        }

        let dataset = self.dataset.as_ref().ok_or_else(|| {
            AppError::ValidationError("Upload a CSV file before asking a question.".to_string())
        })?;

        let Some(credential) = self.credential.as_ref() else {
            warn!("Question received but no API key is configured");
            return Ok(AskOutcome::MissingCredential(
                MISSING_CREDENTIAL_WARNING.to_string(),
            ));
        };

        match self.agent.answer(dataset, question, credential).await {
            Ok(answer) => {
                self.log
                    .push(ConversationEntry::new(question.to_string(), answer.clone()));
                info!(entries = self.log.len(), "Question answered");
                Ok(AskOutcome::Answered(answer))
            }
            Err(err) => {
                warn!(error = %err, "Agent failed to answer");
                Ok(AskOutcome::AgentFailed(format!(
                    "An error occurred with the AI model: {}",
                    err.message()
                )))
            }
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Most recent first; recomputed on every call.
    pub fn render_log(&self) -> impl Iterator<Item = RenderedEntry> + '_ {
        self.log.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAgent {
        reply: Result<String>,
        calls: AtomicUsize,
    }

    impl CountingAgent {
        fn replying(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataQaAgent for CountingAgent {
        async fn answer(
            &self,
            _dataset: &Dataset,
            _question: &str,
            _credential: &Credential,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    const THREE_ROWS: &[u8] = b"name,age\nAlice,30\nBob,25\nCarol,41\n";

    fn controller(agent: Arc<CountingAgent>, credential: Option<&str>) -> SessionController {
        SessionController::new(
            agent,
            credential.and_then(Credential::new),
            CsvParser::new(),
        )
    }

    #[tokio::test]
    async fn test_answer_is_logged() {
        let agent = CountingAgent::replying(Ok("3".to_string()));
        let mut session = controller(agent.clone(), Some("sk-test"));

        let dataset = session.load_dataset(THREE_ROWS).unwrap();
        assert_eq!(dataset.row_count(), 3);

        let outcome = session.ask_question("How many rows?").await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered("3".to_string()));
        assert_eq!(agent.calls(), 1);
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().entries()[0].question(), "How many rows?");

        let rendered: Vec<_> = session.render_log().collect();
        assert_eq!(rendered[0].question_label, "Q1: How many rows?");
        assert_eq!(rendered[0].answer_label, "A1: 3");
    }

    #[tokio::test]
    async fn test_missing_credential_skips_agent() {
        let agent = CountingAgent::replying(Ok("3".to_string()));
        let mut session = controller(agent.clone(), None);
        session.load_dataset(THREE_ROWS).unwrap();

        let outcome = session.ask_question("How many rows?").await.unwrap();
        assert_eq!(
            outcome,
            AskOutcome::MissingCredential(MISSING_CREDENTIAL_WARNING.to_string())
        );
        assert_eq!(agent.calls(), 0);
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_agent_failure_leaves_log_unchanged() {
        let agent = CountingAgent::replying(Ok("first".to_string()));
        let mut session = controller(agent, Some("sk-test"));
        session.load_dataset(THREE_ROWS).unwrap();
        session.ask_question("q1").await.unwrap();

        let failing = CountingAgent::replying(Err(AppError::LLMError("rate limited".to_string())));
        let swapped: Arc<dyn DataQaAgent + Send + Sync> = failing.clone();
        session.agent = swapped;

        let outcome = session.ask_question("q2").await.unwrap();
        assert_eq!(
            outcome,
            AskOutcome::AgentFailed("An error occurred with the AI model: rate limited".to_string())
        );
        assert_eq!(failing.calls(), 1);
        assert_eq!(session.log().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let agent = CountingAgent::replying(Ok("3".to_string()));
        let mut session = controller(agent.clone(), Some("sk-test"));
        session.load_dataset(THREE_ROWS).unwrap();

        assert_eq!(session.ask_question("   ").await.unwrap(), AskOutcome::Ignored);
        assert_eq!(agent.calls(), 0);
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_question_without_dataset_is_rejected() {
        let agent = CountingAgent::replying(Ok("3".to_string()));
        let mut session = controller(agent.clone(), Some("sk-test"));

        let err = session.ask_question("How many rows?").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(agent.calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_upload_keeps_log_and_drops_dataset() {
        let agent = CountingAgent::replying(Ok("3".to_string()));
        let mut session = controller(agent, Some("sk-test"));
        session.load_dataset(THREE_ROWS).unwrap();
        session.ask_question("How many rows?").await.unwrap();

        let err = session.load_dataset(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
        assert!(session.dataset().is_none());
        assert_eq!(session.log().len(), 1);
    }

    #[tokio::test]
    async fn test_log_renders_most_recent_first() {
        let agent = CountingAgent::replying(Ok("same".to_string()));
        let mut session = controller(agent, Some("sk-test"));
        session.load_dataset(THREE_ROWS).unwrap();
        session.ask_question("q1").await.unwrap();
        session.ask_question("q2").await.unwrap();

        let labels: Vec<String> = session
            .render_log()
            .map(|entry| entry.question_label)
            .collect();
        assert_eq!(labels, vec!["Q2: q2", "Q1: q1"]);
    }
}
