pub mod use_cases;

pub use use_cases::data_qa_agent::{DataQaAgent, LlmDataQaAgent};
pub use use_cases::session_controller::{AskOutcome, SessionController};
pub use use_cases::session_registry::SessionRegistry;
