pub mod data_qa_agent;
pub mod session_controller;
pub mod session_registry;
