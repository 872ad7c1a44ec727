pub mod conversation;
pub mod error;
pub mod llm_config;

// Uploaded table
pub mod csv;
