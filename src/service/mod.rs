pub mod openai_service;
pub mod prompt;
