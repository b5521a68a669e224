pub mod engine;
pub mod prompts;
pub mod request;
pub mod response;
