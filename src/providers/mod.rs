pub mod ollama;

pub use ollama::{OllamaClient, DEFAULT_HOST_URL, HOST_ENV_VAR};
