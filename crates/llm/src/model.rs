/// Model requested when neither settings nor the caller name one.
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1:1.5b";

/// Address of a locally running Ollama server.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
