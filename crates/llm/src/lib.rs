use std::sync::Arc;

mod model;
mod ollama_adapter;
mod provider;

pub use model::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL};
pub use ollama_adapter::{OLLAMA_PROVIDER_ID, OllamaProviderAdapter};
pub use provider::{
    LlmProvider, ProviderConfig, ProviderError, ProviderEventStream, ProviderMessage,
    ProviderResult, ProviderStreamHandle, ProviderWorker, Role, StreamEventMapped,
    StreamEventPayload, StreamRequest, StreamTarget, make_event_stream,
};

pub fn create_provider(mut config: ProviderConfig) -> ProviderResult<Arc<dyn LlmProvider>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = OLLAMA_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        OLLAMA_PROVIDER_ID => Ok(Arc::new(OllamaProviderAdapter::new(config))),
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}
