use futures::StreamExt;
use rig::client::Nothing;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use rig::streaming::StreamedAssistantContent;
use snafu::{ResultExt, ensure};
use tokio::sync::{mpsc, oneshot};

use super::provider::{
    CompletionsFailedSnafu, EmptyMessageSetSnafu, HttpClientSnafu, LlmProvider, ProviderConfig,
    ProviderError, ProviderMessage, ProviderResult, ProviderStreamHandle, ProviderWorker, Role,
    StreamEventMapped, StreamEventPayload, StreamRequest, StreamTarget, make_event_stream,
};

pub const OLLAMA_PROVIDER_ID: &str = "ollama";

/// Streams chat completions from an Ollama server through Rig.
pub struct OllamaProviderAdapter {
    config: ProviderConfig,
}

impl OllamaProviderAdapter {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<ollama::Client> {
        ollama::Client::builder()
            .api_key(Nothing)
            .base_url(config.endpoint_or_default())
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })
    }

    fn to_rig_message(message: &ProviderMessage) -> RigMessage {
        match message.role {
            Role::User => RigMessage::user(message.content.clone()),
        }
    }

    fn emit_error_event(
        event_tx: &mpsc::UnboundedSender<StreamEventMapped>,
        target: StreamTarget,
        error: ProviderError,
    ) {
        let _ = event_tx.send(StreamEventMapped {
            target,
            payload: StreamEventPayload::Error(error.to_string()),
        });
    }

    /// Keeps only the text that Ollama reports as `message.content`.
    fn map_stream_item<R>(
        target: StreamTarget,
        item: StreamedAssistantContent<R>,
    ) -> Option<StreamEventMapped>
    where
        R: Clone + Unpin,
    {
        let payload = match item {
            StreamedAssistantContent::Text(text) => StreamEventPayload::Delta(text.text),
            StreamedAssistantContent::Reasoning(_)
            | StreamedAssistantContent::ReasoningDelta { .. }
            | StreamedAssistantContent::ToolCall { .. }
            | StreamedAssistantContent::ToolCallDelta { .. }
            | StreamedAssistantContent::Final(_) => return None,
        };

        Some(StreamEventMapped { target, payload })
    }

    async fn run_stream_worker(
        config: ProviderConfig,
        request: StreamRequest,
        event_tx: mpsc::UnboundedSender<StreamEventMapped>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let target = request.target;
        let client = match Self::build_client(&config) {
            Ok(client) => client,
            Err(error) => {
                tracing::error!(
                    panel_id = target.panel_id,
                    request_id = target.request_id,
                    endpoint = %config.endpoint_or_default(),
                    error = %error,
                    "failed to build ollama client"
                );
                Self::emit_error_event(&event_tx, target, error);
                return;
            }
        };

        let mut messages = request
            .messages
            .iter()
            .map(Self::to_rig_message)
            .collect::<Vec<_>>();
        let Some(prompt) = messages.pop() else {
            let error = ProviderError::EmptyMessageSet {
                stage: "open-stream-pop-prompt",
                target,
            };
            Self::emit_error_event(&event_tx, target, error);
            return;
        };

        let model = client.completion_model(request.model_id.clone());
        let opened = model
            .completion_request(prompt)
            .messages(messages)
            .stream()
            .await
            .context(CompletionsFailedSnafu {
                stage: "open-stream",
            });
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                tracing::error!(
                    panel_id = target.panel_id,
                    request_id = target.request_id,
                    model_id = %request.model_id,
                    error = %error,
                    "failed to open ollama stream"
                );
                Self::emit_error_event(&event_tx, target, error);
                return;
            }
        };

        let mut cancelled = false;
        let mut stream_failed = false;
        let mut fragment_count = 0usize;

        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    cancelled = true;
                    tracing::debug!(
                        panel_id = target.panel_id,
                        request_id = target.request_id,
                        "ollama stream cancelled"
                    );
                    stream.cancel();
                    break;
                }
                next_item = stream.next() => {
                    match next_item {
                        Some(Ok(item)) => {
                            if let Some(mapped) = Self::map_stream_item(target, item) {
                                fragment_count += 1;
                                if event_tx.send(mapped).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(source)) => {
                            stream_failed = true;
                            tracing::warn!(
                                panel_id = target.panel_id,
                                request_id = target.request_id,
                                error = %source,
                                "ollama stream emitted an error chunk"
                            );
                            let error = ProviderError::CompletionsFailed {
                                stage: "stream-chunk",
                                source,
                            };
                            Self::emit_error_event(&event_tx, target, error);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        if !cancelled && !stream_failed {
            tracing::debug!(
                panel_id = target.panel_id,
                request_id = target.request_id,
                fragment_count,
                "ollama stream finished"
            );
            let _ = event_tx.send(StreamEventMapped {
                target,
                payload: StreamEventPayload::Done,
            });
        }
    }
}

impl LlmProvider for OllamaProviderAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn default_model(&self) -> &str {
        self.config.model_or_default()
    }

    fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        ensure!(
            !request.messages.is_empty(),
            EmptyMessageSetSnafu {
                stage: "stream-chat",
                target: request.target,
            }
        );

        tracing::debug!(
            panel_id = request.target.panel_id,
            request_id = request.target.request_id,
            model_id = %request.model_id,
            message_count = request.messages.len(),
            "opening ollama chat stream"
        );

        let (event_tx, stream, cancel_rx) = make_event_stream();
        let worker: ProviderWorker = Box::pin(Self::run_stream_worker(
            self.config.clone(),
            request,
            event_tx,
            cancel_rx,
        ));

        Ok(ProviderStreamHandle { stream, worker })
    }
}
