use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use deepchat_llm::{
    LlmProvider, ProviderError, ProviderEventStream, ProviderResult, StreamEventPayload,
    StreamRequest, StreamTarget,
};
use snafu::{ResultExt, Snafu};
use tokio::sync::mpsc;

use crate::chat::accumulator::ResponseAccumulator;
use crate::chat::events::{ControllerMessage, SurfaceMessage};
use crate::chat::message::{PanelId, RequestId};

/// One request's lifetime, ready to run on the tokio runtime.
pub type ControllerTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Channel the controller posts surface messages on.
pub type Outbox = mpsc::UnboundedSender<ControllerMessage>;

/// Any failure while opening or reading a response stream.
///
/// Rendered to the user as `Error: <display>`; kinds are not distinguished there.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendFailure {
    #[snafu(display("inference provider unavailable: {details}"))]
    NotConfigured {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("{source}"))]
    OpenStream {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("{message}"))]
    Stream {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("provider stream ended before a terminal event"))]
    StreamClosed { stage: &'static str },
    #[snafu(display("response exceeded {limit} bytes"))]
    ResponseTooLarge { stage: &'static str, limit: usize },
}

impl BackendFailure {
    /// Text of the assistant turn shown in place of an answer.
    pub fn chat_line(&self) -> String {
        format!("Error: {self}")
    }
}

/// Panel-local in-flight indicator.
///
/// Only the controller flips it, and every flip is posted to the surface.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, busy: bool, outbox: &Outbox) {
        self.0.store(busy, Ordering::SeqCst);
        let _ = outbox.send(ControllerMessage::thinking(busy));
    }
}

/// Bridges one display surface and the inference provider.
///
/// Requests are not serialized: a submit while another request streams starts
/// a second independent request and the busy flag is last-writer-wins.
pub struct PanelController {
    panel_id: PanelId,
    provider: Option<Arc<dyn LlmProvider>>,
    provider_error: Option<String>,
    response_limit: Option<usize>,
    busy: BusyFlag,
    next_request_id: AtomicU64,
    outbox: Outbox,
}

impl PanelController {
    pub fn new(
        panel_id: PanelId,
        provider: ProviderResult<Arc<dyn LlmProvider>>,
        outbox: Outbox,
    ) -> Self {
        let (provider, provider_error) = match provider {
            Ok(provider) => {
                tracing::info!(
                    panel_id = panel_id.0,
                    provider_id = %provider.id(),
                    model_id = %provider.default_model(),
                    "panel controller ready"
                );
                (Some(provider), None)
            }
            Err(error) => {
                tracing::error!(
                    panel_id = panel_id.0,
                    error = %error,
                    "failed to initialize provider adapter"
                );
                (None, Some(error.to_string()))
            }
        };

        Self {
            panel_id,
            provider,
            provider_error,
            response_limit: None,
            busy: BusyFlag::default(),
            next_request_id: AtomicU64::new(1),
            outbox,
        }
    }

    /// Caps the accumulated response size. `None` keeps it unbounded.
    pub fn with_response_limit(mut self, limit: Option<usize>) -> Self {
        self.response_limit = limit;
        self
    }

    pub fn panel_id(&self) -> PanelId {
        self.panel_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn on_surface_message(&self, message: SurfaceMessage) -> ControllerTask {
        match message {
            SurfaceMessage::Chat { text } => self.handle_user_message(text),
        }
    }

    /// Sends `prompt` as a single-turn request and posts the full answer.
    ///
    /// The prompt is forwarded as-is; emptiness is checked by the surface.
    pub fn handle_user_message(&self, prompt: impl Into<String>) -> ControllerTask {
        let prompt = prompt.into();
        let request_id = RequestId::new(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let target = StreamTarget::new(self.panel_id.0, request_id.0);
        let provider = self.provider.clone();
        let provider_error = self.provider_error.clone();
        let response_limit = self.response_limit;
        let busy = self.busy.clone();
        let outbox = self.outbox.clone();

        Box::pin(async move {
            busy.set(true, &outbox);

            let outcome = match provider {
                Some(provider) => {
                    let request =
                        StreamRequest::single_turn(target, provider.default_model(), prompt);
                    collect_response(provider.as_ref(), request, response_limit).await
                }
                None => NotConfiguredSnafu {
                    stage: "handle-user-message",
                    details: provider_error.unwrap_or_default(),
                }
                .fail(),
            };

            let text = match outcome {
                Ok(text) => {
                    tracing::info!(
                        panel_id = target.panel_id,
                        request_id = target.request_id,
                        response_bytes = text.len(),
                        "chat response completed"
                    );
                    text
                }
                Err(failure) => {
                    tracing::warn!(
                        panel_id = target.panel_id,
                        request_id = target.request_id,
                        error = %failure,
                        "chat request failed"
                    );
                    failure.chat_line()
                }
            };

            let _ = outbox.send(ControllerMessage::receive(text));
            busy.set(false, &outbox);
        })
    }
}

async fn collect_response(
    provider: &dyn LlmProvider,
    request: StreamRequest,
    response_limit: Option<usize>,
) -> Result<String, BackendFailure> {
    let handle = provider.stream_chat(request).context(OpenStreamSnafu {
        stage: "open-stream",
    })?;

    // Dropping the reader on an early exit cancels the worker.
    let ((), response) = tokio::join!(
        handle.worker,
        drain_stream(handle.stream, response_limit)
    );
    response
}

async fn drain_stream(
    mut stream: ProviderEventStream,
    response_limit: Option<usize>,
) -> Result<String, BackendFailure> {
    let mut accumulator = ResponseAccumulator::new(response_limit);

    while let Some(event) = stream.recv().await {
        match event.payload {
            StreamEventPayload::Delta(fragment) => accumulator.push(&fragment)?,
            StreamEventPayload::Done => {
                tracing::debug!(
                    panel_id = event.target.panel_id,
                    request_id = event.target.request_id,
                    fragment_count = accumulator.fragment_count(),
                    "response stream drained"
                );
                return Ok(accumulator.finish());
            }
            StreamEventPayload::Error(message) => {
                return StreamSnafu {
                    stage: "read-stream",
                    message,
                }
                .fail();
            }
        }
    }

    StreamClosedSnafu {
        stage: "read-stream",
    }
    .fail()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use deepchat_llm::{
        ProviderMessage, ProviderStreamHandle, ProviderWorker, Role, StreamEventMapped,
        make_event_stream,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    /// In-memory provider replaying a fixed event script for every request.
    pub(crate) struct ScriptedProvider {
        script: Vec<StreamEventPayload>,
        open_error: Option<String>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    impl ScriptedProvider {
        pub(crate) fn streaming(fragments: &[&str]) -> Self {
            let mut script = fragments
                .iter()
                .map(|fragment| StreamEventPayload::Delta(fragment.to_string()))
                .collect::<Vec<_>>();
            script.push(StreamEventPayload::Done);
            Self::with_script(script)
        }

        pub(crate) fn with_script(script: Vec<StreamEventPayload>) -> Self {
            Self {
                script,
                open_error: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_open(provider_id: &str) -> Self {
            Self {
                script: Vec::new(),
                open_error: Some(provider_id.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<StreamRequest> {
            self.requests.lock().expect("request log poisoned").clone()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted"
        }

        fn default_model(&self) -> &str {
            "deepseek-r1:1.5b"
        }

        fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
            self.requests
                .lock()
                .expect("request log poisoned")
                .push(request.clone());

            if let Some(provider_id) = &self.open_error {
                return Err(ProviderError::UnsupportedProvider {
                    stage: "scripted-open",
                    provider_id: provider_id.clone(),
                });
            }

            let target = request.target;
            let (event_tx, stream, _cancel_rx) = make_event_stream();
            let script = self.script.clone();
            let worker: ProviderWorker = Box::pin(async move {
                for payload in script {
                    if event_tx.send(StreamEventMapped { target, payload }).is_err() {
                        return;
                    }
                }
            });

            Ok(ProviderStreamHandle { stream, worker })
        }
    }

    pub(crate) fn controller_with(
        provider: Arc<ScriptedProvider>,
    ) -> (PanelController, UnboundedReceiver<ControllerMessage>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let provider: Arc<dyn LlmProvider> = provider;
        (PanelController::new(PanelId::new(1), Ok(provider), outbox), inbox)
    }

    pub(crate) fn drain(inbox: &mut UnboundedReceiver<ControllerMessage>) -> Vec<ControllerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn completed_stream_posts_one_answer_between_thinking_toggles() {
        let provider = Arc::new(ScriptedProvider::streaming(&["4"]));
        let (controller, mut inbox) = controller_with(provider);

        controller.handle_user_message("2+2?").await;

        assert_eq!(
            drain(&mut inbox),
            vec![
                ControllerMessage::thinking(true),
                ControllerMessage::receive("4"),
                ControllerMessage::thinking(false),
            ]
        );
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn request_is_single_turn_with_the_provider_model() {
        let provider = Arc::new(ScriptedProvider::streaming(&["ok"]));
        let (controller, _inbox) = controller_with(provider.clone());

        controller.handle_user_message("first").await;
        controller.handle_user_message("second").await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model_id, "deepseek-r1:1.5b");
        assert_eq!(
            requests[1].messages,
            vec![ProviderMessage::new(Role::User, "second")]
        );
        assert_ne!(requests[0].target, requests[1].target);
        assert_eq!(requests[0].target.panel_id, 1);
    }

    #[tokio::test]
    async fn controller_forwards_prompts_without_validation() {
        let provider = Arc::new(ScriptedProvider::streaming(&[""]));
        let (controller, _inbox) = controller_with(provider.clone());

        controller
            .on_surface_message(SurfaceMessage::chat("   "))
            .await;

        assert_eq!(
            provider.requests()[0].messages,
            vec![ProviderMessage::new(Role::User, "   ")]
        );
    }

    #[tokio::test]
    async fn fragments_concatenate_in_arrival_order() {
        let split = Arc::new(ScriptedProvider::streaming(&["Hel", "lo"]));
        let whole = Arc::new(ScriptedProvider::streaming(&["Hello"]));
        let (split_controller, mut split_inbox) = controller_with(split);
        let (whole_controller, mut whole_inbox) = controller_with(whole);

        split_controller.handle_user_message("hi").await;
        whole_controller.handle_user_message("hi").await;

        let split_messages = drain(&mut split_inbox);
        assert_eq!(split_messages[1], ControllerMessage::receive("Hello"));
        assert_eq!(split_messages, drain(&mut whole_inbox));
    }

    #[tokio::test]
    async fn open_failure_renders_error_line_and_resets_busy() {
        let provider = Arc::new(ScriptedProvider::failing_open("offline"));
        let (controller, mut inbox) = controller_with(provider);

        controller.handle_user_message("hello").await;

        assert_eq!(
            drain(&mut inbox),
            vec![
                ControllerMessage::thinking(true),
                ControllerMessage::receive("Error: provider 'offline' is not supported"),
                ControllerMessage::thinking(false),
            ]
        );
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn stream_error_before_any_fragment_uses_its_message() {
        let provider = Arc::new(ScriptedProvider::with_script(vec![
            StreamEventPayload::Error("Timeout".to_string()),
        ]));
        let (controller, mut inbox) = controller_with(provider);

        controller.handle_user_message("hello").await;

        let messages = drain(&mut inbox);
        assert_eq!(messages[1], ControllerMessage::receive("Error: Timeout"));
        assert_eq!(messages.last(), Some(&ControllerMessage::thinking(false)));
    }

    #[tokio::test]
    async fn mid_stream_failure_discards_partial_text() {
        let provider = Arc::new(ScriptedProvider::with_script(vec![
            StreamEventPayload::Delta("Hel".to_string()),
            StreamEventPayload::Error("connection reset".to_string()),
        ]));
        let (controller, mut inbox) = controller_with(provider);

        controller.handle_user_message("hello").await;

        let answers = drain(&mut inbox)
            .into_iter()
            .filter(|message| matches!(message, ControllerMessage::ReceiveMessage { .. }))
            .collect::<Vec<_>>();
        assert_eq!(
            answers,
            vec![ControllerMessage::receive("Error: connection reset")]
        );
    }

    #[tokio::test]
    async fn stream_without_terminal_event_is_a_failure() {
        let provider = Arc::new(ScriptedProvider::with_script(vec![
            StreamEventPayload::Delta("partial".to_string()),
        ]));
        let (controller, mut inbox) = controller_with(provider);

        controller.handle_user_message("hello").await;

        assert_eq!(
            drain(&mut inbox)[1],
            ControllerMessage::receive("Error: provider stream ended before a terminal event")
        );
    }

    #[tokio::test]
    async fn response_limit_turns_oversized_answers_into_errors() {
        let provider = Arc::new(ScriptedProvider::streaming(&["Hello", ", world"]));
        let (controller, mut inbox) = controller_with(provider);
        let controller = controller.with_response_limit(Some(8));

        controller.handle_user_message("hello").await;

        assert_eq!(
            drain(&mut inbox)[1],
            ControllerMessage::receive("Error: response exceeded 8 bytes")
        );
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn missing_provider_reports_the_initialization_error() {
        let (outbox, mut inbox) = mpsc::unbounded_channel();
        let controller = PanelController::new(
            PanelId::new(9),
            Err(ProviderError::UnsupportedProvider {
                stage: "create-provider",
                provider_id: "openai".to_string(),
            }),
            outbox,
        );

        controller.handle_user_message("hello").await;

        assert_eq!(
            drain(&mut inbox)[1],
            ControllerMessage::receive(
                "Error: inference provider unavailable: provider 'openai' is not supported"
            )
        );
    }

    #[tokio::test]
    async fn racing_requests_each_post_their_own_answer() {
        let provider = Arc::new(ScriptedProvider::streaming(&["done"]));
        let (controller, mut inbox) = controller_with(provider);

        let first = controller.handle_user_message("one");
        let second = controller.handle_user_message("two");
        tokio::join!(first, second);

        let messages = drain(&mut inbox);
        let answers = messages
            .iter()
            .filter(|message| matches!(message, ControllerMessage::ReceiveMessage { .. }))
            .count();
        assert_eq!(answers, 2);
        assert_eq!(messages.last(), Some(&ControllerMessage::thinking(false)));
        assert!(!controller.is_busy());
    }
}
