use gpui::*;
use gpui_tokio_bridge::Tokio;
use tokio::sync::mpsc;

use deepchat_llm::create_provider;

use crate::chat::controller::PanelController;
use crate::chat::events::{ControllerMessage, SurfaceMessage};
use crate::chat::message::PanelId;
use crate::chat::surface::ChatSurface;
use crate::settings::ChatSettings;

/// Hosts one display surface and the controller that serves it.
///
/// Request futures run on tokio; their surface messages come back through a
/// channel drained on the foreground executor.
pub struct ChatPanel {
    surface: Entity<ChatSurface>,
    controller: PanelController,
    _inbox_task: Task<()>,
}

impl ChatPanel {
    pub fn new(
        panel_id: PanelId,
        settings: &ChatSettings,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let surface = cx.new(|cx| ChatSurface::new(window, cx));
        let (outbox, mut inbox) = mpsc::unbounded_channel::<ControllerMessage>();
        let controller = PanelController::new(
            panel_id,
            create_provider(settings.to_provider_config()),
            outbox,
        )
        .with_response_limit(settings.max_response_bytes);

        cx.subscribe(&surface, |this, _, message: &SurfaceMessage, cx| {
            this.handle_surface_message(message.clone(), cx);
        })
        .detach();

        let inbox_task = cx.spawn(async move |this, cx| {
            while let Some(message) = inbox.recv().await {
                let posted = this.update(cx, |this, cx| {
                    this.post_to_surface(message, cx);
                });
                if posted.is_err() {
                    break;
                }
            }
        });

        Self {
            surface,
            controller,
            _inbox_task: inbox_task,
        }
    }

    fn handle_surface_message(&mut self, message: SurfaceMessage, cx: &mut Context<Self>) {
        let task = self.controller.on_surface_message(message);
        // In-flight requests outlive the panel; their posts are dropped once it closes.
        Tokio::spawn(cx, task).detach();
    }

    fn post_to_surface(&mut self, message: ControllerMessage, cx: &mut Context<Self>) {
        tracing::trace!(
            panel_id = self.controller.panel_id().0,
            command = message.command(),
            busy = self.controller.is_busy(),
            "posting to surface"
        );
        self.surface.update(cx, |surface, cx| {
            surface.on_controller_message(message, cx);
        });
    }
}

impl Render for ChatPanel {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        div().size_full().child(self.surface.clone())
    }
}
