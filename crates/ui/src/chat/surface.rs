use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{ActiveTheme, label::Label, v_flex};

use crate::chat::events::{ControllerMessage, Submit, SurfaceMessage};
use crate::chat::log::ChatLog;
use crate::chat::message::ChatTurn;
use crate::chat::message_input::MessageInput;
use crate::chat::scroll_manager::ScrollManager;

pub const THINKING_LABEL: &str = "AI is thinking...";

/// Display surface of one panel: scrolling log, thinking row and input box.
///
/// Holds no request logic; submissions are emitted as [`SurfaceMessage`].
pub struct ChatSurface {
    log: ChatLog,
    message_input: Entity<MessageInput>,
    scroll_manager: ScrollManager,
}

impl EventEmitter<SurfaceMessage> for ChatSurface {}

impl ChatSurface {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.on_submit(event, cx);
        })
        .detach();

        Self {
            log: ChatLog::new(),
            message_input,
            scroll_manager: ScrollManager::new(),
        }
    }

    fn on_submit(&mut self, event: &Submit, cx: &mut Context<Self>) {
        let Some(message) = self.log.submit(&event.content) else {
            return;
        };

        self.scroll_manager.request_scroll_to_bottom();
        cx.emit(message);
        cx.notify();
    }

    pub fn on_controller_message(&mut self, message: ControllerMessage, cx: &mut Context<Self>) {
        if self.log.apply(message) {
            self.scroll_manager.request_scroll_to_bottom();
        }
        cx.notify();
    }

    fn render_turn(&self, index: usize, turn: &ChatTurn, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();
        let background = if index % 2 == 0 {
            theme.background
        } else {
            theme.muted
        };

        v_flex()
            .id(("chat-turn", index))
            .w_full()
            .gap_1()
            .p_2()
            .rounded_md()
            .bg(background)
            .child(
                div()
                    .font_weight(FontWeight::BOLD)
                    .text_sm()
                    .child(SharedString::from(format!("{}:", turn.sender.label()))),
            )
            .child(Label::new(turn.text.clone()).text_sm())
            .into_any_element()
    }
}

impl Render for ChatSurface {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.scroll_manager.apply_pending_scroll();
        let theme = cx.theme();
        let turns = self
            .log
            .turns()
            .iter()
            .enumerate()
            .map(|(index, turn)| self.render_turn(index, turn, cx))
            .collect::<Vec<_>>();

        v_flex()
            .id("chat-surface")
            .size_full()
            .min_h_0()
            .gap_2()
            .p_3()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-log")
                    .flex_1()
                    .min_h_0()
                    .overflow_y_scroll()
                    .track_scroll(self.scroll_manager.handle())
                    .p_2()
                    .rounded_md()
                    .border_1()
                    .border_color(theme.border)
                    .child(v_flex().w_full().gap_2().children(turns)),
            )
            .when(self.log.is_thinking(), |column| {
                column.child(
                    div()
                        .id("chat-thinking")
                        .italic()
                        .text_sm()
                        .text_color(theme.muted_foreground)
                        .child(THINKING_LABEL),
                )
            })
            .child(
                div()
                    .id("chat-input")
                    .flex_shrink_0()
                    .w_full()
                    .child(self.message_input.clone()),
            )
    }
}
