use crate::chat::events::{ControllerMessage, SurfaceMessage};
use crate::chat::message::ChatTurn;

/// What the display surface shows: an append-only list of turns plus the
/// thinking indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    turns: Vec<ChatTurn>,
    thinking: bool,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// Records a user submission.
    ///
    /// Whitespace-only input is ignored. Otherwise the trimmed text becomes a
    /// user turn and the message for the controller is returned.
    pub fn submit(&mut self, raw: &str) -> Option<SurfaceMessage> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        self.turns.push(ChatTurn::user(text));
        Some(SurfaceMessage::chat(text))
    }

    /// Applies one controller message. Returns true when a turn was appended.
    pub fn apply(&mut self, message: ControllerMessage) -> bool {
        match message {
            ControllerMessage::ReceiveMessage { text } => {
                self.turns.push(ChatTurn::assistant(text));
                true
            }
            ControllerMessage::Thinking { is_thinking } => {
                self.thinking = is_thinking;
                false
            }
        }
    }
}
