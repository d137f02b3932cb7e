use serde::{Deserialize, Serialize};

/// Messages the display surface sends to its panel controller.
///
/// The serde form matches the JSON the surface posts, e.g.
/// `{"command":"chat","text":"hi"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceMessage {
    Chat { text: String },
}

/// Messages the panel controller posts back to the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ControllerMessage {
    ReceiveMessage {
        text: String,
    },
    Thinking {
        #[serde(rename = "isThinking")]
        is_thinking: bool,
    },
}

impl SurfaceMessage {
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat { text: text.into() }
    }
}

impl ControllerMessage {
    pub fn receive(text: impl Into<String>) -> Self {
        Self::ReceiveMessage { text: text.into() }
    }

    pub fn thinking(is_thinking: bool) -> Self {
        Self::Thinking { is_thinking }
    }

    /// Short name used in log lines.
    pub fn command(&self) -> &'static str {
        match self {
            Self::ReceiveMessage { .. } => "receiveMessage",
            Self::Thinking { .. } => "thinking",
        }
    }
}

/// Emitted by the message input when the user presses send.
///
/// Carries the raw input value; trimming happens in the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub content: String,
}

impl Submit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn surface_messages_use_the_command_discriminant() {
        let value = serde_json::to_value(SurfaceMessage::chat("2+2?")).expect("serializable");
        assert_eq!(value, json!({ "command": "chat", "text": "2+2?" }));

        let parsed: SurfaceMessage =
            serde_json::from_value(json!({ "command": "chat", "text": "hi" })).expect("valid");
        assert_eq!(parsed, SurfaceMessage::chat("hi"));
    }

    #[test]
    fn controller_messages_use_the_command_discriminant() {
        let receive = serde_json::to_value(ControllerMessage::receive("4")).expect("serializable");
        assert_eq!(receive, json!({ "command": "receiveMessage", "text": "4" }));

        let thinking =
            serde_json::to_value(ControllerMessage::thinking(true)).expect("serializable");
        assert_eq!(thinking, json!({ "command": "thinking", "isThinking": true }));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let parsed = serde_json::from_value::<ControllerMessage>(
            json!({ "command": "editMessage", "text": "x" }),
        );

        assert!(parsed.is_err());
    }
}
