/// Identifier for one open chat panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub u64);

impl PanelId {
    /// Creates a typed panel identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one request issued by a panel.
///
/// Increases on every submit so log lines of racing requests stay apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Creates a typed request identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Label shown in front of the turn text.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "AI",
        }
    }
}

/// One rendered line of the chat log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
}

impl ChatTurn {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}
