use serde::{Deserialize, Serialize};

/// Speaker role of a single conversation turn.
///
/// `Admin` marks messages a human operator sent through the linked business
/// account; they are kept in history for backend context but never answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Admin => "admin",
        }
    }
}

/// One message unit in a conversation. Immutable once appended; arrival
/// order is causal order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Which inbound channel an event arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Direct chat with the bot account.
    Primary,
    /// A linked business account through which a human admin can also reply
    /// in the same chat the bot serves.
    Business,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "Telegram Bot",
            Self::Business => "Telegram Business",
        }
    }
}

/// Stable identity of a conversation.
///
/// The two identity schemes are deliberately distinct: primary-channel
/// conversations are keyed by the end-user account identity, business-channel
/// conversations by the chat identity shared between the client and the
/// business account. They render to prefixed storage keys so the schemes can
/// never collide without an explicit migration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversationKey {
    User(String),
    Chat(String),
}

impl ConversationKey {
    pub fn user(identity: impl Into<String>) -> Self {
        Self::User(identity.into())
    }

    pub fn chat(identity: impl Into<String>) -> Self {
        Self::Chat(identity.into())
    }

    pub fn storage_key(&self) -> String {
        match self {
            Self::User(identity) => format!("user:{identity}"),
            Self::Chat(identity) => format!("chat:{identity}"),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.storage_key())
    }
}
