//! The subset of Bot API update objects the webhook reads
//!
//! Unknown fields are ignored, so new Bot API versions do not break parsing.

use serde::Deserialize;

/// Incoming update
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    /// Monotonic update identifier, used to drop repeated deliveries
    pub update_id: i64,
    /// New message
    #[serde(default)]
    pub message: Option<Message>,
    /// Inline button press
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// Chat message
#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    /// Message identifier within the chat
    pub message_id: i64,
    /// Chat the message belongs to
    pub chat: Chat,
    /// Sender; empty for channel posts
    #[serde(default)]
    pub from: Option<User>,
    /// Text of a text message
    #[serde(default)]
    pub text: Option<String>,
    /// Caption of a media message
    #[serde(default)]
    pub caption: Option<String>,
}

impl Message {
    /// Text or caption, whichever is present
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

/// Chat reference
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Chat {
    /// Chat identifier
    pub id: i64,
}

/// Telegram user
#[derive(Clone, Debug, Deserialize)]
pub struct User {
    /// User identifier
    pub id: i64,
    /// Username without the @
    #[serde(default)]
    pub username: Option<String>,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// IETF language tag of the user's client
    #[serde(default)]
    pub language_code: Option<String>,
}

/// Inline button press
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    /// Query identifier, needed to answer it
    pub id: String,
    /// User who pressed the button
    pub from: User,
    /// Message the button belongs to
    #[serde(default)]
    pub message: Option<Message>,
    /// Callback data of the button
    #[serde(default)]
    pub data: Option<String>,
}
