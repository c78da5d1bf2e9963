//! Telegram webhook receiver
//!
//! Turns Bot API updates into drafts, settings changes, and queued submissions.
//! The interactive flow is:
//!
//! 1. A message with text or one URL becomes a draft in the pending selection
//!    store, answered with a category keyboard.
//! 2. `cat:<category>` buttons change the draft's category; the confirmation
//!    shows `publish`, `cat:menu`, and `cancel`.
//! 3. `publish` removes the draft and enqueues the submission.
//!
//! Messages with several URLs skip the draft and are queued directly.

mod handler;
pub mod keyboards;
pub mod types;

pub use types::{CallbackQuery, Chat, Message, Update, User};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
