//! Inline keyboards of the draft flow and their callback data

use crate::content::CATEGORIES;
use crate::notifier::{InlineButton, InlineKeyboard};
use crate::pipeline::messages::Messages;

/// Prefix of category buttons: `cat:<category>`
pub const CATEGORY_PREFIX: &str = "cat:";
/// Re-open the category menu
pub const CATEGORY_MENU: &str = "cat:menu";
/// Queue the draft
pub const PUBLISH: &str = "publish";
/// Drop the draft
pub const CANCEL: &str = "cancel";

const CATEGORIES_PER_ROW: usize = 2;

/// Button press decoded from callback data
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// A category was picked
    Category(String),
    /// Show the category menu again
    CategoryMenu,
    /// Queue the draft
    Publish,
    /// Drop the draft
    Cancel,
    /// Anything else
    Unknown,
}

impl Action {
    /// Decode callback data
    pub fn parse(data: &str) -> Self {
        match data {
            CATEGORY_MENU => Action::CategoryMenu,
            PUBLISH => Action::Publish,
            CANCEL => Action::Cancel,
            other => match other.strip_prefix(CATEGORY_PREFIX) {
                Some(category) if !category.is_empty() => Action::Category(category.to_string()),
                _ => Action::Unknown,
            },
        }
    }
}

/// One button per category, two per row, and a cancel row
pub fn category_keyboard(messages: &Messages) -> InlineKeyboard {
    let mut keyboard = InlineKeyboard::default();
    for chunk in CATEGORIES.chunks(CATEGORIES_PER_ROW) {
        keyboard = keyboard.row(
            chunk
                .iter()
                .map(|c| {
                    InlineButton::new(messages.category_label(c), format!("{}{}", CATEGORY_PREFIX, c))
                })
                .collect(),
        );
    }
    keyboard.row(vec![InlineButton::new(messages.cancel_button(), CANCEL)])
}

/// Publish, change category, cancel
pub fn confirm_keyboard(messages: &Messages) -> InlineKeyboard {
    InlineKeyboard::default()
        .row(vec![InlineButton::new(messages.publish_button(), PUBLISH)])
        .row(vec![
            InlineButton::new(messages.change_category_button(), CATEGORY_MENU),
            InlineButton::new(messages.cancel_button(), CANCEL),
        ])
}
