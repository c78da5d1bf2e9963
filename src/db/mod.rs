//! Database layer for submission-pipeline
//!
//! Handles SQLite persistence for the job queue, pending selections, submissions,
//! and published articles. All timestamps are Unix milliseconds.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`jobs`] — Lease-based job queue
//! - [`pending`] — Drafts awaiting category choice, with TTL
//! - [`submissions`] — Submission audit records and duplicate lookups
//! - [`articles`] — Per-language article store
//! - [`settings`] — Per-chat preferences
//! - [`state`] — Webhook update deduplication

use crate::error::Result;
use crate::types::{
    ChatSettings, ContentStyle, ImageSource, InterfaceLanguage, JobId, JobStatus, Language,
    StaleRecycleReport, SubmissionId, SubmissionPayload, SubmissionResult, SubmissionStatus,
};
use sqlx::{FromRow, sqlite::SqlitePool};

mod articles;
mod jobs;
mod migrations;
mod pending;
mod settings;
mod state;
mod submissions;

/// Job record from database
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    /// Unique database ID
    pub id: JobId,
    /// JSON-encoded [`SubmissionPayload`]
    pub payload: String,
    /// Status column (see [`JobStatus`])
    pub status: String,
    /// Claims made so far, including the current one
    pub attempt_count: i64,
    /// Attempts allowed before permanent failure
    pub max_attempts: i64,
    /// End of the current lease, when claimed
    pub lease_expires_at: Option<i64>,
    /// Earliest time a pending job may be claimed
    pub available_at: i64,
    /// Error from the most recent failed attempt
    pub last_error: Option<String>,
    /// JSON-encoded [`SubmissionResult`], when completed
    pub result: Option<String>,
    /// Creation time
    pub created_at: i64,
    /// Last status change
    pub updated_at: i64,
    /// Completion time
    pub completed_at: Option<i64>,
}

impl Job {
    /// Parsed status
    pub fn status(&self) -> JobStatus {
        JobStatus::from_db(&self.status)
    }

    /// Decode the payload
    pub fn payload(&self) -> Result<SubmissionPayload> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    /// Decode the stored result, if any
    pub fn result(&self) -> Result<Option<SubmissionResult>> {
        match &self.result {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    /// Whether another attempt is allowed after the current one
    pub fn has_attempts_left(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

/// Result of a stale-lease sweep
#[derive(Debug, Clone, Default)]
pub struct StaleSweep {
    /// Expired claims returned to pending
    pub requeued: u32,
    /// Expired claims with no attempts left, now failed
    pub failed: Vec<Job>,
}

impl StaleSweep {
    /// Counts for the worker summary and events
    pub fn report(&self) -> StaleRecycleReport {
        StaleRecycleReport {
            requeued: self.requeued,
            failed: u32::try_from(self.failed.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Draft article awaiting a category choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDraft {
    /// Draft title
    pub title: String,
    /// Draft body (or the URL, for URL sources)
    pub content: String,
    /// Short summary
    pub excerpt: String,
    /// Currently selected category
    pub category: String,
    /// Word count of the draft body
    pub word_count: u32,
    /// Whether the source is a URL
    pub is_url: bool,
    /// The message exactly as the user sent it
    pub original_text: String,
}

/// Pending selection record from database
#[derive(Debug, Clone, FromRow)]
pub struct PendingSelection {
    /// Conversation the draft belongs to
    pub chat_id: i64,
    /// Draft title
    pub title: String,
    /// Draft body (or the URL, for URL sources)
    pub content: String,
    /// Short summary
    pub excerpt: String,
    /// Currently selected category
    pub category: String,
    /// Word count of the draft body
    pub word_count: i64,
    /// Whether the source is a URL
    pub is_url: bool,
    /// The message exactly as the user sent it
    pub original_text: String,
    /// Creation time, the TTL reference point
    pub created_at: i64,
}

/// New submission to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// Chat that submitted the source
    pub chat_id: i64,
    /// Telegram user id
    pub user_id: i64,
    /// Telegram username
    pub username: Option<String>,
    /// "url" or "text"
    pub kind: String,
    /// The URL(s) or text
    pub source: String,
    /// SHA-256 of the normalized source
    pub source_hash: String,
    /// Category chosen at intake
    pub category: Option<String>,
}

/// Submission record from database
#[derive(Debug, Clone, FromRow)]
pub struct Submission {
    /// Unique database ID, the logical article identity
    pub id: SubmissionId,
    /// Chat that submitted the source
    pub chat_id: i64,
    /// Telegram user id
    pub user_id: i64,
    /// Telegram username
    pub username: Option<String>,
    /// "url" or "text"
    pub kind: String,
    /// The URL(s) or text
    pub source: String,
    /// SHA-256 of the normalized source
    pub source_hash: String,
    /// Status column (see [`SubmissionStatus`])
    pub status: String,
    /// Primary-language title, once known
    pub title: Option<String>,
    /// Category
    pub category: Option<String>,
    /// Reason of the last failure
    pub error_message: Option<String>,
    /// Processing time of the successful run
    pub processing_ms: Option<i64>,
    /// Creation time
    pub created_at: i64,
    /// Last update
    pub updated_at: i64,
}

impl Submission {
    /// Parsed status
    pub fn status(&self) -> SubmissionStatus {
        SubmissionStatus::from_db(&self.status)
    }
}

/// Article variant to be upserted
#[derive(Debug, Clone)]
pub struct NewArticle {
    /// Logical identity shared by all languages
    pub submission_id: SubmissionId,
    /// Language of this variant
    pub language: Language,
    /// Per-language slug
    pub slug: String,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Short summary
    pub excerpt: String,
    /// Category
    pub category: String,
    /// Word count of the body
    pub word_count: u32,
    /// Lead image
    pub image_url: Option<String>,
    /// Original source URL
    pub source_url: Option<String>,
    /// Public URL
    pub url: String,
    /// Visible on the site
    pub published: bool,
}

/// Article record from database
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    /// Unique database ID
    pub id: i64,
    /// Logical identity shared by all languages
    pub submission_id: SubmissionId,
    /// Language code
    pub language: String,
    /// Per-language slug
    pub slug: String,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Short summary
    pub excerpt: String,
    /// Category
    pub category: String,
    /// Word count of the body
    pub word_count: i64,
    /// Lead image
    pub image_url: Option<String>,
    /// Original source URL
    pub source_url: Option<String>,
    /// Public URL
    pub url: String,
    /// Visible on the site
    pub published: bool,
    /// Creation time
    pub created_at: i64,
    /// Last update
    pub updated_at: i64,
}

/// Chat settings record from database
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ChatSettingsRow {
    pub(crate) chat_id: i64,
    pub(crate) content_style: String,
    pub(crate) images_count: i64,
    pub(crate) images_source: String,
    pub(crate) auto_publish: bool,
    pub(crate) interface_language: String,
    pub(crate) combine_urls: bool,
}

impl From<ChatSettingsRow> for ChatSettings {
    fn from(row: ChatSettingsRow) -> Self {
        ChatSettings {
            chat_id: row.chat_id,
            content_style: ContentStyle::parse(&row.content_style).unwrap_or_default(),
            images_count: row.images_count.clamp(0, 3) as u8,
            images_source: ImageSource::parse(&row.images_source).unwrap_or_default(),
            auto_publish: row.auto_publish,
            interface_language: InterfaceLanguage::from_code(&row.interface_language)
                .unwrap_or_default(),
            combine_urls: row.combine_urls,
        }
    }
}

/// Database handle
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
