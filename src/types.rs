//! Core types and events

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<i64> for $name {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

id_newtype!(
    /// Unique identifier of a queued job
    JobId
);

id_newtype!(
    /// Unique identifier of a submission, the logical identity shared by all
    /// language variants of one article
    SubmissionId
);

/// Job status in the queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed
    Pending,
    /// Leased by a worker run
    Claimed,
    /// Finished successfully (terminal)
    Completed,
    /// Failed permanently (terminal)
    Failed,
}

impl JobStatus {
    /// Column value stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Claimed => "claimed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a stored column value; unknown values are treated as failed
    pub fn from_db(value: &str) -> Self {
        match value {
            "pending" => JobStatus::Pending,
            "claimed" => JobStatus::Claimed,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// User-facing lifecycle of a submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting in the job queue
    Queued,
    /// A worker is running the pipeline
    Processing,
    /// Articles are stored
    Published,
    /// Processing gave up
    Failed,
}

impl SubmissionStatus {
    /// Column value stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Published => "published",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// Parse a stored column value; unknown values are treated as failed
    pub fn from_db(value: &str) -> Self {
        match value {
            "queued" => SubmissionStatus::Queued,
            "processing" => SubmissionStatus::Processing,
            "published" => SubmissionStatus::Published,
            _ => SubmissionStatus::Failed,
        }
    }
}

/// Publishing language of an article variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    En,
    /// Polish
    Pl,
}

impl Language {
    /// ISO 639-1 code, also used as slug suffix and URL segment
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pl => "pl",
        }
    }

    /// English name, used in translation prompts
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Pl => "Polish",
        }
    }

    /// Parse an ISO code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "pl" => Some(Language::Pl),
            _ => None,
        }
    }
}

/// Language of bot messages shown to a chat
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceLanguage {
    /// Russian
    Ru,
    /// English
    #[default]
    En,
    /// Polish
    Pl,
}

impl InterfaceLanguage {
    /// Column value stored in the database
    pub fn code(&self) -> &'static str {
        match self {
            InterfaceLanguage::Ru => "ru",
            InterfaceLanguage::En => "en",
            InterfaceLanguage::Pl => "pl",
        }
    }

    /// Pick a language from a Telegram `language_code` such as "ru" or "pl-PL"
    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.trim().to_ascii_lowercase();
        if lower.starts_with("ru") {
            Some(InterfaceLanguage::Ru)
        } else if lower.starts_with("pl") {
            Some(InterfaceLanguage::Pl)
        } else if lower.starts_with("en") {
            Some(InterfaceLanguage::En)
        } else {
            None
        }
    }
}

/// How the source text is turned into an article
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentStyle {
    /// News-style rewrite
    #[default]
    Journalistic,
    /// Publish the source text verbatim
    KeepAsIs,
    /// Rewrite with search-friendly headings and phrasing
    SeoOptimized,
    /// Formal, structured rewrite
    Academic,
    /// Conversational rewrite
    Casual,
    /// Detail-oriented rewrite for a technical audience
    Technical,
}

impl ContentStyle {
    /// All styles, in menu order
    pub const ALL: [ContentStyle; 6] = [
        ContentStyle::Journalistic,
        ContentStyle::KeepAsIs,
        ContentStyle::SeoOptimized,
        ContentStyle::Academic,
        ContentStyle::Casual,
        ContentStyle::Technical,
    ];

    /// Column value stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStyle::Journalistic => "journalistic",
            ContentStyle::KeepAsIs => "keep_as_is",
            ContentStyle::SeoOptimized => "seo_optimized",
            ContentStyle::Academic => "academic",
            ContentStyle::Casual => "casual",
            ContentStyle::Technical => "technical",
        }
    }

    /// Parse a stored or user-typed value
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim().to_ascii_lowercase())
    }

    /// Instruction for the text generator
    pub fn instruction(&self) -> &'static str {
        match self {
            ContentStyle::Journalistic => {
                "Rewrite as a clear, neutral news article with a strong lead paragraph."
            }
            ContentStyle::KeepAsIs => "Keep the original wording; only fix formatting.",
            ContentStyle::SeoOptimized => {
                "Rewrite for search engines: descriptive title, short paragraphs, natural keywords."
            }
            ContentStyle::Academic => {
                "Rewrite in a formal, well-structured academic register with precise terminology."
            }
            ContentStyle::Casual => "Rewrite in a friendly, conversational tone.",
            ContentStyle::Technical => {
                "Rewrite for a technical audience, keeping specifications, numbers, and details."
            }
        }
    }
}

/// Where article images come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    /// Stock photography
    #[default]
    Unsplash,
    /// Generated images
    Ai,
    /// No images
    None,
}

impl ImageSource {
    /// Column value stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Unsplash => "unsplash",
            ImageSource::Ai => "ai",
            ImageSource::None => "none",
        }
    }

    /// Parse a stored or user-typed value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unsplash" => Some(ImageSource::Unsplash),
            "ai" => Some(ImageSource::Ai),
            "none" => Some(ImageSource::None),
            _ => None,
        }
    }
}

/// Image options for one submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageOptions {
    /// Number of images, 0-3
    pub count: u8,
    /// Image source
    pub source: ImageSource,
}

impl ImageOptions {
    /// Whether any image should be fetched
    pub fn enabled(&self) -> bool {
        self.count > 0 && self.source != ImageSource::None
    }
}

/// Per-chat preferences
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatSettings {
    /// Chat the settings belong to
    pub chat_id: i64,
    /// Content style for new submissions
    pub content_style: ContentStyle,
    /// Images per article, 0-3
    pub images_count: u8,
    /// Image source
    pub images_source: ImageSource,
    /// Publish immediately instead of saving drafts
    pub auto_publish: bool,
    /// Language of bot messages
    pub interface_language: InterfaceLanguage,
    /// Merge several URLs from one message into one article
    pub combine_urls: bool,
}

/// Work description stored with each queued job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionPayload {
    /// Chat that submitted the source
    pub chat_id: i64,
    /// Telegram user id of the submitter
    pub user_id: i64,
    /// Telegram username, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Source URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Several source URLs combined into one article
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// Source text when no URL is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Chosen category, validated during processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Content style
    #[serde(default)]
    pub style: ContentStyle,
    /// Image options
    pub images: ImageOptions,
    /// Publishing languages, primary first
    pub target_languages: Vec<Language>,
    /// Language of notifications for this submission
    #[serde(default)]
    pub interface_language: InterfaceLanguage,
    /// Publish immediately instead of saving drafts
    #[serde(default = "default_true")]
    pub auto_publish: bool,
    /// Submission record this job resumes; set at enqueue time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
}

fn default_true() -> bool {
    true
}

/// Ordered stages of the submission processor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fetch and extract the source
    Resolve,
    /// Refuse already-published sources
    Dedupe,
    /// Apply the content style and normalize
    Transform,
    /// Produce secondary-language variants
    Translate,
    /// Fetch and place images
    Images,
    /// Assign per-language slugs
    Identify,
    /// Store the article rows
    Persist,
    /// Report the outcome to the chat
    Notify,
}

/// Timing of one completed stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StageRecord {
    /// Stage that finished
    pub stage: Stage,
    /// Time spent in the stage
    pub duration_ms: u64,
}

/// Published outcome for one language
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LanguageOutcome {
    /// Language of the variant
    pub language: Language,
    /// Slug of the stored article
    pub slug: String,
    /// Public URL of the article
    pub url: String,
}

/// Result attached to a completed job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResult {
    /// Logical article identity
    pub submission_id: SubmissionId,
    /// Primary-language title
    pub title: String,
    /// One entry per published language
    pub outcomes: Vec<LanguageOutcome>,
    /// Total processing time
    pub duration_ms: u64,
    /// Whether the pipeline succeeded
    pub success: bool,
    /// The source had already been published by another submission
    #[serde(default)]
    pub duplicate: bool,
    /// Stages that ran, in order
    #[serde(default)]
    pub stages: Vec<StageRecord>,
}

impl SubmissionResult {
    /// URL of the given language, if published
    pub fn url_for(&self, language: Language) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|o| o.language == language)
            .map(|o| o.url.as_str())
    }
}

/// Result of a `fail_job` call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailOutcome {
    /// The job went back to pending
    pub retried: bool,
    /// The update matched the claim; false when another run already moved the job on
    pub applied: bool,
    /// Attempts used so far
    pub attempt_count: u32,
    /// Attempts allowed
    pub max_attempts: u32,
}

/// Counts from one stale-lease sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StaleRecycleReport {
    /// Expired claims returned to pending
    pub requeued: u32,
    /// Expired claims with no attempts left, failed permanently
    pub failed: u32,
}

/// Outcome of one worker run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    /// Jobs claimed by this run
    pub claimed: u32,
    /// Jobs completed
    pub completed: u32,
    /// Jobs failed permanently
    pub failed: u32,
    /// Jobs returned to pending for another attempt
    pub retried: u32,
    /// Stale claims returned to pending
    pub stale_requeued: u32,
    /// Stale claims failed permanently
    pub stale_failed: u32,
    /// Claimed jobs released unstarted because the budget ran out
    pub deferred: u32,
    /// Wall-clock time of the run
    pub duration_ms: u64,
    /// RFC 3339 time the run finished
    pub timestamp: String,
}

/// Job counts per status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    /// Jobs waiting to be claimed
    pub pending: u64,
    /// Jobs currently leased
    pub claimed: u64,
    /// Completed jobs
    pub completed: u64,
    /// Permanently failed jobs
    pub failed: u64,
}

/// Event emitted during the pipeline lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A submission entered the queue
    JobQueued {
        /// Job ID
        job_id: JobId,
        /// Submission the job belongs to
        submission_id: SubmissionId,
    },

    /// A worker run leased a job
    JobClaimed {
        /// Job ID
        job_id: JobId,
        /// Attempt number of this claim
        attempt: u32,
    },

    /// A processor stage finished
    StageCompleted {
        /// Job ID
        job_id: JobId,
        /// Stage that finished
        stage: Stage,
    },

    /// A job finished successfully
    JobCompleted {
        /// Job ID
        job_id: JobId,
        /// Published result
        result: SubmissionResult,
    },

    /// A job's source had already been published
    JobDuplicate {
        /// Job ID
        job_id: JobId,
        /// Submission that published it first
        existing: SubmissionId,
    },

    /// A job failed and will be retried
    JobRetryScheduled {
        /// Job ID
        job_id: JobId,
        /// Attempts used so far
        attempt: u32,
        /// Attempts allowed
        max_attempts: u32,
        /// Error message
        error: String,
    },

    /// A job failed permanently
    JobFailed {
        /// Job ID
        job_id: JobId,
        /// Error message
        error: String,
    },

    /// Expired claims were recycled
    StaleJobsRecycled {
        /// Claims returned to pending
        requeued: u32,
        /// Claims failed permanently
        failed: u32,
    },

    /// A chat notification could not be delivered
    NotificationFailed {
        /// Target chat
        chat_id: i64,
        /// Error message
        error: String,
    },
}

impl Event {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::JobQueued { .. } => "job_queued",
            Event::JobClaimed { .. } => "job_claimed",
            Event::StageCompleted { .. } => "stage_completed",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobDuplicate { .. } => "job_duplicate",
            Event::JobRetryScheduled { .. } => "job_retry_scheduled",
            Event::JobFailed { .. } => "job_failed",
            Event::StaleJobsRecycled { .. } => "stale_jobs_recycled",
            Event::NotificationFailed { .. } => "notification_failed",
        }
    }
}
