//! Submission intake: validate, look for recent duplicates, and enqueue.

use crate::content;
use crate::db::NewSubmission;
use crate::error::{Error, Result};
use crate::types::{
    Event, ImageOptions, InterfaceLanguage, JobId, SubmissionId, SubmissionPayload,
    SubmissionStatus,
};
use crate::utils::source_hash;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Pipeline;

/// A finalized submission from the chat flow or the API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRequest {
    /// Chat that submitted the source
    pub chat_id: i64,
    /// Telegram user id of the submitter
    pub user_id: i64,
    /// Telegram username
    #[serde(default)]
    pub username: Option<String>,
    /// Single source URL
    #[serde(default)]
    pub url: Option<String>,
    /// Several URLs to combine into one article
    #[serde(default)]
    pub urls: Vec<String>,
    /// Source text when no URL is given
    #[serde(default)]
    pub text: Option<String>,
    /// Chosen category
    #[serde(default)]
    pub category: Option<String>,
    /// Interface language for chats without saved settings
    #[serde(default)]
    pub interface_language: Option<InterfaceLanguage>,
}

/// Result of [`Pipeline::enqueue_submission`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// A new job was queued
    Queued {
        /// Queued job
        job_id: JobId,
        /// Submission record created for it
        submission_id: SubmissionId,
    },
    /// The same user sent the same source recently and it is still in progress
    AlreadyQueued {
        /// Submission already in the queue
        submission_id: SubmissionId,
    },
    /// The same user sent the same source recently and it is already published
    AlreadyPublished {
        /// Published submission
        submission_id: SubmissionId,
        /// Public URLs of its articles
        urls: Vec<String>,
    },
}

/// Kind and canonical text of a submission source
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourceText {
    pub(crate) kind: &'static str,
    pub(crate) text: String,
}

/// Pick the source of a submission: several URLs, one URL, or text
pub(crate) fn source_of(
    url: Option<&str>,
    urls: &[String],
    text: Option<&str>,
) -> Result<SourceText> {
    if urls.len() > 1 {
        for candidate in urls {
            check_url(candidate)?;
        }
        return Ok(SourceText {
            kind: "url",
            text: urls.join("\n"),
        });
    }

    if let Some(url) = url.or(urls.first().map(String::as_str)) {
        check_url(url)?;
        return Ok(SourceText {
            kind: "url",
            text: url.trim().to_string(),
        });
    }

    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => Ok(SourceText {
            kind: "text",
            text: text.to_string(),
        }),
        None => Err(Error::Validation(
            "submission has neither a URL nor text".to_string(),
        )),
    }
}

fn check_url(candidate: &str) -> Result<()> {
    match url::Url::parse(candidate.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(Error::Validation(format!("invalid URL '{}'", candidate))),
    }
}

impl Pipeline {
    /// Queue a finalized submission
    ///
    /// Recent submissions of the same source by the same user (within
    /// `queue.dedup_window`) are reported instead of queued again. The chat's
    /// settings are copied into the job payload, so later settings changes do not
    /// affect queued work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed source and [`Error::Database`]
    /// when the store is unreachable; in the latter case the submission record is
    /// marked failed.
    pub async fn enqueue_submission(&self, request: SubmissionRequest) -> Result<EnqueueOutcome> {
        let source = source_of(request.url.as_deref(), &request.urls, request.text.as_deref())?;
        if source.kind == "text"
            && source.text.chars().count() < self.config.telegram.min_text_length
        {
            return Err(Error::Validation(format!(
                "text must be at least {} characters",
                self.config.telegram.min_text_length
            )));
        }

        let hash = source_hash(&source.text);

        if let Some(existing) = self
            .db
            .find_recent_duplicate(request.user_id, &hash, self.config.queue.dedup_window)
            .await?
        {
            tracing::info!(
                submission_id = %existing.id,
                user_id = request.user_id,
                status = existing.status().as_str(),
                "Recent duplicate submission"
            );
            return match existing.status() {
                SubmissionStatus::Published => {
                    let urls = self
                        .db
                        .list_articles_for_submission(existing.id)
                        .await?
                        .into_iter()
                        .map(|a| a.url)
                        .collect();
                    Ok(EnqueueOutcome::AlreadyPublished {
                        submission_id: existing.id,
                        urls,
                    })
                }
                _ => Ok(EnqueueOutcome::AlreadyQueued {
                    submission_id: existing.id,
                }),
            };
        }

        let settings = self
            .db
            .chat_settings_or_default(
                request.chat_id,
                &self.config.defaults,
                request.interface_language.unwrap_or_default(),
            )
            .await?;

        let category = request
            .category
            .as_deref()
            .and_then(content::normalize_category)
            .map(str::to_string);

        let submission_id = self
            .db
            .create_submission(&NewSubmission {
                chat_id: request.chat_id,
                user_id: request.user_id,
                username: request.username.clone(),
                kind: source.kind.to_string(),
                source: source.text.clone(),
                source_hash: hash,
                category: category.clone(),
            })
            .await?;

        let combined = request.urls.len() > 1;
        let payload = SubmissionPayload {
            chat_id: request.chat_id,
            user_id: request.user_id,
            username: request.username,
            url: if combined { None } else { request.url.or(request.urls.first().cloned()) },
            urls: if combined { request.urls } else { Vec::new() },
            text: if source.kind == "text" { Some(source.text) } else { None },
            category,
            style: settings.content_style,
            images: ImageOptions {
                count: settings.images_count.min(3),
                source: settings.images_source,
            },
            target_languages: self.config.site.target_languages.clone(),
            interface_language: settings.interface_language,
            auto_publish: settings.auto_publish,
            submission_id: Some(submission_id),
        };

        let job_id = match self
            .db
            .enqueue_job(&payload, self.config.queue.max_attempts)
            .await
        {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(submission_id = %submission_id, error = %e, "Failed to enqueue submission");
                if let Err(mark_err) = self
                    .db
                    .mark_submission_failed(submission_id, &e.to_string())
                    .await
                {
                    tracing::warn!(submission_id = %submission_id, error = %mark_err, "Failed to mark submission failed");
                }
                return Err(e);
            }
        };

        tracing::info!(
            job_id = %job_id,
            submission_id = %submission_id,
            chat_id = payload.chat_id,
            style = payload.style.as_str(),
            "Submission queued"
        );
        self.emit_event(Event::JobQueued {
            job_id,
            submission_id,
        });

        if self.config.worker.trigger_on_enqueue {
            self.trigger_worker();
        }

        Ok(EnqueueOutcome::Queued {
            job_id,
            submission_id,
        })
    }

    /// Start a worker run in the background without waiting for it
    pub(crate) fn trigger_worker(&self) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.run_worker(None).await {
                tracing::warn!(error = %e, "Triggered worker run failed");
            }
        });
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_of_prefers_multiple_urls() {
        let urls = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ];
        let source = source_of(None, &urls, Some("ignored")).unwrap();
        assert_eq!(source.kind, "url");
        assert_eq!(source.text, "https://example.com/a\nhttps://example.com/b");
    }

    #[test]
    fn test_source_of_single_url_and_text() {
        let source = source_of(Some(" https://example.com/a "), &[], None).unwrap();
        assert_eq!(source.text, "https://example.com/a");

        let source = source_of(None, &[], Some("  some text  ")).unwrap();
        assert_eq!(source.kind, "text");
        assert_eq!(source.text, "some text");
    }

    #[test]
    fn test_source_of_rejects_missing_and_bad_sources() {
        assert!(matches!(
            source_of(None, &[], Some("   ")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            source_of(Some("ftp://example.com/file"), &[], None),
            Err(Error::Validation(_))
        ));
    }
}
