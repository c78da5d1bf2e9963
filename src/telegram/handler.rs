//! Webhook update handling: commands, drafts, and inline button callbacks.
//!
//! Nothing here does heavy work; finalized submissions go to the job queue.

use crate::content::{self, EXCERPT_MAX_CHARS};
use crate::db::PendingDraft;
use crate::error::{Error, ErrorCategory, Result};
use crate::pipeline::messages::Messages;
use crate::pipeline::{EnqueueOutcome, Pipeline, SubmissionRequest};
use crate::types::{ChatSettings, ContentStyle, ImageSource, InterfaceLanguage};
use crate::utils::{count_words, extract_urls, truncate_chars};

use super::keyboards::{Action, category_keyboard, confirm_keyboard};
use super::types::{CallbackQuery, Message, Update, User};

/// Submissions listed by /queue and /status
const STATUS_LIST_LIMIT: u32 = 5;

/// Maximum draft title length taken from a text message
const DRAFT_TITLE_MAX_CHARS: usize = 80;

/// Used when neither the keywords nor the configured default name a category
const FALLBACK_CATEGORY: &str = "tech";

impl Pipeline {
    /// Handle one webhook update
    ///
    /// Repeated deliveries of the same `update_id` are ignored. Chat-facing
    /// failures are reported to the chat; only store errors are returned.
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if !self.db.record_webhook_update(update.update_id).await? {
            tracing::debug!(update_id = update.update_id, "Ignoring repeated update");
            return Ok(());
        }

        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }

        tracing::debug!(update_id = update.update_id, "Ignoring update without message");
        Ok(())
    }

    async fn settings_for(&self, chat_id: i64, user: Option<&User>) -> Result<ChatSettings> {
        let language = user
            .and_then(|u| u.language_code.as_deref())
            .and_then(InterfaceLanguage::from_code)
            .unwrap_or_default();
        self.db
            .chat_settings_or_default(chat_id, &self.config.defaults, language)
            .await
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let Some(body) = message.body().map(str::trim).filter(|b| !b.is_empty()) else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let settings = self.settings_for(chat_id, message.from.as_ref()).await?;
        let messages = Messages::new(settings.interface_language);

        if body.starts_with('/') {
            return self
                .handle_command(chat_id, message.from.as_ref(), body, settings)
                .await;
        }

        let urls = extract_urls(body);
        match urls.len() {
            0 => {
                let min = self.config.telegram.min_text_length;
                if body.chars().count() < min {
                    self.notify(chat_id, &messages.too_short(min), None).await;
                    return Ok(());
                }
                self.start_draft(chat_id, &messages, text_draft(body, &self.config.site.default_category))
                    .await
            }
            1 => {
                let draft = url_draft(&urls[0], body, &self.config.site.default_category);
                self.start_draft(chat_id, &messages, draft).await
            }
            _ => {
                self.enqueue_batch(chat_id, message.from.as_ref(), body, urls, &settings)
                    .await
            }
        }
    }

    async fn start_draft(&self, chat_id: i64, messages: &Messages, draft: PendingDraft) -> Result<()> {
        self.db.set_pending_selection(chat_id, &draft).await?;
        tracing::debug!(chat_id, is_url = draft.is_url, category = %draft.category, "Draft created");

        self.notify(
            chat_id,
            &messages.draft_prompt(&draft.title, &draft.category),
            Some(&category_keyboard(messages)),
        )
        .await;
        Ok(())
    }

    /// Several URLs in one message: one combined submission or one per URL
    async fn enqueue_batch(
        &self,
        chat_id: i64,
        from: Option<&User>,
        body: &str,
        mut urls: Vec<String>,
        settings: &ChatSettings,
    ) -> Result<()> {
        let messages = Messages::new(settings.interface_language);
        let limit = self.config.telegram.max_batch_urls.max(1);
        if urls.len() > limit {
            let ignored = urls.len() - limit;
            urls.truncate(limit);
            self.notify(chat_id, &messages.extra_urls_ignored(ignored, limit), None)
                .await;
        }

        let category = content::guess_category(body).map(str::to_string);
        let base = SubmissionRequest {
            chat_id,
            user_id: from.map(|u| u.id).unwrap_or(chat_id),
            username: from.and_then(|u| u.username.clone()),
            category,
            interface_language: Some(settings.interface_language),
            ..Default::default()
        };

        if settings.combine_urls && urls.len() > 1 {
            let result = self
                .enqueue_submission(SubmissionRequest {
                    urls,
                    ..base
                })
                .await;
            self.report_enqueue(chat_id, None, &messages, result).await;
            return Ok(());
        }

        for url in urls {
            let result = self
                .enqueue_submission(SubmissionRequest {
                    url: Some(url),
                    ..base.clone()
                })
                .await;
            self.report_enqueue(chat_id, None, &messages, result).await;
        }
        Ok(())
    }

    /// Tell the chat what happened to an enqueue attempt
    async fn report_enqueue(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        messages: &Messages,
        result: Result<EnqueueOutcome>,
    ) {
        let text = match result {
            Ok(EnqueueOutcome::Queued { submission_id, .. }) => messages.queued(submission_id),
            Ok(EnqueueOutcome::AlreadyQueued { submission_id }) => {
                messages.already_queued(submission_id)
            }
            Ok(EnqueueOutcome::AlreadyPublished { urls, .. }) => messages.duplicate(&urls),
            Err(Error::Validation(reason)) => {
                tracing::info!(chat_id, reason = %reason, "Submission rejected");
                messages.failed(ErrorCategory::Validation)
            }
            Err(e) => {
                tracing::error!(chat_id, error = %e, "Failed to enqueue submission");
                messages.enqueue_failed()
            }
        };
        self.notify_update(chat_id, message_id, &text, None).await;
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        let data = query.data.as_deref().unwrap_or_default();
        let Some(message) = query.message.as_ref() else {
            self.answer(&query.id, None).await;
            return Ok(());
        };
        let chat_id = message.chat.id;
        let message_id = Some(message.message_id);
        let settings = self.settings_for(chat_id, Some(&query.from)).await?;
        let messages = Messages::new(settings.interface_language);
        let ttl = self.config.pending.ttl;

        let toast = match Action::parse(data) {
            Action::Category(category) => match content::normalize_category(&category) {
                Some(category) => {
                    if self.db.update_pending_category(chat_id, category, ttl).await? {
                        match self.db.get_pending_selection(chat_id, ttl).await? {
                            Some(draft) => {
                                self.notify_update(
                                    chat_id,
                                    message_id,
                                    &messages.category_confirmed(&draft.title, category),
                                    Some(&confirm_keyboard(&messages)),
                                )
                                .await;
                                None
                            }
                            None => Some(self.draft_expired(chat_id, message_id, &messages).await),
                        }
                    } else {
                        Some(self.draft_expired(chat_id, message_id, &messages).await)
                    }
                }
                None => Some(messages.unknown_action().to_string()),
            },

            Action::CategoryMenu => match self.db.get_pending_selection(chat_id, ttl).await? {
                Some(draft) => {
                    self.notify_update(
                        chat_id,
                        message_id,
                        &messages.draft_prompt(&draft.title, &draft.category),
                        Some(&category_keyboard(&messages)),
                    )
                    .await;
                    None
                }
                None => Some(self.draft_expired(chat_id, message_id, &messages).await),
            },

            Action::Publish => match self.db.get_pending_selection(chat_id, ttl).await? {
                Some(draft) => {
                    self.db.remove_pending_selection(chat_id).await?;
                    let request = SubmissionRequest {
                        chat_id,
                        user_id: query.from.id,
                        username: query.from.username.clone(),
                        url: draft.is_url.then(|| draft.content.clone()),
                        text: (!draft.is_url).then(|| draft.original_text.clone()),
                        category: Some(draft.category.clone()),
                        interface_language: Some(settings.interface_language),
                        ..Default::default()
                    };
                    let result = self.enqueue_submission(request).await;
                    self.report_enqueue(chat_id, message_id, &messages, result)
                        .await;
                    None
                }
                None => Some(self.draft_expired(chat_id, message_id, &messages).await),
            },

            Action::Cancel => {
                let text = if self.db.remove_pending_selection(chat_id).await? {
                    messages.cancelled()
                } else {
                    messages.nothing_to_cancel()
                };
                self.notify_update(chat_id, message_id, &text, None).await;
                None
            }

            Action::Unknown => {
                tracing::debug!(chat_id, data, "Unknown callback data");
                Some(messages.unknown_action().to_string())
            }
        };

        self.answer(&query.id, toast.as_deref()).await;
        Ok(())
    }

    async fn draft_expired(&self, chat_id: i64, message_id: Option<i64>, messages: &Messages) -> String {
        let text = messages.draft_expired();
        self.notify_update(chat_id, message_id, &text, None).await;
        text
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.services.notifier.answer_callback(callback_id, text).await {
            tracing::warn!(callback_id, error = %e, "Failed to answer callback query");
        }
    }

    async fn handle_command(
        &self,
        chat_id: i64,
        from: Option<&User>,
        body: &str,
        mut settings: ChatSettings,
    ) -> Result<()> {
        let mut parts = body.split_whitespace();
        let command = parts
            .next()
            .and_then(|c| c.split('@').next())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();
        let messages = Messages::new(settings.interface_language);

        tracing::debug!(chat_id, command = %command, "Command received");

        let reply = match command.as_str() {
            "/queue" | "/status" => {
                let user_id = from.map(|u| u.id).unwrap_or(chat_id);
                let submissions = self
                    .db
                    .list_recent_submissions(user_id, STATUS_LIST_LIMIT)
                    .await?;
                let mut entries = Vec::with_capacity(submissions.len());
                for submission in submissions {
                    let articles = self.db.list_articles_for_submission(submission.id).await?;
                    entries.push((submission, articles));
                }
                messages.status_list(&entries)
            }

            "/settings" => messages.settings_summary(&settings),

            "/style" => match args.first().and_then(|a| ContentStyle::parse(a)) {
                Some(style) => {
                    settings.content_style = style;
                    self.save_settings(&settings).await?
                }
                None => messages.style_usage(),
            },

            "/images" => {
                let count = args.first().and_then(|a| a.parse::<u8>().ok()).filter(|c| *c <= 3);
                let source = match args.get(1) {
                    Some(raw) => ImageSource::parse(raw).map(Some),
                    None => Some(None),
                };
                match (count, source) {
                    (Some(count), Some(source)) => {
                        settings.images_count = count;
                        if let Some(source) = source {
                            settings.images_source = source;
                        }
                        self.save_settings(&settings).await?
                    }
                    _ => messages.usage("/images <0-3> [unsplash|ai|none]"),
                }
            }

            "/language" => match args.first().and_then(|a| parse_interface_language(a)) {
                Some(language) => {
                    settings.interface_language = language;
                    self.save_settings(&settings).await?
                }
                None => messages.usage("/language <ru|en|pl>"),
            },

            "/combine" => match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
                Some("on") => {
                    settings.combine_urls = true;
                    self.save_settings(&settings).await?
                }
                Some("off") => {
                    settings.combine_urls = false;
                    self.save_settings(&settings).await?
                }
                _ => messages.usage("/combine on|off"),
            },

            "/cancel" => {
                if self.db.remove_pending_selection(chat_id).await? {
                    messages.cancelled()
                } else {
                    messages.nothing_to_cancel()
                }
            }

            _ => messages.help(),
        };

        self.notify(chat_id, &reply, None).await;
        Ok(())
    }

    /// Persist settings and describe them in their (possibly new) language
    async fn save_settings(&self, settings: &ChatSettings) -> Result<String> {
        self.db.save_chat_settings(settings).await?;
        tracing::info!(
            chat_id = settings.chat_id,
            style = settings.content_style.as_str(),
            images = settings.images_count,
            language = settings.interface_language.code(),
            combine = settings.combine_urls,
            "Chat settings updated"
        );
        Ok(Messages::new(settings.interface_language).settings_summary(settings))
    }
}

/// Exact interface language codes accepted by /language
fn parse_interface_language(raw: &str) -> Option<InterfaceLanguage> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "ru" => Some(InterfaceLanguage::Ru),
        "en" => Some(InterfaceLanguage::En),
        "pl" => Some(InterfaceLanguage::Pl),
        _ => None,
    }
}

fn guessed_category(text: &str, fallback: &str) -> String {
    content::guess_category(text)
        .or_else(|| content::normalize_category(fallback))
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string()
}

/// Draft for a single-URL message; the body is the URL itself
pub(crate) fn url_draft(url: &str, original: &str, default_category: &str) -> PendingDraft {
    let title = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string());

    PendingDraft {
        title,
        content: url.to_string(),
        excerpt: String::new(),
        category: guessed_category(original, default_category),
        word_count: 0,
        is_url: true,
        original_text: original.to_string(),
    }
}

/// Draft for a text message: first line as title, excerpt, word count
pub(crate) fn text_draft(text: &str, default_category: &str) -> PendingDraft {
    let first_line = text.lines().next().unwrap_or_default().trim();
    let excerpt = content::make_excerpt(text);

    PendingDraft {
        title: truncate_chars(first_line, DRAFT_TITLE_MAX_CHARS),
        content: text.to_string(),
        excerpt: truncate_chars(&excerpt, EXCERPT_MAX_CHARS),
        category: guessed_category(text, default_category),
        word_count: count_words(text),
        is_url: false,
        original_text: text.to_string(),
    }
}
