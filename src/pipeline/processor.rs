//! Submission processor: the ordered stages of one job.
//!
//! resolve → dedupe → transform → translate → images → identify → persist → notify
//!
//! Each stage produces a typed value consumed by the next one and appends a
//! [`StageRecord`] to the result. Errors bubble up unchanged; the worker decides
//! between retry and terminal failure.

use crate::content;
use crate::db::{Job, NewArticle, NewSubmission};
use crate::error::{DatabaseError, Error, Result};
use crate::retry::with_timeout;
use crate::services::{GeneratedArticle, ImageRequest, RewriteRequest};
use crate::slug;
use crate::types::{
    ContentStyle, Event, JobId, Language, LanguageOutcome, Stage, StageRecord, SubmissionId,
    SubmissionPayload, SubmissionResult,
};
use crate::utils::{source_hash, truncate_chars};
use std::future::Future;
use std::time::Instant;

use super::Pipeline;
use super::images::insert_images;
use super::intake::source_of;
use super::messages::Messages;

/// Maximum title length derived from the first line of a text submission
const TEXT_TITLE_MAX_CHARS: usize = 80;

/// Source material after extraction
#[derive(Clone, Debug)]
struct ResolvedSource {
    title: String,
    content: String,
    excerpt: Option<String>,
    image: Option<String>,
    category: Option<String>,
    source_url: Option<String>,
}

/// Primary-language article after style and normalization
#[derive(Clone, Debug)]
struct TransformedArticle {
    title: String,
    content: String,
    excerpt: String,
    category: String,
    word_count: u32,
}

/// One language variant of the article
#[derive(Clone, Debug)]
struct ArticleVariant {
    language: Language,
    title: String,
    content: String,
    excerpt: String,
    word_count: u32,
}

/// All language variants, primary first
#[derive(Clone, Debug)]
struct LocalizedArticles {
    variants: Vec<ArticleVariant>,
    category: String,
    image_url: Option<String>,
}

/// Timings of the stages that ran, mirrored as [`Event::StageCompleted`]
struct StageLog<'a> {
    pipeline: &'a Pipeline,
    job_id: JobId,
    records: Vec<StageRecord>,
}

impl<'a> StageLog<'a> {
    fn new(pipeline: &'a Pipeline, job_id: JobId) -> Self {
        Self {
            pipeline,
            job_id,
            records: Vec::with_capacity(8),
        }
    }

    /// Run one stage, recording it only when it succeeds
    async fn run<T, F>(&mut self, stage: Stage, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let value = fut.await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(job_id = %self.job_id, stage = ?stage, duration_ms, "Stage completed");
        self.records.push(StageRecord { stage, duration_ms });
        self.pipeline.emit_event(Event::StageCompleted {
            job_id: self.job_id,
            stage,
        });
        Ok(value)
    }
}

impl Pipeline {
    /// Make sure the payload references a submission record, creating one for
    /// jobs queued without going through intake
    pub(crate) async fn ensure_submission(
        &self,
        payload: &mut SubmissionPayload,
    ) -> Result<SubmissionId> {
        if let Some(id) = payload.submission_id {
            return Ok(id);
        }

        let source = source_of(payload.url.as_deref(), &payload.urls, payload.text.as_deref())?;
        let id = self
            .db
            .create_submission(&NewSubmission {
                chat_id: payload.chat_id,
                user_id: payload.user_id,
                username: payload.username.clone(),
                kind: source.kind.to_string(),
                source_hash: source_hash(&source.text),
                source: source.text,
                category: payload.category.clone(),
            })
            .await?;

        tracing::debug!(submission_id = %id, "Created submission record for queued payload");
        payload.submission_id = Some(id);
        Ok(id)
    }

    /// Run every stage for one claimed job
    ///
    /// `payload.submission_id` must be set (see [`Pipeline::ensure_submission`]).
    /// Re-running the same submission updates its existing articles and keeps
    /// their slugs.
    pub(crate) async fn process_job(
        &self,
        job: &Job,
        payload: SubmissionPayload,
    ) -> Result<SubmissionResult> {
        let started = Instant::now();
        let submission_id = payload
            .submission_id
            .ok_or_else(|| Error::Validation("payload has no submission id".to_string()))?;
        let messages = Messages::new(payload.interface_language);
        let first_attempt = job.attempt_count <= 1;

        self.db.mark_submission_processing(submission_id).await?;

        let progress_message = if first_attempt {
            self.notify(payload.chat_id, &messages.progress(), None).await
        } else {
            None
        };

        let mut log = StageLog::new(self, job.id);

        let resolved = log.run(Stage::Resolve, self.resolve_source(&payload)).await?;

        if first_attempt {
            log.run(Stage::Dedupe, self.check_duplicate(&payload, submission_id))
                .await?;
        } else {
            tracing::debug!(job_id = %job.id, attempt = job.attempt_count, "Duplicate check bypassed on retry");
        }

        let transformed = log
            .run(Stage::Transform, self.transform(&payload, &resolved))
            .await?;

        let localized = log
            .run(Stage::Translate, self.translate(&payload, &transformed, &resolved))
            .await?;

        let localized = log
            .run(Stage::Images, self.add_images(&payload, localized))
            .await?;

        let slugs = log
            .run(Stage::Identify, self.assign_slugs(submission_id, &localized))
            .await?;

        let outcomes = log
            .run(
                Stage::Persist,
                self.persist(
                    &payload,
                    submission_id,
                    &localized,
                    &slugs,
                    &resolved,
                    started,
                ),
            )
            .await?;

        let title = localized
            .variants
            .first()
            .map(|v| v.title.clone())
            .unwrap_or_default();

        log.run(Stage::Notify, async {
            self.notify_update(
                payload.chat_id,
                progress_message,
                &messages.success(&title, &outcomes),
                None,
            )
            .await;
            Ok::<_, Error>(())
        })
        .await?;

        let result = SubmissionResult {
            submission_id,
            title,
            outcomes,
            duration_ms: started.elapsed().as_millis() as u64,
            success: true,
            duplicate: false,
            stages: log.records,
        };

        tracing::info!(
            job_id = %job.id,
            submission_id = %submission_id,
            languages = result.outcomes.len(),
            duration_ms = result.duration_ms,
            "Submission processed"
        );

        Ok(result)
    }

    async fn resolve_source(&self, payload: &SubmissionPayload) -> Result<ResolvedSource> {
        if payload.urls.len() > 1 {
            return self.resolve_combined(&payload.urls).await;
        }

        if let Some(url) = payload.url.as_deref().or(payload.urls.first().map(String::as_str)) {
            let article = with_timeout(
                self.config.services.extraction_timeout,
                "content extraction",
                self.services.extractor.extract(url),
            )
            .await?;

            return Ok(ResolvedSource {
                title: article.title,
                content: article.content,
                excerpt: article.excerpt,
                image: article.image,
                category: article.category,
                source_url: Some(url.to_string()),
            });
        }

        if let Some(text) = payload.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let min = self.config.telegram.min_text_length;
            if text.chars().count() < min {
                return Err(Error::Validation(format!(
                    "text must be at least {} characters",
                    min
                )));
            }
            return Ok(resolve_text(text));
        }

        Err(Error::Validation(
            "payload has neither a URL nor text".to_string(),
        ))
    }

    /// Extract several URLs and merge them; fails only when every URL fails
    async fn resolve_combined(&self, urls: &[String]) -> Result<ResolvedSource> {
        let mut merged: Option<ResolvedSource> = None;
        let mut last_error = None;

        for url in urls {
            let extracted = with_timeout(
                self.config.services.extraction_timeout,
                "content extraction",
                self.services.extractor.extract(url),
            )
            .await;

            match extracted {
                Ok(article) => match merged.as_mut() {
                    Some(source) => {
                        source.content.push_str("\n\n");
                        source.content.push_str(&article.content);
                        if source.image.is_none() {
                            source.image = article.image;
                        }
                        if source.category.is_none() {
                            source.category = article.category;
                        }
                    }
                    None => {
                        merged = Some(ResolvedSource {
                            title: article.title,
                            content: article.content,
                            excerpt: article.excerpt,
                            image: article.image,
                            category: article.category,
                            source_url: Some(url.clone()),
                        });
                    }
                },
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping source that failed to extract");
                    last_error = Some(e);
                }
            }
        }

        match (merged, last_error) {
            (Some(source), _) => Ok(source),
            (None, Some(e)) => Err(e),
            (None, None) => Err(Error::Validation("no URLs to combine".to_string())),
        }
    }

    async fn check_duplicate(
        &self,
        payload: &SubmissionPayload,
        submission_id: SubmissionId,
    ) -> Result<()> {
        let source = source_of(payload.url.as_deref(), &payload.urls, payload.text.as_deref())?;
        let hash = source_hash(&source.text);

        match self
            .db
            .find_published_by_source_hash(&hash, submission_id)
            .await?
        {
            Some(existing) => Err(Error::Duplicate {
                submission_id: existing.id,
            }),
            None => Ok(()),
        }
    }

    async fn transform(
        &self,
        payload: &SubmissionPayload,
        resolved: &ResolvedSource,
    ) -> Result<TransformedArticle> {
        let primary = primary_language(payload)?;

        let generated = if payload.style == ContentStyle::KeepAsIs {
            GeneratedArticle {
                title: resolved.title.clone(),
                content: resolved.content.clone(),
                excerpt: resolved.excerpt.clone(),
                category: None,
            }
        } else {
            with_timeout(
                self.config.services.generation_timeout,
                "rewrite",
                self.services.generator.rewrite(RewriteRequest {
                    title: resolved.title.clone(),
                    content: resolved.content.clone(),
                    style: payload.style,
                    language: primary,
                    category: payload.category.clone().or(resolved.category.clone()),
                }),
            )
            .await?
        };

        let normalized = content::normalize(
            &generated.title,
            &generated.content,
            generated.excerpt.as_deref(),
        );
        if normalized.title.is_empty() {
            return Err(Error::Validation("article has no title".to_string()));
        }
        if normalized.content.is_empty() {
            return Err(Error::Validation("article has no content".to_string()));
        }

        let category = [
            payload.category.as_deref(),
            generated.category.as_deref(),
            resolved.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find_map(content::normalize_category)
        .or_else(|| content::guess_category(&format!("{} {}", normalized.title, normalized.content)))
        .map(str::to_string)
        .unwrap_or_else(|| self.config.site.default_category.clone());

        Ok(TransformedArticle {
            title: normalized.title,
            content: normalized.content,
            excerpt: normalized.excerpt,
            category,
            word_count: normalized.word_count,
        })
    }

    async fn translate(
        &self,
        payload: &SubmissionPayload,
        article: &TransformedArticle,
        resolved: &ResolvedSource,
    ) -> Result<LocalizedArticles> {
        let primary = primary_language(payload)?;
        let mut variants = vec![ArticleVariant {
            language: primary,
            title: article.title.clone(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone(),
            word_count: article.word_count,
        }];

        for &language in payload.target_languages.iter().skip(1) {
            if language == primary {
                continue;
            }

            let translated = with_timeout(
                self.config.services.generation_timeout,
                "translation",
                self.services.generator.translate(
                    GeneratedArticle {
                        title: article.title.clone(),
                        content: article.content.clone(),
                        excerpt: Some(article.excerpt.clone()),
                        category: Some(article.category.clone()),
                    },
                    language,
                ),
            )
            .await?;

            let normalized = content::normalize(
                &translated.title,
                &translated.content,
                translated.excerpt.as_deref(),
            );
            if normalized.title.is_empty() || normalized.content.is_empty() {
                return Err(Error::external(
                    self.services.generator.name(),
                    format!("empty translation to {}", language.code()),
                ));
            }

            variants.push(ArticleVariant {
                language,
                title: normalized.title,
                content: normalized.content,
                excerpt: normalized.excerpt,
                word_count: normalized.word_count,
            });
        }

        Ok(LocalizedArticles {
            variants,
            category: article.category.clone(),
            image_url: resolved.image.clone(),
        })
    }

    async fn add_images(
        &self,
        payload: &SubmissionPayload,
        mut localized: LocalizedArticles,
    ) -> Result<LocalizedArticles> {
        if !payload.images.enabled() || !self.services.images.is_enabled() {
            return Ok(localized);
        }

        let Some(primary) = localized.variants.first() else {
            return Ok(localized);
        };
        let title = primary.title.clone();
        let excerpt = primary.excerpt.clone();

        let mut urls = Vec::with_capacity(payload.images.count as usize);
        for index in 0..payload.images.count.min(3) {
            let fetched = with_timeout(
                self.config.services.image_timeout,
                "image fetch",
                self.services.images.fetch_image(ImageRequest {
                    title: title.clone(),
                    excerpt: excerpt.clone(),
                    category: localized.category.clone(),
                    source: payload.images.source,
                    index,
                }),
            )
            .await;

            match fetched {
                Ok(url) => urls.push(url),
                Err(e) => {
                    tracing::warn!(index, provider = self.services.images.name(), error = %e, "Image fetch failed, skipping");
                }
            }
        }

        if urls.is_empty() {
            return Ok(localized);
        }

        for variant in &mut localized.variants {
            variant.content = insert_images(&variant.content, &urls, &variant.title);
        }
        localized.image_url = urls.first().cloned();

        Ok(localized)
    }

    /// One slug per variant, in variant order
    async fn assign_slugs(
        &self,
        submission_id: SubmissionId,
        localized: &LocalizedArticles,
    ) -> Result<Vec<String>> {
        let max_len = self.config.site.slug_max_length;
        let primary_title = localized
            .variants
            .first()
            .map(|v| v.title.as_str())
            .unwrap_or_default();

        let mut slugs = Vec::with_capacity(localized.variants.len());
        for variant in &localized.variants {
            if let Some(existing) = self.db.find_article(submission_id, variant.language).await? {
                slugs.push(existing.slug);
                continue;
            }

            let base = slug::base_slug(primary_title, variant.language, max_len);
            let mut chosen = None;
            for candidate in slug::candidates(&base, variant.language, submission_id, max_len) {
                if !self.db.slug_taken_by_other(&candidate, submission_id).await? {
                    chosen = Some(candidate);
                    break;
                }
            }

            match chosen {
                Some(slug) => slugs.push(slug),
                None => {
                    return Err(Error::Database(DatabaseError::ConstraintViolation(format!(
                        "no free slug for '{}' ({})",
                        base,
                        variant.language.code()
                    ))));
                }
            }
        }

        Ok(slugs)
    }

    async fn persist(
        &self,
        payload: &SubmissionPayload,
        submission_id: SubmissionId,
        localized: &LocalizedArticles,
        slugs: &[String],
        resolved: &ResolvedSource,
        started: Instant,
    ) -> Result<Vec<LanguageOutcome>> {
        let mut outcomes = Vec::with_capacity(localized.variants.len());
        let primary_title = localized
            .variants
            .first()
            .map(|v| v.title.as_str())
            .unwrap_or_default();

        for (variant, slug) in localized.variants.iter().zip(slugs) {
            let mut article = NewArticle {
                submission_id,
                language: variant.language,
                slug: slug.clone(),
                title: variant.title.clone(),
                content: variant.content.clone(),
                excerpt: variant.excerpt.clone(),
                category: localized.category.clone(),
                word_count: variant.word_count,
                image_url: localized.image_url.clone(),
                source_url: resolved.source_url.clone(),
                url: self.config.site.article_url(variant.language, slug),
                published: payload.auto_publish,
            };

            // Another run may have stored the same slug since it was chosen
            let max_len = self.config.site.slug_max_length;
            let base = slug::base_slug(primary_title, variant.language, max_len);
            let mut fallbacks = slug::candidates(&base, variant.language, submission_id, max_len)
                .filter(|candidate| candidate != slug);

            loop {
                match self.db.upsert_article(&article).await {
                    Ok(_) => break,
                    Err(Error::Database(DatabaseError::ConstraintViolation(reason))) => {
                        let Some(next) = fallbacks.next() else {
                            return Err(Error::Database(DatabaseError::ConstraintViolation(
                                reason,
                            )));
                        };
                        tracing::debug!(
                            taken = %article.slug,
                            next = %next,
                            "Slug taken concurrently, trying next candidate"
                        );
                        article.url = self.config.site.article_url(variant.language, &next);
                        article.slug = next;
                    }
                    Err(e) => return Err(e),
                }
            }

            outcomes.push(LanguageOutcome {
                language: variant.language,
                slug: article.slug,
                url: article.url,
            });
        }

        self.db
            .mark_submission_published(
                submission_id,
                primary_title,
                &localized.category,
                started.elapsed().as_millis() as u64,
            )
            .await?;

        Ok(outcomes)
    }
}

fn primary_language(payload: &SubmissionPayload) -> Result<Language> {
    payload
        .target_languages
        .first()
        .copied()
        .ok_or_else(|| Error::Validation("payload has no target languages".to_string()))
}

/// Title from the first line, body from the rest (or the whole text when it is
/// a single line)
fn resolve_text(text: &str) -> ResolvedSource {
    let mut lines = text.splitn(2, '\n');
    let first = lines.next().unwrap_or_default().trim();
    let rest = lines.next().map(str::trim).unwrap_or_default();

    let content = if rest.is_empty() { text } else { rest };

    ResolvedSource {
        title: truncate_chars(first, TEXT_TITLE_MAX_CHARS),
        content: content.to_string(),
        excerpt: None,
        image: None,
        category: None,
        source_url: None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_helpers::{create_test_pipeline, url_payload};

    fn variant(language: Language, title: &str) -> ArticleVariant {
        ArticleVariant {
            language,
            title: title.to_string(),
            content: "Body of the article.".to_string(),
            excerpt: "Body of the article.".to_string(),
            word_count: 4,
        }
    }

    fn new_submission(source: &str) -> NewSubmission {
        NewSubmission {
            chat_id: 1,
            user_id: 10,
            username: None,
            kind: "url".to_string(),
            source: source.to_string(),
            source_hash: source_hash(source),
            category: None,
        }
    }

    #[tokio::test]
    async fn test_persist_moves_past_a_slug_stored_meanwhile() {
        let harness = create_test_pipeline().await;
        let pipeline = &harness.pipeline;
        let payload = url_payload("https://example.com/a");
        let resolved = resolve_text("Example\nBody of the article.");

        let first = pipeline
            .db
            .create_submission(&new_submission("https://example.com/a"))
            .await
            .unwrap();
        let second = pipeline
            .db
            .create_submission(&new_submission("https://example.com/b"))
            .await
            .unwrap();

        let localized = LocalizedArticles {
            variants: vec![variant(Language::En, "Example"), variant(Language::Pl, "Przykład")],
            category: "tech".to_string(),
            image_url: None,
        };

        // Both runs pick their slugs before either stores anything
        let first_slugs = pipeline.assign_slugs(first, &localized).await.unwrap();
        let second_slugs = pipeline.assign_slugs(second, &localized).await.unwrap();
        assert_eq!(first_slugs, vec!["example-en", "example-pl"]);
        assert_eq!(first_slugs, second_slugs);

        pipeline
            .persist(&payload, first, &localized, &first_slugs, &resolved, Instant::now())
            .await
            .unwrap();
        let outcomes = pipeline
            .persist(&payload, second, &localized, &second_slugs, &resolved, Instant::now())
            .await
            .unwrap();

        assert_eq!(outcomes[0].slug, "example-2-en");
        assert_eq!(outcomes[1].slug, "example-2-pl");
        assert_eq!(
            outcomes[0].url,
            pipeline.config.site.article_url(Language::En, "example-2-en")
        );

        let stored = pipeline
            .db
            .find_article(second, Language::En)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "example-2-en");
        assert_eq!(stored.url, outcomes[0].url);
    }

    #[test]
    fn test_resolve_text_splits_title_and_body() {
        let source = resolve_text("Headline here\nFirst paragraph.\n\nSecond paragraph.");
        assert_eq!(source.title, "Headline here");
        assert_eq!(source.content, "First paragraph.\n\nSecond paragraph.");
        assert!(source.source_url.is_none());
    }

    #[test]
    fn test_resolve_text_single_line_keeps_whole_text() {
        let text = "word ".repeat(40);
        let source = resolve_text(text.trim());
        assert_eq!(source.content, text.trim());
        assert!(source.title.chars().count() <= TEXT_TITLE_MAX_CHARS);
        assert!(source.title.ends_with('…'));
    }
}
