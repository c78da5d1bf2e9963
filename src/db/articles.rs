//! Per-language article store.

use crate::error::DatabaseError;
use crate::types::{Language, SubmissionId};
use crate::utils::now_millis;
use crate::{Error, Result};

use super::{Article, Database, NewArticle};

const ARTICLE_COLUMNS: &str = "id, submission_id, language, slug, title, content, excerpt, \
     category, word_count, image_url, source_url, url, published, created_at, updated_at";

impl Database {
    /// Insert or update the article of a submission in one language
    ///
    /// Rows are unique per (submission, language); a second call for the same
    /// pair updates the existing row and keeps its id.
    pub async fn upsert_article(&self, article: &NewArticle) -> Result<i64> {
        let now = now_millis();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO articles (
                submission_id, language, slug, title, content, excerpt, category,
                word_count, image_url, source_url, url, published, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(submission_id, language) DO UPDATE SET
                slug = excluded.slug,
                title = excluded.title,
                content = excluded.content,
                excerpt = excluded.excerpt,
                category = excluded.category,
                word_count = excluded.word_count,
                image_url = excluded.image_url,
                source_url = excluded.source_url,
                url = excluded.url,
                published = excluded.published,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(article.submission_id)
        .bind(article.language.code())
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(&article.category)
        .bind(i64::from(article.word_count))
        .bind(&article.image_url)
        .bind(&article.source_url)
        .bind(&article.url)
        .bind(article.published)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "Slug '{}' is already taken: {}",
                    article.slug, e
                )))
            }
            _ => Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert article: {}",
                e
            ))),
        })?;

        Ok(id)
    }

    /// Get the article of a submission in one language
    pub async fn find_article(
        &self,
        submission_id: SubmissionId,
        language: Language,
    ) -> Result<Option<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE submission_id = ? AND language = ?",
            ARTICLE_COLUMNS
        );

        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(submission_id)
            .bind(language.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get article: {}",
                    e
                )))
            })?;

        Ok(article)
    }

    /// Look up an article by slug across all languages
    pub async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE slug = ?", ARTICLE_COLUMNS);

        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get article by slug: {}",
                    e
                )))
            })?;

        Ok(article)
    }

    /// Whether a slug belongs to an article of a different submission
    pub async fn slug_taken_by_other(&self, slug: &str, submission_id: SubmissionId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE slug = ? AND submission_id != ?",
        )
        .bind(slug)
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check slug: {}",
                e
            )))
        })?;

        Ok(count > 0)
    }

    /// All language variants of a submission
    pub async fn list_articles_for_submission(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE submission_id = ? ORDER BY id ASC",
            ARTICLE_COLUMNS
        );

        let articles = sqlx::query_as::<_, Article>(&sql)
            .bind(submission_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list articles: {}",
                    e
                )))
            })?;

        Ok(articles)
    }
}
