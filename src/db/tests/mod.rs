use super::*;
use crate::types::{ContentStyle, ImageOptions, ImageSource, InterfaceLanguage, Language};
use tempfile::NamedTempFile;

mod jobs;

/// Open a fresh database on a temporary file
async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

fn sample_payload(url: &str) -> SubmissionPayload {
    SubmissionPayload {
        chat_id: 1,
        user_id: 42,
        username: Some("reader".to_string()),
        url: Some(url.to_string()),
        urls: Vec::new(),
        text: None,
        category: Some("tech".to_string()),
        style: ContentStyle::Journalistic,
        images: ImageOptions {
            count: 0,
            source: ImageSource::None,
        },
        target_languages: vec![Language::En, Language::Pl],
        interface_language: InterfaceLanguage::En,
        auto_publish: true,
        submission_id: None,
    }
}

fn sample_submission(source: &str) -> NewSubmission {
    NewSubmission {
        chat_id: 1,
        user_id: 42,
        username: None,
        kind: "url".to_string(),
        source: source.to_string(),
        source_hash: crate::utils::source_hash(source),
        category: Some("tech".to_string()),
    }
}
