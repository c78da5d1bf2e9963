use super::handler::{text_draft, url_draft};
use super::*;
use crate::pipeline::test_helpers::*;
use crate::types::{ContentStyle, ImageSource, InterfaceLanguage, JobStatus};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

static NEXT_UPDATE: AtomicI64 = AtomicI64::new(1);

fn next_update_id() -> i64 {
    NEXT_UPDATE.fetch_add(1, Ordering::SeqCst)
}

fn message_update(chat_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": next_update_id(),
        "message": {
            "message_id": 100,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": 10, "username": "tester", "first_name": "Test", "language_code": "en"},
            "text": text
        }
    }))
    .unwrap()
}

fn callback_update(chat_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": next_update_id(),
        "callback_query": {
            "id": format!("cb-{}", data),
            "from": {"id": 10, "username": "tester", "first_name": "Test"},
            "message": {"message_id": 200, "chat": {"id": chat_id}},
            "data": data
        }
    }))
    .unwrap()
}

fn long_text() -> String {
    format!("Chip makers report record demand\n{}", ARTICLE_BODY)
}

#[tokio::test]
async fn test_short_text_gets_too_short_reply() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "just a few words"))
        .await
        .unwrap();

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("too short"));
    assert!(
        pipeline
            .db
            .get_pending_selection(1, Duration::from_secs(300))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_url_message_creates_draft_with_category_keyboard() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "look https://www.example.com/a"))
        .await
        .unwrap();

    let draft = pipeline
        .db
        .get_pending_selection(1, Duration::from_secs(300))
        .await
        .unwrap()
        .unwrap();
    assert!(draft.is_url);
    assert_eq!(draft.title, "example.com");
    assert_eq!(draft.content, "https://www.example.com/a");
    assert_eq!(draft.category, "tech");

    let sent = harness.notifier.sent();
    let keyboard = sent[0].keyboard.as_ref().unwrap();
    assert!(keyboard.callback_data().contains(&"cat:ai"));
    assert!(keyboard.callback_data().contains(&"cancel"));
}

#[tokio::test]
async fn test_full_draft_flow_queues_submission() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, &long_text()))
        .await
        .unwrap();
    let draft = pipeline
        .db
        .get_pending_selection(1, Duration::from_secs(300))
        .await
        .unwrap()
        .unwrap();
    assert!(!draft.is_url);
    assert_eq!(draft.title, "Chip makers report record demand");
    assert!(draft.word_count > 20);

    // Pick a category
    pipeline
        .handle_update(callback_update(1, "cat:hardware"))
        .await
        .unwrap();
    let edited = harness.notifier.edited();
    assert_eq!(edited.len(), 1);
    assert_eq!(edited[0].message_id, Some(200));
    assert_eq!(
        edited[0].keyboard.as_ref().unwrap().callback_data(),
        vec!["publish", "cat:menu", "cancel"]
    );

    // Publish
    pipeline
        .handle_update(callback_update(1, "publish"))
        .await
        .unwrap();
    assert!(
        pipeline
            .db
            .get_pending_selection(1, Duration::from_secs(300))
            .await
            .unwrap()
            .is_none()
    );
    let edited = harness.notifier.edited();
    assert!(edited.last().unwrap().text.contains("Queued (#"));

    let jobs = pipeline.db.list_jobs(Some(JobStatus::Pending), 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let payload = jobs[0].payload().unwrap();
    assert_eq!(payload.category.as_deref(), Some("hardware"));
    assert_eq!(payload.text.as_deref(), Some(long_text().as_str()));
    assert_eq!(payload.user_id, 10);

    // Every callback was answered
    assert_eq!(harness.notifier.callbacks().len(), 2);
}

#[tokio::test]
async fn test_publish_after_expiry_reports_expired_draft() {
    let harness = create_test_pipeline_with(FakeExtractor::default(), FakeImages::default(), |config| {
        config.pending.ttl = Duration::from_millis(1);
    })
    .await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "https://example.com/a"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    pipeline
        .handle_update(callback_update(1, "cat:ai"))
        .await
        .unwrap();
    pipeline
        .handle_update(callback_update(1, "publish"))
        .await
        .unwrap();

    assert_eq!(pipeline.db.queue_stats().await.unwrap().pending, 0);
    let callbacks = harness.notifier.callbacks();
    assert_eq!(callbacks.len(), 2);
    assert!(callbacks.iter().all(|(_, text)| text.as_deref().unwrap().contains("expired")));
}

#[tokio::test]
async fn test_cancel_button_drops_draft() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "https://example.com/a"))
        .await
        .unwrap();
    pipeline
        .handle_update(callback_update(1, "cancel"))
        .await
        .unwrap();

    assert!(
        pipeline
            .db
            .get_pending_selection(1, Duration::from_secs(300))
            .await
            .unwrap()
            .is_none()
    );
    assert!(harness.notifier.edited()[0].text.contains("Cancelled"));
}

#[tokio::test]
async fn test_repeated_update_is_ignored() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    let update = message_update(1, "/help");
    pipeline.handle_update(update.clone()).await.unwrap();
    pipeline.handle_update(update).await.unwrap();

    assert_eq!(harness.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_several_urls_are_queued_separately() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "https://example.com/a https://example.com/b"))
        .await
        .unwrap();

    assert_eq!(pipeline.db.queue_stats().await.unwrap().pending, 2);
    let texts = harness.notifier.texts();
    assert_eq!(texts.iter().filter(|t| t.contains("Queued")).count(), 2);
}

#[tokio::test]
async fn test_combine_mode_queues_one_submission() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "/combine on"))
        .await
        .unwrap();
    pipeline
        .handle_update(message_update(1, "https://example.com/a https://example.com/b"))
        .await
        .unwrap();

    let jobs = pipeline.db.list_jobs(Some(JobStatus::Pending), 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].payload().unwrap().urls.len(), 2);
}

#[tokio::test]
async fn test_extra_urls_are_ignored_with_note() {
    let harness = create_test_pipeline_with(FakeExtractor::default(), FakeImages::default(), |config| {
        config.telegram.max_batch_urls = 2;
    })
    .await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(
            1,
            "https://example.com/a https://example.com/b https://example.com/c",
        ))
        .await
        .unwrap();

    assert_eq!(pipeline.db.queue_stats().await.unwrap().pending, 2);
    assert!(harness.notifier.sent()[0].text.contains("ignored 1"));
}

#[tokio::test]
async fn test_settings_commands_are_saved() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    for command in ["/style casual", "/images 2 ai", "/combine on"] {
        pipeline
            .handle_update(message_update(1, command))
            .await
            .unwrap();
    }

    let settings = pipeline.db.get_chat_settings(1).await.unwrap().unwrap();
    assert_eq!(settings.content_style, ContentStyle::Casual);
    assert_eq!(settings.images_count, 2);
    assert_eq!(settings.images_source, ImageSource::Ai);
    assert!(settings.combine_urls);
}

#[tokio::test]
async fn test_bad_command_arguments_show_usage() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "/images 9"))
        .await
        .unwrap();
    pipeline
        .handle_update(message_update(1, "/style poetic"))
        .await
        .unwrap();

    let sent = harness.notifier.sent();
    assert!(sent.iter().all(|m| m.text.starts_with("Usage")));
    assert!(pipeline.db.get_chat_settings(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_language_command_switches_replies() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "/language pl"))
        .await
        .unwrap();
    pipeline
        .handle_update(message_update(1, "/cancel"))
        .await
        .unwrap();

    let settings = pipeline.db.get_chat_settings(1).await.unwrap().unwrap();
    assert_eq!(settings.interface_language, InterfaceLanguage::Pl);
    let sent = harness.notifier.sent();
    assert!(sent[0].text.contains("Ustawienia"));
    assert!(sent[1].text.contains("Brak szkicu"));
}

#[tokio::test]
async fn test_client_language_is_used_without_settings() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    let update: Update = serde_json::from_value(json!({
        "update_id": next_update_id(),
        "message": {
            "message_id": 1,
            "chat": {"id": 5},
            "from": {"id": 50, "first_name": "Ivan", "language_code": "ru"},
            "text": "/start"
        }
    }))
    .unwrap();
    pipeline.handle_update(update).await.unwrap();

    assert!(harness.notifier.sent()[0].text.contains("Отправьте ссылку"));
}

#[tokio::test]
async fn test_queue_command_lists_recent_submissions() {
    let harness = create_test_pipeline().await;
    let pipeline = &harness.pipeline;

    pipeline
        .handle_update(message_update(1, "https://example.com/a https://example.com/b"))
        .await
        .unwrap();
    pipeline.run_worker(None).await.unwrap();
    pipeline
        .handle_update(message_update(1, "/queue@news_bot"))
        .await
        .unwrap();

    let last = harness.notifier.sent().pop().unwrap();
    assert!(last.text.contains("Recent submissions"));
    assert!(last.text.contains("https://news.test/en/article/example-en"));
}

#[tokio::test]
async fn test_unknown_command_shows_help() {
    let harness = create_test_pipeline().await;
    harness
        .pipeline
        .handle_update(message_update(1, "/frobnicate"))
        .await
        .unwrap();
    assert!(harness.notifier.sent()[0].text.contains("Send a link"));
}

#[test]
fn test_text_draft_fields() {
    let draft = text_draft(&long_text(), "tech");
    assert_eq!(draft.title, "Chip makers report record demand");
    assert!(draft.excerpt.chars().count() <= 160);
    assert_eq!(draft.category, "hardware");
    assert_eq!(draft.original_text, long_text());
}

#[test]
fn test_url_draft_falls_back_to_default_category() {
    let draft = url_draft("https://example.com/a", "https://example.com/a", "security");
    assert_eq!(draft.category, "security");
    assert_eq!(draft.word_count, 0);
}
