//! Mock responses: source pages, completions, Bot API replies

use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Paragraphs long enough for the HTML extractor to keep
pub const PARAGRAPHS: [&str; 3] = [
    "The company announced a new product line on Monday, aimed at developers who build services.",
    "Analysts expect the launch to change how teams deploy their workloads over the coming year.",
    "The first devices ship next month, with wider availability planned for the end of the year.",
];

/// An article page with `og:title` and `og:image`
pub fn article_html(title: &str) -> String {
    let body: String = PARAGRAPHS.iter().map(|p| format!("<p>{}</p>\n", p)).collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>{title} | Example News</title>
  <meta property="og:title" content="{title}">
  <meta property="og:image" content="/images/lead.jpg">
  <meta property="og:description" content="Short description of the story.">
</head>
<body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>{title}</h1>
    {body}
  </article>
</body>
</html>"#
    )
}

/// Serve an article page at `page_path`
pub async fn mount_article(server: &MockServer, page_path: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(page_path.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(article_html(title)),
        )
        .mount(server)
        .await;
}

/// Make `page_path` fail with 503
pub async fn mount_unavailable(server: &MockServer, page_path: &str) {
    Mock::given(method("GET"))
        .and(path(page_path.to_string()))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
}

/// Answer every completion with a Polish variant prefixed "PL: "
struct TranslationResponder;

impl Respond for TranslationResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let user = body["messages"][1]["content"].as_str().unwrap_or_default();
        let article: serde_json::Value = serde_json::from_str(user).unwrap_or_default();
        let title = article["title"].as_str().unwrap_or("Artykuł");
        let content = article["content"].as_str().unwrap_or("Treść.");

        let reply = json!({
            "title": format!("PL: {}", title),
            "content": content,
            "excerpt": "Krótki opis."
        });
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": reply.to_string()}}]
        }))
    }
}

/// Serve translations on `/chat/completions`
pub async fn mount_translations(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(TranslationResponder)
        .mount(server)
        .await;
}

/// Bot API replies with increasing message ids
struct BotApiResponder {
    next_id: AtomicI64,
}

impl Respond for BotApiResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let result = if request.url.path().ends_with("/sendMessage") {
            json!({"message_id": self.next_id.fetch_add(1, Ordering::SeqCst)})
        } else {
            json!(true)
        };
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
    }
}

/// Accept every Bot API call
pub async fn mount_bot_api(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/bot[^/]+/\w+$"))
        .respond_with(BotApiResponder {
            next_id: AtomicI64::new(1000),
        })
        .mount(server)
        .await;
}
