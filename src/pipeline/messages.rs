//! Localized chat texts
//!
//! Every text is ready for Telegram's HTML parse mode: user-supplied values are
//! escaped here, so callers pass raw strings.

use crate::db::{Article, Submission};
use crate::error::ErrorCategory;
use crate::types::{
    ChatSettings, ContentStyle, InterfaceLanguage, LanguageOutcome, SubmissionId,
    SubmissionStatus,
};
use crate::utils::{escape_html, truncate_chars};

/// Message table for one interface language
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Messages {
    lang: InterfaceLanguage,
}

impl Messages {
    /// Texts in `lang`
    pub fn new(lang: InterfaceLanguage) -> Self {
        Self { lang }
    }

    fn pick(&self, ru: &'static str, en: &'static str, pl: &'static str) -> &'static str {
        match self.lang {
            InterfaceLanguage::Ru => ru,
            InterfaceLanguage::En => en,
            InterfaceLanguage::Pl => pl,
        }
    }

    /// Reply to /start, /help, and unknown commands
    pub fn help(&self) -> String {
        self.pick(
            "<b>Отправьте ссылку или текст статьи</b> (не короче 100 символов), \
             выберите категорию и нажмите «Опубликовать».\n\n\
             /settings — текущие настройки\n\
             /style &lt;стиль&gt; — стиль текста\n\
             /images &lt;0-3&gt; [unsplash|ai|none] — изображения\n\
             /language &lt;ru|en|pl&gt; — язык бота\n\
             /combine on|off — объединять несколько ссылок\n\
             /queue — последние публикации\n\
             /cancel — отменить черновик",
            "<b>Send a link or the article text</b> (at least 100 characters), \
             pick a category, and press Publish.\n\n\
             /settings - current settings\n\
             /style &lt;style&gt; - writing style\n\
             /images &lt;0-3&gt; [unsplash|ai|none] - images\n\
             /language &lt;ru|en|pl&gt; - bot language\n\
             /combine on|off - merge several links into one article\n\
             /queue - recent submissions\n\
             /cancel - drop the draft",
            "<b>Wyślij link lub tekst artykułu</b> (co najmniej 100 znaków), \
             wybierz kategorię i naciśnij Opublikuj.\n\n\
             /settings - bieżące ustawienia\n\
             /style &lt;styl&gt; - styl tekstu\n\
             /images &lt;0-3&gt; [unsplash|ai|none] - obrazy\n\
             /language &lt;ru|en|pl&gt; - język bota\n\
             /combine on|off - łącz kilka linków w jeden artykuł\n\
             /queue - ostatnie zgłoszenia\n\
             /cancel - usuń szkic",
        )
        .to_string()
    }

    /// Confirmation after a submission entered the queue
    pub fn queued(&self, submission_id: SubmissionId) -> String {
        match self.lang {
            InterfaceLanguage::Ru => format!("📥 Добавлено в очередь (#{})", submission_id),
            InterfaceLanguage::En => format!("📥 Queued (#{})", submission_id),
            InterfaceLanguage::Pl => format!("📥 Dodano do kolejki (#{})", submission_id),
        }
    }

    /// Same source sent again while still in the queue
    pub fn already_queued(&self, submission_id: SubmissionId) -> String {
        match self.lang {
            InterfaceLanguage::Ru => format!("⏳ Уже в очереди (#{})", submission_id),
            InterfaceLanguage::En => format!("⏳ Already in the queue (#{})", submission_id),
            InterfaceLanguage::Pl => format!("⏳ Już w kolejce (#{})", submission_id),
        }
    }

    /// Processing started
    pub fn progress(&self) -> String {
        self.pick(
            "⚙️ Обрабатываю статью…",
            "⚙️ Processing the article…",
            "⚙️ Przetwarzam artykuł…",
        )
        .to_string()
    }

    /// Articles published, one link per language
    pub fn success(&self, title: &str, outcomes: &[LanguageOutcome]) -> String {
        let header = self.pick("✅ Опубликовано", "✅ Published", "✅ Opublikowano");
        let mut text = format!("{}: <b>{}</b>\n", header, escape_html(title));
        for outcome in outcomes {
            text.push_str(&format!(
                "\n{}: {}",
                outcome.language.code().to_uppercase(),
                escape_html(&outcome.url)
            ));
        }
        text
    }

    /// The source had been published before
    pub fn duplicate(&self, urls: &[String]) -> String {
        let mut text = self
            .pick(
                "ℹ️ Этот материал уже опубликован.",
                "ℹ️ This source has already been published.",
                "ℹ️ Ten materiał został już opublikowany.",
            )
            .to_string();
        for url in urls {
            text.push('\n');
            text.push_str(&escape_html(url));
        }
        text
    }

    /// An attempt failed and another is scheduled
    pub fn retry_scheduled(&self, attempt: u32, max_attempts: u32) -> String {
        match self.lang {
            InterfaceLanguage::Ru => {
                format!("🔁 Временная ошибка, повторю позже ({}/{})", attempt, max_attempts)
            }
            InterfaceLanguage::En => {
                format!("🔁 Temporary error, retrying later ({}/{})", attempt, max_attempts)
            }
            InterfaceLanguage::Pl => format!(
                "🔁 Błąd tymczasowy, ponowię później ({}/{})",
                attempt, max_attempts
            ),
        }
    }

    /// Final failure notice
    pub fn failed(&self, category: ErrorCategory) -> String {
        let reason = match category {
            ErrorCategory::Validation => self.pick(
                "некорректные данные",
                "the input could not be used",
                "nieprawidłowe dane",
            ),
            ErrorCategory::ExternalService => self.pick(
                "внешний сервис недоступен",
                "an external service is unavailable",
                "usługa zewnętrzna jest niedostępna",
            ),
            ErrorCategory::Storage => self.pick(
                "ошибка хранилища",
                "a storage error occurred",
                "błąd zapisu",
            ),
            ErrorCategory::Duplicate => self.pick(
                "материал уже опубликован",
                "the source was already published",
                "materiał został już opublikowany",
            ),
            ErrorCategory::Configuration => self.pick(
                "сервис не настроен",
                "the service is not configured",
                "usługa nie jest skonfigurowana",
            ),
            ErrorCategory::Internal => self.pick(
                "внутренняя ошибка",
                "an internal error occurred",
                "błąd wewnętrzny",
            ),
        };
        format!(
            "{}: {}",
            self.pick(
                "❌ Не удалось опубликовать",
                "❌ Publishing failed",
                "❌ Publikacja nie powiodła się"
            ),
            reason
        )
    }

    /// Free text below the minimum length
    pub fn too_short(&self, min_chars: usize) -> String {
        match self.lang {
            InterfaceLanguage::Ru => format!("✏️ Текст слишком короткий (минимум {} символов).", min_chars),
            InterfaceLanguage::En => format!("✏️ The text is too short (at least {} characters).", min_chars),
            InterfaceLanguage::Pl => format!("✏️ Tekst jest za krótki (co najmniej {} znaków).", min_chars),
        }
    }

    /// Draft created, asking for a category
    pub fn draft_prompt(&self, title: &str, category: &str) -> String {
        format!(
            "📝 <b>{}</b>\n{}: {}\n\n{}",
            escape_html(&truncate_chars(title, 80)),
            self.pick("Категория", "Category", "Kategoria"),
            self.category_label(category),
            self.pick(
                "Выберите категорию:",
                "Choose a category:",
                "Wybierz kategorię:"
            )
        )
    }

    /// Category chosen, waiting for publish
    pub fn category_confirmed(&self, title: &str, category: &str) -> String {
        format!(
            "📝 <b>{}</b>\n{}: {}\n\n{}",
            escape_html(&truncate_chars(title, 80)),
            self.pick("Категория", "Category", "Kategoria"),
            self.category_label(category),
            self.pick(
                "Опубликовать?",
                "Publish now?",
                "Opublikować?"
            )
        )
    }

    /// Draft gone after the TTL
    pub fn draft_expired(&self) -> String {
        self.pick(
            "⌛ Черновик устарел, отправьте материал ещё раз.",
            "⌛ The draft expired, please send it again.",
            "⌛ Szkic wygasł, wyślij materiał ponownie.",
        )
        .to_string()
    }

    /// Draft dropped by the user
    pub fn cancelled(&self) -> String {
        self.pick("🚫 Отменено.", "🚫 Cancelled.", "🚫 Anulowano.").to_string()
    }

    /// Nothing to cancel
    pub fn nothing_to_cancel(&self) -> String {
        self.pick(
            "Нет активного черновика.",
            "There is no draft to cancel.",
            "Brak szkicu do anulowania.",
        )
        .to_string()
    }

    /// Extra URLs beyond the per-message limit were dropped
    pub fn extra_urls_ignored(&self, ignored: usize, limit: usize) -> String {
        match self.lang {
            InterfaceLanguage::Ru => format!("Принято первых {} ссылок, пропущено: {}.", limit, ignored),
            InterfaceLanguage::En => format!("Took the first {} links, ignored {}.", limit, ignored),
            InterfaceLanguage::Pl => format!("Przyjęto pierwsze {} linków, pominięto {}.", limit, ignored),
        }
    }

    /// The source could not be queued
    pub fn enqueue_failed(&self) -> String {
        self.pick(
            "❌ Не удалось добавить в очередь, попробуйте позже.",
            "❌ Could not queue the submission, please try again later.",
            "❌ Nie udało się dodać do kolejki, spróbuj później.",
        )
        .to_string()
    }

    /// Reply to /settings and after every settings change
    pub fn settings_summary(&self, settings: &ChatSettings) -> String {
        let on_off = |value: bool| {
            if value {
                self.pick("вкл", "on", "wł.")
            } else {
                self.pick("выкл", "off", "wył.")
            }
        };
        format!(
            "⚙️ <b>{}</b>\n{}: {}\n{}: {} ({})\n{}: {}\n{}: {}\n{}: {}",
            self.pick("Настройки", "Settings", "Ustawienia"),
            self.pick("Стиль", "Style", "Styl"),
            settings.content_style.as_str(),
            self.pick("Изображения", "Images", "Obrazy"),
            settings.images_count,
            settings.images_source.as_str(),
            self.pick("Язык", "Language", "Język"),
            settings.interface_language.code(),
            self.pick("Автопубликация", "Auto-publish", "Autopublikacja"),
            on_off(settings.auto_publish),
            self.pick("Объединять ссылки", "Combine links", "Łączenie linków"),
            on_off(settings.combine_urls),
        )
    }

    /// Wrong or missing command argument
    pub fn usage(&self, usage: &str) -> String {
        format!("{}: {}", self.pick("Использование", "Usage", "Użycie"), escape_html(usage))
    }

    /// Usage of /style, listing every style
    pub fn style_usage(&self) -> String {
        let styles: Vec<&str> = ContentStyle::ALL.iter().map(|s| s.as_str()).collect();
        self.usage(&format!("/style <{}>", styles.join("|")))
    }

    /// Reply to /queue and /status
    pub fn status_list(&self, entries: &[(Submission, Vec<Article>)]) -> String {
        if entries.is_empty() {
            return self
                .pick(
                    "Пока нет отправленных материалов.",
                    "No submissions yet.",
                    "Brak zgłoszeń.",
                )
                .to_string();
        }

        let mut text = format!(
            "<b>{}</b>",
            self.pick("Последние материалы", "Recent submissions", "Ostatnie zgłoszenia")
        );
        for (submission, articles) in entries {
            let label = submission
                .title
                .clone()
                .unwrap_or_else(|| truncate_chars(&submission.source, 50));
            text.push_str(&format!(
                "\n\n#{} {} <i>{}</i>",
                submission.id,
                escape_html(&label),
                self.status_label(submission.status())
            ));
            for article in articles {
                text.push_str(&format!("\n{}", escape_html(&article.url)));
            }
        }
        text
    }

    fn status_label(&self, status: SubmissionStatus) -> &'static str {
        match status {
            SubmissionStatus::Queued => self.pick("в очереди", "queued", "w kolejce"),
            SubmissionStatus::Processing => self.pick("обрабатывается", "processing", "przetwarzanie"),
            SubmissionStatus::Published => self.pick("опубликовано", "published", "opublikowano"),
            SubmissionStatus::Failed => self.pick("ошибка", "failed", "błąd"),
        }
    }

    /// Display name of a category
    pub fn category_label(&self, category: &str) -> String {
        let label = match category {
            "ai" => self.pick("ИИ", "AI", "AI"),
            "tech" => self.pick("Технологии", "Tech", "Technologia"),
            "gadgets" => self.pick("Гаджеты", "Gadgets", "Gadżety"),
            "software" => self.pick("Софт", "Software", "Oprogramowanie"),
            "hardware" => self.pick("Железо", "Hardware", "Sprzęt"),
            "internet" => self.pick("Интернет", "Internet", "Internet"),
            "security" => self.pick("Безопасность", "Security", "Bezpieczeństwo"),
            other => return escape_html(other),
        };
        label.to_string()
    }

    /// Label of the publish button
    pub fn publish_button(&self) -> &'static str {
        self.pick("✅ Опубликовать", "✅ Publish", "✅ Opublikuj")
    }

    /// Label of the change-category button
    pub fn change_category_button(&self) -> &'static str {
        self.pick("🔄 Категория", "🔄 Category", "🔄 Kategoria")
    }

    /// Label of the cancel button
    pub fn cancel_button(&self) -> &'static str {
        self.pick("✖️ Отмена", "✖️ Cancel", "✖️ Anuluj")
    }

    /// Callback toast for an unknown button
    pub fn unknown_action(&self) -> &'static str {
        self.pick("Неизвестное действие", "Unknown action", "Nieznana akcja")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language;

    #[test]
    fn test_success_lists_every_language_and_escapes_title() {
        let outcomes = vec![
            LanguageOutcome {
                language: Language::En,
                slug: "a-en".into(),
                url: "https://example.com/en/article/a-en".into(),
            },
            LanguageOutcome {
                language: Language::Pl,
                slug: "a-pl".into(),
                url: "https://example.com/pl/article/a-pl".into(),
            },
        ];
        let text = Messages::new(InterfaceLanguage::En).success("A <b>bold</b> claim", &outcomes);
        assert!(text.contains("A &lt;b&gt;bold&lt;/b&gt; claim"));
        assert!(text.contains("EN: https://example.com/en/article/a-en"));
        assert!(text.contains("PL: https://example.com/pl/article/a-pl"));
    }

    #[test]
    fn test_failed_shows_category_not_detail() {
        let text = Messages::new(InterfaceLanguage::Pl).failed(ErrorCategory::ExternalService);
        assert!(text.contains("usługa zewnętrzna"));
    }

    #[test]
    fn test_every_language_has_its_own_text() {
        let texts: Vec<String> = [
            InterfaceLanguage::Ru,
            InterfaceLanguage::En,
            InterfaceLanguage::Pl,
        ]
        .into_iter()
        .map(|l| Messages::new(l).draft_expired())
        .collect();
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
    }

    #[test]
    fn test_retry_scheduled_shows_attempts() {
        let text = Messages::new(InterfaceLanguage::En).retry_scheduled(1, 3);
        assert!(text.contains("(1/3)"));
    }
}
