//! URL-safe article identifiers
//!
//! Slugs are lowercase ASCII (`a-z`, `0-9`, `-`), transliterated from Cyrillic,
//! Polish and common Latin diacritics, capped at a maximum length that includes
//! the `-{lang}` suffix. Collision handling lives with the caller, which walks
//! [`candidates`] until it finds a slug not owned by another submission.

use crate::types::{Language, SubmissionId};
use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"<[^>]*>").unwrap()
});

/// Numbered candidates tried before falling back to a hash suffix
pub const NUMBERED_CANDIDATES: u32 = 20;

/// Smallest accepted maximum length; every candidate fits with room for a stem
pub const MIN_MAX_LENGTH: usize = 16;

const FALLBACK_BASE: &str = "article";

/// Turn a title into a bare slug (no length cap, no language suffix)
pub fn slugify(title: &str) -> String {
    let stripped = HTML_TAG.replace_all(title, " ");
    let mut out = String::with_capacity(stripped.len());

    for c in stripped.chars() {
        let lower: String = c.to_lowercase().collect();
        for lc in lower.chars() {
            if lc.is_ascii_alphanumeric() {
                out.push(lc);
            } else if let Some(latin) = transliterate(lc) {
                out.push_str(latin);
            } else {
                out.push('-');
            }
        }
    }

    out.split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug stem for a title, leaving room for the language suffix
pub fn base_slug(title: &str, language: Language, max_len: usize) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        slug
    };
    let room = max_len.saturating_sub(language_suffix(language).len());
    cap(&slug, room)
}

/// Slug candidates in the order they should be tried
///
/// The first candidate is `{base}-{lang}`, followed by `{base}-2-{lang}` up to
/// [`NUMBERED_CANDIDATES`], and finally a suffix derived from the submission id,
/// which is unique because submission ids are.
pub fn candidates(
    base: &str,
    language: Language,
    submission_id: SubmissionId,
    max_len: usize,
) -> impl Iterator<Item = String> {
    let base = base.to_string();
    let suffix = language_suffix(language);
    let room = max_len.saturating_sub(suffix.len());

    let numbered = (1..=NUMBERED_CANDIDATES).map({
        let base = base.clone();
        let suffix = suffix.clone();
        move |n| {
            if n == 1 {
                format!("{}{}", cap(&base, room), suffix)
            } else {
                let tag = format!("-{n}");
                format!("{}{}{}", cap(&base, room - tag.len().min(room)), tag, suffix)
            }
        }
    });

    let hash = short_hash(submission_id);
    let hashed = if room > hash.len() + 1 {
        format!("{}-{}{}", cap(&base, room - hash.len() - 1), hash, suffix)
    } else {
        format!("{}{}", &hash[..room.clamp(1, hash.len())], suffix)
    };
    let hashed = std::iter::once(hashed);

    numbered.chain(hashed)
}

/// Whether a slug is well-formed
pub fn is_valid(slug: &str, max_len: usize) -> bool {
    !slug.is_empty()
        && slug.len() <= max_len
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
}

fn language_suffix(language: Language) -> String {
    format!("-{}", language.code())
}

fn cap(slug: &str, max_len: usize) -> String {
    if slug.len() <= max_len {
        return slug.to_string();
    }
    // slugs are ASCII, byte slicing is safe
    let cut = &slug[..max_len];
    let cut = match cut.rfind('-') {
        Some(pos) if pos >= max_len / 2 => &cut[..pos],
        _ => cut,
    };
    let trimmed = cut.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_BASE.chars().take(max_len.max(1)).collect()
    } else {
        trimmed.to_string()
    }
}

fn short_hash(submission_id: SubmissionId) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(submission_id.get().to_be_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..6].to_string()
}

fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        // Cyrillic
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        // Polish
        'ą' => "a",
        'ć' => "c",
        'ę' => "e",
        'ł' => "l",
        'ń' => "n",
        'ó' => "o",
        'ś' => "s",
        'ź' | 'ż' => "z",
        // Common Latin diacritics
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' => "a",
        'ä' | 'æ' => "ae",
        'ç' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' | 'ň' => "n",
        'ò' | 'ô' | 'õ' | 'ø' => "o",
        'ö' | 'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ů' => "u",
        'ü' => "ue",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        'š' => "s",
        'ž' => "z",
        'ř' => "r",
        'đ' | 'ď' => "d",
        'ť' => "t",
        _ => return None,
    };
    Some(latin)
}
