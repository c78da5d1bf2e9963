//! Image placement inside article bodies

use crate::content::paragraphs;

/// Articles shorter than this get their images appended
const MIN_PARAGRAPHS_FOR_SPREAD: usize = 3;

/// Relative positions for one, two, or three images
fn fractions(count: usize) -> &'static [f64] {
    match count {
        0 => &[],
        1 => &[0.4],
        2 => &[0.33, 0.66],
        _ => &[0.25, 0.5, 0.75],
    }
}

/// Paragraph indices before which each image is inserted
///
/// Indices are floored and never precede the lead paragraph. Returns `None` when
/// the article is too short to spread images out.
pub(crate) fn insertion_points(paragraph_count: usize, image_count: usize) -> Option<Vec<usize>> {
    if paragraph_count < MIN_PARAGRAPHS_FOR_SPREAD {
        return None;
    }

    Some(
        fractions(image_count)
            .iter()
            .map(|f| ((paragraph_count as f64 * f).floor() as usize).max(1))
            .collect(),
    )
}

/// Markdown for the n-th image (1-based)
fn image_markdown(title: &str, n: usize, url: &str) -> String {
    format!("![{} - Image {}]({})", title, n, url)
}

/// Insert up to three images into `content` at proportional paragraph offsets
pub(crate) fn insert_images(content: &str, urls: &[String], title: &str) -> String {
    let urls = &urls[..urls.len().min(3)];
    if urls.is_empty() {
        return content.to_string();
    }

    let mut blocks = paragraphs(content);
    let images: Vec<String> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| image_markdown(title, i + 1, url))
        .collect();

    match insertion_points(blocks.len(), images.len()) {
        Some(points) => {
            // Insert from the back so earlier indices stay valid
            for (point, image) in points.into_iter().zip(images).rev() {
                blocks.insert(point.min(blocks.len()), image);
            }
        }
        None => blocks.extend(images),
    }

    blocks.join("\n\n")
}
