const PHOTO_SUFFIX: &str = ", professional interior photography";
const REFERENCE_PREFIX: &str =
    "Apply the visual style, colors, materials, and design elements from the reference images. ";

pub fn build_generation_prompt(prompt: &str, style: &str, modifications: &[String]) -> String {
    let prompt = prompt.trim();
    let style = style.trim();

    let mut full = if style.is_empty() || prompt.to_lowercase().contains(&style.to_lowercase()) {
        prompt.to_string()
    } else {
        format!("{style} style, {prompt}")
    };

    let modifications: Vec<&str> = modifications
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if !modifications.is_empty() {
        full.push_str(", ");
        full.push_str(&modifications.join(", "));
    }

    full.push_str(PHOTO_SUFFIX);
    full
}

pub fn with_reference_prefix(prompt: &str) -> String {
    format!("{REFERENCE_PREFIX}{prompt}")
}

/// Cuts `text` to at most `max_chars` characters on a word boundary.
///
/// Falls back to a hard cut when the first word alone is over the limit.
/// Trailing separators left by the cut are removed.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    // byte offset of the first char past the limit
    let limit = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..limit];

    // keep the word that ends exactly at the limit
    let boundary = if text[limit..].starts_with(char::is_whitespace) {
        limit
    } else {
        head.rfind(char::is_whitespace).unwrap_or(limit)
    };

    let cut = text[..boundary]
        .trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';');
    tracing::debug!(
        "prompt truncated from {} to {} chars",
        text.chars().count(),
        cut.chars().count()
    );
    cut.to_string()
}
