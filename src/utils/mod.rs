use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").unwrap());
static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|li|ul|ol|blockquote|section)\s*>|<br\s*/?>").unwrap()
});
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).unwrap());

/// Removes every markup tag and decodes entities, leaving readable text with
/// one line per block element.
pub fn strip_tags(html: &str) -> String {
    let broken = BLOCK_END_RE.replace_all(html, "\n");
    let stripped = TAG_RE.replace_all(&broken, "");
    let text = html_escape::decode_html_entities(&stripped);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `src="..."` attribute value in an HTML fragment.
pub fn extract_img_src(html: &str) -> Option<&str> {
    IMG_SRC_RE
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Shortened copy of a response body for log lines.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
