//! Turns whatever the generation webhook returned into [`NormalizedContent`].
//!
//! The producer has shipped several response shapes over time (a single HTML
//! blob, Korean-keyed sections, an explicit `sections` array, array-wrapped
//! objects). Each extraction step below is tried in order and the first one
//! that yields something wins. Nothing in here fails: unknown shapes degrade
//! to empty sections and default title/hashtags.

use crate::models::{NormalizedContent, Section};
use crate::utils::extract_img_src;
use serde_json::{Map, Value};

pub const DEFAULT_HASHTAGS: &str = "#탄성코트 #KCOAT #베란다칠 #결로방지";
pub const PRODUCT_CATEGORY: &str = "탄성코트";

const HASHTAG_LABEL: &str = "해시태그";

/// Recognized section labels in output order. Each kind accepts its Korean
/// label and the flat English key used by older producers.
const SECTION_LABELS: &[(&str, &[&str])] = &[
    ("header", &["헤더", "header"]),
    ("intro", &["인트로", "intro"]),
    ("product", &["제품", "product"]),
    ("opening", &["오프닝", "opening"]),
    ("usp", &["USP", "usp"]),
    ("faq", &["FAQ", "faq"]),
    ("tech", &["TECH", "tech"]),
    ("philosophy", &["철학", "philosophy"]),
    ("process", &["과정", "process"]),
    ("recap", &["정리", "recap"]),
    ("closing", &["마무리", "closing"]),
];

/// Title used when the response carries none.
pub fn fallback_title(building_name: &str) -> String {
    format!("({building_name}) {PRODUCT_CATEGORY} 시공 후기")
}

pub fn normalize(raw: &Value, fallback_title: &str) -> NormalizedContent {
    let empty = Map::new();
    let object = match unwrap_response(raw) {
        Value::Object(map) => map,
        other => {
            tracing::debug!("response is not an object ({}), using defaults", type_name(other));
            &empty
        }
    };

    let title = non_blank_str(object, "title")
        .map(str::to_string)
        .unwrap_or_else(|| fallback_title.to_string());

    NormalizedContent {
        title,
        sections: extract_sections(object),
        images: extract_images(object),
        hashtags: extract_hashtags(object),
    }
}

fn unwrap_response(raw: &Value) -> &Value {
    match raw {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    }
}

fn extract_sections(object: &Map<String, Value>) -> Vec<Section> {
    let steps: [(&str, fn(&Map<String, Value>) -> Vec<Section>); 4] = [
        ("html blob", sections_from_html_blob),
        ("keyed labels", sections_from_labels),
        ("sections array", sections_from_array),
        ("raw html", sections_from_raw_html),
    ];

    for (name, step) in steps {
        let sections = step(object);
        if !sections.is_empty() {
            tracing::debug!("extracted {} sections via {}", sections.len(), name);
            return sections;
        }
    }

    tracing::debug!("no recognizable sections in response");
    Vec::new()
}

fn sections_from_html_blob(object: &Map<String, Value>) -> Vec<Section> {
    non_blank_str(object, "html")
        .map(|html| vec![Section::new("full_html", html)])
        .unwrap_or_default()
}

fn sections_from_labels(object: &Map<String, Value>) -> Vec<Section> {
    SECTION_LABELS
        .iter()
        .filter_map(|(kind, labels)| {
            labels
                .iter()
                .find_map(|label| non_blank_str(object, label))
                .map(|content| Section::new(*kind, content))
        })
        .collect()
}

fn sections_from_array(object: &Map<String, Value>) -> Vec<Section> {
    let Some(Value::Array(entries)) = object.get("sections") else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(content) => Some(Section::new("text", content.as_str())),
            Value::Object(fields) => {
                let kind = ["kind", "type"]
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(Value::as_str))
                    .unwrap_or("text");
                let content = ["content", "html"]
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(Value::as_str))?;
                Some(Section::new(kind, content))
            }
            _ => None,
        })
        .collect()
}

// Safety net for variants whose `html` is present but whitespace-only, which
// the blob step above skips.
fn sections_from_raw_html(object: &Map<String, Value>) -> Vec<Section> {
    match object.get("html").and_then(Value::as_str) {
        Some(html) if !html.is_empty() => vec![Section::new("text", html)],
        _ => Vec::new(),
    }
}

fn extract_hashtags(object: &Map<String, Value>) -> String {
    for key in [HASHTAG_LABEL, "hashtags"] {
        match object.get(key) {
            Some(Value::String(tags)) if !tags.trim().is_empty() => return tags.clone(),
            Some(Value::Array(tags)) => {
                let joined = tags
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|tag| !tag.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            _ => {}
        }
    }
    DEFAULT_HASHTAGS.to_string()
}

fn extract_images(object: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = object.get("images") else {
        return Vec::new();
    };

    entries
        .iter()
        .map(image_url)
        .filter(|url| !url.is_empty())
        .collect()
}

fn image_url(entry: &Value) -> String {
    match entry {
        Value::String(url) => url.clone(),
        Value::Object(fields) => {
            if let Some(html) = fields.get("html").and_then(Value::as_str) {
                extract_img_src(html).unwrap_or_default().to_string()
            } else if let Some(url) = fields.get("url").and_then(Value::as_str) {
                url.to_string()
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

fn non_blank_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
