//! Text extraction
//!
//! Turns downloaded content into indexable text. HTML is tag-stripped, JSON
//! is flattened to its string values, plain text passes through. Anything
//! else is accepted only if it looks textual.

use scraper::{Html, Node};

use super::index::IndexError;

/// How many leading bytes are sniffed when deciding whether unknown content
/// is textual.
const SNIFF_WINDOW: usize = 512;

/// Content classification derived from the declared MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Plain,
    Html,
    Json,
    Unknown,
}

impl ContentKind {
    fn detect(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return ContentKind::Unknown;
        };

        // Strip parameters like "; charset=utf-8"
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => ContentKind::Html,
            "application/json" => ContentKind::Json,
            _ if mime.ends_with("+json") => ContentKind::Json,
            _ if mime.starts_with("text/") => ContentKind::Plain,
            _ => ContentKind::Unknown,
        }
    }
}

/// Extract indexable text from downloaded content.
pub fn extract_text(data: &[u8], content_type: Option<&str>) -> Result<String, IndexError> {
    match ContentKind::detect(content_type) {
        ContentKind::Plain => Ok(normalize(&String::from_utf8_lossy(data))),
        ContentKind::Html => extract_html(&String::from_utf8_lossy(data)),
        ContentKind::Json => extract_json(data),
        ContentKind::Unknown => {
            if looks_textual(data) {
                Ok(normalize(&String::from_utf8_lossy(data)))
            } else {
                Err(IndexError::Extraction(format!(
                    "unsupported binary content (declared type: {})",
                    content_type.unwrap_or("none")
                )))
            }
        }
    }
}

/// Strip markup, skipping non-content elements.
fn extract_html(input: &str) -> Result<String, IndexError> {
    let html = Html::parse_document(input);
    let mut out = String::new();

    for node in html.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let skipped = node.ancestors().any(|ancestor| {
            matches!(
                ancestor.value(),
                Node::Element(element)
                    if matches!(element.name(), "script" | "style" | "noscript")
            )
        });
        if !skipped {
            out.push_str(text);
            out.push(' ');
        }
    }

    Ok(normalize(&out))
}

/// Flatten a JSON document to its string values, in document order.
fn extract_json(data: &[u8]) -> Result<String, IndexError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| IndexError::Extraction(format!("invalid JSON content: {}", e)))?;

    let mut strings = Vec::new();
    collect_json_strings(&value, &mut strings);

    Ok(normalize(&strings.join(" ")))
}

fn collect_json_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_json_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Heuristic for undeclared content: text never carries NUL bytes.
fn looks_textual(data: &[u8]) -> bool {
    !data.is_empty() && !data[..data.len().min(SNIFF_WINDOW)].contains(&0)
}

fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
