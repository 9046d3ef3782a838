//! Section resolution for proposal documents.
//!
//! Proposals carry their sections in one of several shapes. [`SectionSource`]
//! names the shape that was found; [`SectionSource::into_map`] normalizes it
//! to a single `section title -> text` map.
//!
//! Resolution order, first non-empty wins:
//!
//! 1. an explicit `sections` JSON object
//! 2. a `sections` string holding a JSON-encoded object
//! 3. a `content` JSON document with a `sections: [{title, content}]` array
//! 4. nothing

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Normalized section map. Keys are section titles as written.
pub type SectionMap = BTreeMap<String, String>;

/// Where a proposal's sections came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionSource {
    /// `sections` was an object
    Explicit(Map<String, Value>),
    /// `sections` was a string that decoded to an object
    Encoded(Map<String, Value>),
    /// Extracted from the `sections` array of a JSON `content` document
    ContentDocument(Map<String, Value>),
    Empty,
}

impl SectionSource {
    /// Pick the first non-empty shape.
    pub fn resolve(sections: Option<&Value>, content: Option<&str>) -> Self {
        match sections {
            Some(Value::Object(map)) if !map.is_empty() => {
                return SectionSource::Explicit(map.clone());
            }
            Some(Value::String(raw)) if !raw.trim().is_empty() => {
                if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
                    if !map.is_empty() {
                        return SectionSource::Encoded(map);
                    }
                }
            }
            _ => {}
        }

        let extracted = content.map(extract_from_content).unwrap_or_default();
        if extracted.is_empty() {
            SectionSource::Empty
        } else {
            SectionSource::ContentDocument(extracted)
        }
    }

    /// True when sections were supplied separately from the body content.
    pub fn is_explicit(&self) -> bool {
        matches!(self, SectionSource::Explicit(_) | SectionSource::Encoded(_))
    }

    /// Normalize to text. Null values are dropped; non-string values are
    /// kept as their JSON text so they still count as content.
    pub fn into_map(self) -> SectionMap {
        let raw = match self {
            SectionSource::Explicit(map)
            | SectionSource::Encoded(map)
            | SectionSource::ContentDocument(map) => map,
            SectionSource::Empty => return SectionMap::new(),
        };

        raw.into_iter()
            .filter_map(|(title, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((title, text))
            })
            .collect()
    }
}

/// Resolve and normalize in one step.
pub fn resolve_sections(sections: Option<&Value>, content: Option<&str>) -> SectionMap {
    SectionSource::resolve(sections, content).into_map()
}

/// Whether a resolved section has any content.
pub fn has_content(sections: &SectionMap, name: &str) -> bool {
    sections
        .get(name)
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

fn extract_from_content(content: &str) -> Map<String, Value> {
    let mut out = Map::new();
    let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(content) else {
        return out;
    };
    let Some(Value::Array(entries)) = doc.get("sections") else {
        return out;
    };

    for entry in entries {
        let Some(title) = entry.get("title").and_then(Value::as_str) else {
            continue;
        };
        let title = title.trim();
        if title.is_empty() {
            continue;
        }
        let body = entry.get("content").cloned().unwrap_or(Value::Null);
        out.insert(title.to_string(), body);
    }
    out
}
