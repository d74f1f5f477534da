//! Link Normalizer
//!
//! Webhook senders are heterogeneous (n8n, Zapier, curl, hand-written code), so
//! links are accepted from several request shapes and folded into one
//! canonical, de-duplicated list:
//!
//! - Query: `?link=a.com`, `?link=a.com,b.com`, `?links[]=a.com&links[]=b.com`
//! - Body:  `{"link": "a.com"}`, `{"links": ["a.com", "b.com"]}`
//!
//! Merge order is fixed: `query.link`, `query.links`, `body.link`, `body.links`.

use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Normalize a single raw link
///
/// Trims whitespace, adds `https://` when no scheme separator is present and
/// accepts only http/https. Returns the canonical href, or None when invalid.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    let parsed = Url::parse(&candidate).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.into()),
        _ => None,
    }
}

/// Raw link payload as it arrives from one query parameter or body field
#[derive(Debug, Clone, PartialEq)]
pub enum LinkInput {
    /// A single string, possibly comma-separated
    Single(String),
    /// An array; non-string elements are ignored
    List(Vec<Value>),
}

impl LinkInput {
    /// Interpret a JSON value; anything other than a string or array yields None
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(LinkInput::Single(s.clone())),
            Value::Array(items) => Some(LinkInput::List(items.clone())),
            _ => None,
        }
    }
}

/// Parse links from one input, dropping invalid entries silently
pub fn parse_many(input: &LinkInput) -> Vec<String> {
    let normalized: Vec<String> = match input {
        LinkInput::Single(s) => s.split(',').filter_map(normalize).collect(),
        LinkInput::List(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(normalize)
            .collect(),
    };
    dedupe(normalized)
}

/// Query parameters folded the way webhook senders expect
///
/// `key[]` accumulates into an array under `key`; a plain key repeated
/// becomes an array; a plain key seen once stays a string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Map<String, Value>);

impl QueryParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Map::new();
        for (key, value) in pairs {
            let key: String = key.into();
            let value = Value::String(value.into());

            if let Some(base) = key.strip_suffix("[]") {
                match map.get_mut(base) {
                    Some(Value::Array(items)) => items.push(value),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, value]);
                    }
                    None => {
                        map.insert(base.to_string(), Value::Array(vec![value]));
                    }
                }
                continue;
            }

            match map.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key, value);
                }
            }
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Extract every link from a request's query and optional JSON body
///
/// A body that is not a JSON object contributes nothing.
pub fn extract_from_request(query: &QueryParams, body: Option<&Value>) -> Vec<String> {
    let body = body.and_then(Value::as_object);

    let sources = [
        query.get("link"),
        query.get("links"),
        body.and_then(|b| b.get("link")),
        body.and_then(|b| b.get("links")),
    ];

    let all: Vec<String> = sources
        .into_iter()
        .flatten()
        .filter_map(LinkInput::from_value)
        .flat_map(|input| parse_many(&input))
        .collect();

    dedupe(all)
}

/// De-duplicate preserving first-seen order
fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(links.len());
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
