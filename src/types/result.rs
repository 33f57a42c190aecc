//! Cached model output.

use serde::{Deserialize, Serialize};

/// Output of one model invocation as stored in the cache.
///
/// Serialized untagged, so a cache file is a flat JSON object whose values are
/// either strings (summaries, corrected text) or arrays of strings
/// (paraphrase variations, completions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedResult {
    Text(String),
    List(Vec<String>),
}

impl CachedResult {
    pub fn text(s: impl Into<String>) -> Self {
        CachedResult::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CachedResult::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachedResult::Text(s) => Some(s),
            CachedResult::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            CachedResult::List(v) => Some(v),
            CachedResult::Text(_) => None,
        }
    }

    /// Flatten into a list; a single text becomes a one-element list.
    pub fn into_list(self) -> Vec<String> {
        match self {
            CachedResult::Text(s) => vec![s],
            CachedResult::List(v) => v,
        }
    }

    /// Whitespace-separated word count across all items.
    pub fn word_count(&self) -> usize {
        match self {
            CachedResult::Text(s) => s.split_whitespace().count(),
            CachedResult::List(v) => v.iter().map(|s| s.split_whitespace().count()).sum(),
        }
    }
}

impl From<String> for CachedResult {
    fn from(s: String) -> Self {
        CachedResult::Text(s)
    }
}

impl From<&str> for CachedResult {
    fn from(s: &str) -> Self {
        CachedResult::Text(s.to_string())
    }
}

impl From<Vec<String>> for CachedResult {
    fn from(v: Vec<String>) -> Self {
        CachedResult::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_untagged() {
        let text = serde_json::to_string(&CachedResult::text("short")).unwrap();
        assert_eq!(text, r#""short""#);
        let list = serde_json::to_string(&CachedResult::list(["a", "b"])).unwrap();
        assert_eq!(list, r#"["a","b"]"#);
    }

    #[test]
    fn deserializes_either_shape() {
        let t: CachedResult = serde_json::from_str(r#""x""#).unwrap();
        assert_eq!(t.as_text(), Some("x"));
        let l: CachedResult = serde_json::from_str(r#"["x","y"]"#).unwrap();
        assert_eq!(l.as_list().map(|v| v.len()), Some(2));
        assert!(serde_json::from_str::<CachedResult>("42").is_err());
    }

    #[test]
    fn word_count_spans_list_items() {
        let l = CachedResult::list(["one two", "three"]);
        assert_eq!(l.word_count(), 3);
        assert_eq!(l.into_list().len(), 2);
    }
}
