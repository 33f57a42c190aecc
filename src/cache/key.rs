//! Cache key generation.

use crate::types::{Operation, TextRequest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic digest identifying one (text, parameters) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
    pub fn as_str(&self) -> &str {
        &self.hash
    }
    /// First 8 chars, for log lines.
    pub fn short(&self) -> &str {
        self.hash
            .char_indices()
            .nth(8)
            .map_or(&self.hash[..], |(i, _)| &self.hash[..i])
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Canonical form of input text before hashing: line endings unified to `\n`
/// and surrounding whitespace trimmed. Interior whitespace is kept.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Derives [`CacheKey`]s with SHA-256.
///
/// Each field goes into the hasher length-prefixed, parameters sorted by name
/// then value, so neither separator tricks nor argument order can alias two
/// different requests.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    /// Mix a fixed salt (e.g. a model identifier) into every key. Changing the
    /// salt invalidates all previously stored keys.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Key for a typed request; uses every output-affecting parameter it declares.
    pub fn key_for_request(&self, request: &TextRequest) -> CacheKey {
        self.key_for(request.operation(), request.text(), &request.key_params())
    }

    /// Key for `text` under `operation` with the given named parameters.
    pub fn key_for<N, V>(&self, operation: Operation, text: &str, params: &[(N, V)]) -> CacheKey
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        // Repeated names are all hashed, never collapsed.
        let mut sorted: Vec<(&str, &str)> = params
            .iter()
            .map(|(n, v)| (n.as_ref(), v.as_ref()))
            .collect();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        update_field(&mut hasher, operation.as_str().as_bytes());
        update_field(&mut hasher, normalize_text(text).as_bytes());
        hasher.update((sorted.len() as u64).to_le_bytes());
        for (name, value) in sorted {
            update_field(&mut hasher, name.as_bytes());
            update_field(&mut hasher, value.as_bytes());
        }
        if let Some(ref s) = self.salt {
            update_field(&mut hasher, s.as_bytes());
        }
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash)
    }
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Key with the default (unsalted) generator.
pub fn key_for<N, V>(operation: Operation, text: &str, params: &[(N, V)]) -> CacheKey
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    CacheKeyGenerator::new().key_for(operation, text, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParaphraseRequest, SummarizeRequest};

    const TEXT: &str = "The quick brown fox jumps over the lazy dog.";

    #[test]
    fn key_is_fixed_width_hex() {
        let k = key_for(Operation::Summarize, TEXT, &[("max_length", "130")]);
        assert_eq!(k.as_str().len(), 64);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(k.short().len(), 8);
    }

    #[test]
    fn key_is_deterministic() {
        let a = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("min_length", "30")]);
        let b = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("min_length", "30")]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_stable_across_processes() {
        // Pinned digests: any change to the encoding orphans existing cache files.
        let k = key_for::<&str, &str>(Operation::Grammar, "  \r\n ", &[]);
        assert_eq!(
            k.as_str(),
            "a0e02873c78e779eca49b958757b03f656d64822a5d4a79d24c5062716981203"
        );
        let k = key_for(Operation::Summarize, TEXT, &[("min_length", "30"), ("max_length", "130")]);
        assert_eq!(
            k.as_str(),
            "2be3a6be2fd69baea7c8f0256c06e34abbbc2bae06bb55fd8030a3237c4f7be6"
        );
    }

    #[test]
    fn param_order_does_not_matter() {
        let a = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("min_length", "30")]);
        let b = key_for(Operation::Summarize, TEXT, &[("min_length", "30"), ("max_length", "130")]);
        assert_eq!(a, b);
    }

    #[test]
    fn any_param_change_changes_key() {
        let base = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("min_length", "30")]);
        let max = key_for(Operation::Summarize, TEXT, &[("max_length", "200"), ("min_length", "30")]);
        let min = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("min_length", "31")]);
        let fewer = key_for(Operation::Summarize, TEXT, &[("max_length", "130")]);
        assert_ne!(base, max);
        assert_ne!(base, min);
        assert_ne!(base, fewer);
    }

    #[test]
    fn no_separator_collision() {
        let a = key_for(Operation::Summarize, "text_1", &[("n", "2")]);
        let b = key_for(Operation::Summarize, "text", &[("n", "1_2")]);
        assert_ne!(a, b);
        let c = key_for(Operation::Summarize, "t", &[("ab", "c")]);
        let d = key_for(Operation::Summarize, "t", &[("a", "bc")]);
        assert_ne!(c, d);
    }

    #[test]
    fn line_endings_and_outer_whitespace_normalized() {
        let a = key_for::<&str, &str>(Operation::Grammar, "line one\r\nline two", &[]);
        let b = key_for::<&str, &str>(Operation::Grammar, "  line one\nline two\n", &[]);
        assert_eq!(a, b);
        let c = key_for::<&str, &str>(Operation::Grammar, "line  one\nline two", &[]);
        assert_ne!(a, c);
    }

    #[test]
    fn salt_separates_keyspaces() {
        let plain = CacheKeyGenerator::new().key_for::<&str, &str>(Operation::Grammar, TEXT, &[]);
        let salted = CacheKeyGenerator::new()
            .with_salt("bart-large-cnn")
            .key_for::<&str, &str>(Operation::Grammar, TEXT, &[]);
        assert_ne!(plain, salted);
    }

    #[test]
    fn request_keys_cover_variation_count() {
        let keys = CacheKeyGenerator::new();
        let three = keys.key_for_request(&ParaphraseRequest::new(TEXT).with_num_variations(3).into());
        let five = keys.key_for_request(&ParaphraseRequest::new(TEXT).with_num_variations(5).into());
        assert_ne!(three, five);

        let s1 = keys.key_for_request(&SummarizeRequest::new(TEXT).into());
        let s2 = keys.key_for_request(&SummarizeRequest::new(TEXT).with_max_length(200).into());
        assert_ne!(s1, s2);
    }

    #[test]
    fn short_respects_char_boundaries() {
        assert_eq!(CacheKey::new("aéééé-key").short(), "aéééé-ke");
        assert_eq!(CacheKey::new("ééééééééé").short(), "éééééééé");
        assert_eq!(CacheKey::new("abc").short(), "abc");
    }

    #[test]
    fn repeated_param_names_are_not_collapsed() {
        let twice = key_for(Operation::Summarize, TEXT, &[("max_length", "130"), ("max_length", "200")]);
        let once = key_for(Operation::Summarize, TEXT, &[("max_length", "200")]);
        assert_ne!(twice, once);
        let swapped = key_for(Operation::Summarize, TEXT, &[("max_length", "200"), ("max_length", "130")]);
        assert_eq!(twice, swapped);
    }
}
