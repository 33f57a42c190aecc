//! Typed text-processing requests.
//!
//! Every request type lists all of its output-affecting parameters through
//! [`TextRequest::key_params`]. Cache keys are derived from that list only, so
//! a parameter that changes model output can never be left out of the key by a
//! call site.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum trimmed text length accepted by every operation.
pub const MIN_TEXT_CHARS: usize = 10;

/// Minimum word count for completion prompts.
pub const MIN_COMPLETION_WORDS: usize = 3;

/// The text operations served through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Summarize,
    Paraphrase,
    Complete,
    Grammar,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Summarize,
        Operation::Paraphrase,
        Operation::Complete,
        Operation::Grammar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Summarize => "summarize",
            Operation::Paraphrase => "paraphrase",
            Operation::Complete => "complete",
            Operation::Grammar => "grammar",
        }
    }

    /// Paraphrase and completion produce several candidates; the others one text.
    pub fn returns_list(&self) -> bool {
        matches!(self, Operation::Paraphrase | Operation::Complete)
    }

    /// File name used for this operation's cache when none is configured.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Operation::Summarize => "summary_cache.json",
            Operation::Paraphrase => "paraphrase_cache.json",
            Operation::Complete => "completion_cache.json",
            Operation::Grammar => "grammar_cache.json",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summary" => Ok(Operation::Summarize),
            "paraphrase" => Ok(Operation::Paraphrase),
            "complete" | "completion" | "autocomplete" => Ok(Operation::Complete),
            "grammar" | "grammar-check" | "grammar_check" => Ok(Operation::Grammar),
            other => Err(Error::validation_with_context(
                format!("Unknown operation: {other}"),
                ErrorContext::new()
                    .with_field_path("operation")
                    .with_details("expected one of: summarize, paraphrase, complete, grammar"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    pub max_length: u32,
    pub min_length: u32,
}

impl SummarizeRequest {
    pub const DEFAULT_MAX_LENGTH: u32 = 130;
    pub const DEFAULT_MIN_LENGTH: u32 = 30;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_length: Self::DEFAULT_MAX_LENGTH,
            min_length: Self::DEFAULT_MIN_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_min_length(mut self, min_length: u32) -> Self {
        self.min_length = min_length;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParaphraseRequest {
    pub text: String,
    pub num_variations: u32,
    pub num_beams: u32,
}

impl ParaphraseRequest {
    pub const DEFAULT_NUM_VARIATIONS: u32 = 3;
    pub const DEFAULT_NUM_BEAMS: u32 = 10;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            num_variations: Self::DEFAULT_NUM_VARIATIONS,
            num_beams: Self::DEFAULT_NUM_BEAMS,
        }
    }

    pub fn with_num_variations(mut self, n: u32) -> Self {
        self.num_variations = n;
        self
    }

    pub fn with_num_beams(mut self, n: u32) -> Self {
        self.num_beams = n;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub text: String,
    pub max_length: u32,
    pub num_return_sequences: u32,
}

impl CompletionRequest {
    pub const DEFAULT_MAX_LENGTH: u32 = 50;
    pub const DEFAULT_NUM_RETURN_SEQUENCES: u32 = 3;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_length: Self::DEFAULT_MAX_LENGTH,
            num_return_sequences: Self::DEFAULT_NUM_RETURN_SEQUENCES,
        }
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_num_return_sequences(mut self, n: u32) -> Self {
        self.num_return_sequences = n;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarRequest {
    pub text: String,
}

impl GrammarRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A request for one of the cached text operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TextRequest {
    Summarize(SummarizeRequest),
    Paraphrase(ParaphraseRequest),
    Complete(CompletionRequest),
    Grammar(GrammarRequest),
}

impl TextRequest {
    pub fn operation(&self) -> Operation {
        match self {
            TextRequest::Summarize(_) => Operation::Summarize,
            TextRequest::Paraphrase(_) => Operation::Paraphrase,
            TextRequest::Complete(_) => Operation::Complete,
            TextRequest::Grammar(_) => Operation::Grammar,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TextRequest::Summarize(r) => &r.text,
            TextRequest::Paraphrase(r) => &r.text,
            TextRequest::Complete(r) => &r.text,
            TextRequest::Grammar(r) => &r.text,
        }
    }

    /// Every parameter that affects model output, by name.
    pub fn key_params(&self) -> Vec<(&'static str, String)> {
        match self {
            TextRequest::Summarize(r) => vec![
                ("max_length", r.max_length.to_string()),
                ("min_length", r.min_length.to_string()),
            ],
            TextRequest::Paraphrase(r) => vec![
                ("num_beams", r.num_beams.to_string()),
                ("num_variations", r.num_variations.to_string()),
            ],
            TextRequest::Complete(r) => vec![
                ("max_length", r.max_length.to_string()),
                ("num_return_sequences", r.num_return_sequences.to_string()),
            ],
            TextRequest::Grammar(_) => Vec::new(),
        }
    }

    /// Number of list items a well-formed result carries, for list operations.
    pub fn expected_items(&self) -> Option<usize> {
        match self {
            TextRequest::Paraphrase(r) => Some(r.num_variations as usize),
            TextRequest::Complete(r) => Some(r.num_return_sequences as usize),
            TextRequest::Summarize(_) | TextRequest::Grammar(_) => None,
        }
    }

    /// Check input before it reaches the cache or the model.
    pub fn validate(&self) -> Result<()> {
        validate_text(self.text())?;
        match self {
            TextRequest::Summarize(r) => {
                ensure_positive(r.max_length, "request.max_length")?;
                if r.min_length > r.max_length {
                    return Err(Error::validation_with_context(
                        "min_length must not exceed max_length",
                        ErrorContext::new()
                            .with_field_path("request.min_length")
                            .with_details(format!(
                                "min_length={}, max_length={}",
                                r.min_length, r.max_length
                            ))
                            .with_source("request_validator"),
                    ));
                }
            }
            TextRequest::Paraphrase(r) => {
                ensure_positive(r.num_variations, "request.num_variations")?;
                if r.num_beams < r.num_variations {
                    return Err(Error::validation_with_context(
                        "num_beams must be at least num_variations",
                        ErrorContext::new()
                            .with_field_path("request.num_beams")
                            .with_details(format!(
                                "num_beams={}, num_variations={}",
                                r.num_beams, r.num_variations
                            ))
                            .with_source("request_validator"),
                    ));
                }
            }
            TextRequest::Complete(r) => {
                ensure_positive(r.max_length, "request.max_length")?;
                ensure_positive(r.num_return_sequences, "request.num_return_sequences")?;
                let words = r.text.split_whitespace().count();
                if words < MIN_COMPLETION_WORDS {
                    return Err(Error::validation_with_context(
                        "Please provide a longer text for better completions",
                        ErrorContext::new()
                            .with_field_path("request.text")
                            .with_details(format!(
                                "{words} words, need at least {MIN_COMPLETION_WORDS}"
                            ))
                            .with_source("request_validator"),
                    ));
                }
            }
            TextRequest::Grammar(_) => {}
        }
        Ok(())
    }

    /// Build a request from `name=value` pairs, falling back to defaults for
    /// anything not given. Unknown names are rejected.
    pub fn from_params(op: Operation, text: impl Into<String>, params: &[(String, String)]) -> Result<Self> {
        let text = text.into();
        let mut req = match op {
            Operation::Summarize => TextRequest::Summarize(SummarizeRequest::new(text)),
            Operation::Paraphrase => TextRequest::Paraphrase(ParaphraseRequest::new(text)),
            Operation::Complete => TextRequest::Complete(CompletionRequest::new(text)),
            Operation::Grammar => TextRequest::Grammar(GrammarRequest::new(text)),
        };
        for (name, value) in params {
            let name = name.as_str();
            let slot = match &mut req {
                TextRequest::Summarize(r) if name == "max_length" => &mut r.max_length,
                TextRequest::Summarize(r) if name == "min_length" => &mut r.min_length,
                TextRequest::Paraphrase(r) if name == "num_variations" => &mut r.num_variations,
                TextRequest::Paraphrase(r) if name == "num_beams" => &mut r.num_beams,
                TextRequest::Complete(r) if name == "max_length" => &mut r.max_length,
                TextRequest::Complete(r) if name == "num_return_sequences" => {
                    &mut r.num_return_sequences
                }
                _ => {
                    return Err(Error::validation_with_context(
                        format!("Unknown parameter for {op}: {name}"),
                        ErrorContext::new()
                            .with_field_path(format!("request.{name}"))
                            .with_source("request_parser"),
                    ))
                }
            };
            *slot = value.trim().parse().map_err(|_| {
                Error::validation_with_context(
                    format!("Parameter {name} must be a non-negative integer"),
                    ErrorContext::new()
                        .with_field_path(format!("request.{name}"))
                        .with_details(format!("got {value:?}"))
                        .with_source("request_parser"),
                )
            })?;
        }
        Ok(req)
    }
}

impl From<SummarizeRequest> for TextRequest {
    fn from(r: SummarizeRequest) -> Self {
        TextRequest::Summarize(r)
    }
}

impl From<ParaphraseRequest> for TextRequest {
    fn from(r: ParaphraseRequest) -> Self {
        TextRequest::Paraphrase(r)
    }
}

impl From<CompletionRequest> for TextRequest {
    fn from(r: CompletionRequest) -> Self {
        TextRequest::Complete(r)
    }
}

impl From<GrammarRequest> for TextRequest {
    fn from(r: GrammarRequest) -> Self {
        TextRequest::Grammar(r)
    }
}

fn validate_text(text: &str) -> Result<()> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation_with_context(
            "Text input is required",
            ErrorContext::new()
                .with_field_path("request.text")
                .with_source("request_validator"),
        ));
    }
    let chars = trimmed.chars().count();
    if chars < MIN_TEXT_CHARS {
        return Err(Error::validation_with_context(
            format!("Text must be at least {MIN_TEXT_CHARS} characters long"),
            ErrorContext::new()
                .with_field_path("request.text")
                .with_details(format!("got {chars} characters"))
                .with_source("request_validator"),
        ));
    }
    Ok(())
}

fn ensure_positive(value: u32, field: &str) -> Result<()> {
    if value == 0 {
        return Err(Error::validation_with_context(
            format!("{field} must be greater than zero"),
            ErrorContext::new()
                .with_field_path(field)
                .with_source("request_validator"),
        ));
    }
    Ok(())
}
