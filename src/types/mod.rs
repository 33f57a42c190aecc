//! 类型模块：文本操作请求与缓存结果。
//!
//! # Types Module
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TextRequest`] | One of the cached text operations with its parameters |
//! | [`Operation`] | Operation tag; selects the cache file |
//! | [`CachedResult`] | Stored model output: one text or a list of texts |

pub mod request;
pub mod result;

pub use request::{
    CompletionRequest, GrammarRequest, Operation, ParaphraseRequest, SummarizeRequest,
    TextRequest,
};
pub use result::CachedResult;
