//! Crate-wide error types.
//!
//! Only *hard* failures live here: a store operation that could not complete,
//! a composite call with zero decodable inputs, a bundled font that failed to
//! parse. Soft conditions — feature disabled, no usable training data, no
//! qualifying asset — are `Option`-shaped results, not errors; the caller
//! decides whether a fallback is warranted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("bigram store error: {0}")]
    Store(String),

    #[error("font error: {0}")]
    Font(String),

    /// Every candidate source image failed to decode — the composite call
    /// cannot produce a canvas. Per-image decode failures are logged and
    /// skipped; this fires only when nothing survives.
    #[error("no decodable source images")]
    NoAssets,

    #[error("image encode error: {0}")]
    ImageEncode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking worker task panicked or was cancelled before completing.
    #[error("worker task failed: {0}")]
    Join(String),
}
