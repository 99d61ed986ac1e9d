//! Per-code error taxonomy.
//!
//! Every stage of the pipeline fails with a `PipelineError` that names the
//! affected code. All of these are fatal for a single code only: the batch
//! driver records them and continues with the next token.

use thiserror::Error;

/// Pipeline stage, used for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Resolve,
    Sanitize,
    Annotate,
    Render,
    Encode,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normalize => "normalize",
            Self::Resolve => "resolve",
            Self::Sanitize => "sanitize",
            Self::Annotate => "annotate",
            Self::Render => "render",
            Self::Encode => "encode",
        };
        f.write_str(s)
    }
}

/// Errors that abort processing of a single character code.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input token is empty, non-hex garbage, or maps to a control code point.
    #[error("invalid token `{token}`: {reason}")]
    InvalidToken { token: String, reason: String },

    /// Every source candidate failed for this code.
    #[error("no source yielded a document for {code} (tried {})", tried.join(", "))]
    SourceExhausted { code: String, tried: Vec<String> },

    /// Fetched document could not be reduced to a valid minimal SVG.
    #[error("unsanitizable document for {code}: {reason}")]
    UnsanitizableDocument { code: String, reason: String },

    /// Both primary and fallback rasterizers failed.
    #[error("render failed for {code}: {reason}")]
    RenderFailure { code: String, reason: String },

    /// Bitmap produced but compression/encoding failed.
    #[error("encode failed for {code}: {reason}")]
    EncodeFailure { code: String, reason: String },
}

impl PipelineError {
    /// Stage this error belongs to, for the batch summary.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidToken { .. } => Stage::Normalize,
            Self::SourceExhausted { .. } => Stage::Resolve,
            Self::UnsanitizableDocument { .. } => Stage::Sanitize,
            Self::RenderFailure { .. } => Stage::Render,
            Self::EncodeFailure { .. } => Stage::Encode,
        }
    }
}
