use thiserror::Error;

/// Errors that can be returned by cognify-llm operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// An HTTP request failed (connection refused, body read error, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream server answered with a non-2xx status.
    #[error("AI API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The completion body matched none of the known response shapes.
    #[error("unexpected response format")]
    UnexpectedFormat,

    /// Model output could not be turned into the requested structure.
    #[error("failed to generate {0}")]
    Generation(&'static str),

    /// The code-execution catalogue has no entry for this language id.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}
