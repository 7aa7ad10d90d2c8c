//! Pull JSON out of free-form model output.
//!
//! Models asked for "ONLY a valid JSON array" still wrap the answer in prose
//! or code fences.  The widest `[...]` (or `{...}`) span is cut out and
//! deserialised; nothing beyond deserialisation is checked.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::LlmError;

/// Which bracket pair delimits the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn brackets(self) -> (char, char) {
        match self {
            JsonShape::Array => ('[', ']'),
            JsonShape::Object => ('{', '}'),
        }
    }
}

/// From the first opening bracket to the last closing one, or the whole text
/// when no such span exists.
pub fn json_span(text: &str, shape: JsonShape) -> &str {
    let (open, close) = shape.brackets();
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Deserialise the JSON span of `text`; `what` names the artefact in the error.
pub fn extract_json<T: DeserializeOwned>(
    text: &str,
    shape: JsonShape,
    what: &'static str,
) -> Result<T, LlmError> {
    serde_json::from_str(json_span(text, shape)).map_err(|e| {
        warn!(what, error = %e, raw_len = text.len(), "model output is not valid JSON");
        LlmError::Generation(what)
    })
}
