//! Core Errors

use thiserror::Error;

/// Maximum number of payload bytes kept in a [`CoreError::MalformedOutput`]
pub const MAX_PAYLOAD_EXCERPT: usize = 4096;

/// Errors raised while building or interpreting benchmark data
#[derive(Debug, Error)]
pub enum CoreError {
    /// The tool's output is not the expected JSON document
    #[error("Malformed tool output: {reason}\n--- payload ---\n{payload}")]
    MalformedOutput {
        /// What was wrong with the payload
        reason: String,
        /// The offending payload (truncated to [`MAX_PAYLOAD_EXCERPT`] bytes)
        payload: String,
    },

    /// Two variants share a name
    #[error("Duplicate variant name: {0}")]
    DuplicateVariant(String),

    /// The catalog does not contain the baseline variant
    #[error("Variant catalog has no baseline variant '{0}'")]
    MissingBaseline(String),

    /// A corpus definition is unusable
    #[error("Invalid corpus '{name}': {reason}")]
    InvalidCorpus {
        /// Corpus name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl CoreError {
    /// Build a `MalformedOutput` error, keeping an excerpt of the raw payload
    pub fn malformed(reason: impl Into<String>, raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let payload = if text.len() > MAX_PAYLOAD_EXCERPT {
            let mut end = MAX_PAYLOAD_EXCERPT;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... ({} bytes total)", &text[..end], raw.len())
        } else {
            text.into_owned()
        };
        CoreError::MalformedOutput {
            reason: reason.into(),
            payload,
        }
    }
}
