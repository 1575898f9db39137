//! Error types for the extraction pipeline.

use thiserror::Error;

/// Failures of the completion endpoint call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("LLM_API_KEY is not set")]
    AuthMissing,

    #[error("LLM service call failed: {0}")]
    Upstream(String),

    #[error("Unexpected error while calling the LLM: {0}")]
    Unexpected(String),
}

/// Failures turning raw model text into a `SchemaDraft`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Schema extraction failed: no JSON object found in LLM response")]
    NoJsonFound,

    #[error("Failed to parse JSON returned by the LLM: {message}")]
    MalformedJson { message: String, raw: String },

    #[error("Schema extraction failed: {0}")]
    ExtractionFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Input text must not be empty")]
    InvalidInput,

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl ExtractError {
    /// HTTP status code this failure is reported with.
    pub fn status(&self) -> u16 {
        match self {
            ExtractError::InvalidInput => 400,
            ExtractError::Completion(_) | ExtractError::Normalize(_) => 500,
        }
    }
}
