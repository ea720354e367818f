//! Error types for classification and configuration.

use thiserror::Error;

/// A structured error payload that cannot be decoded.
///
/// This is a protocol or version mismatch between client and server, and is
/// never reported as "no match".
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A detail attachment tagged as a StorageError failed to decode.
    #[error("malformed detail attachment {type_url}: {source}")]
    MalformedDetail {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },

    /// The binary status details carried by a transport error are not a
    /// valid `google.rpc.Status`.
    #[error("malformed status details: {0}")]
    MalformedStatus(#[source] prost::DecodeError),
}

/// Errors loading or applying a [`ClassifierConfig`](crate::config::ClassifierConfig).
#[derive(Debug, Error)]
pub enum ClassifierConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// The configuration file path is invalid.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// A message phrase is empty or whitespace only.
    #[error("{0} must not be empty")]
    EmptyPhrase(&'static str),

    /// The stream name pattern is not a valid regular expression.
    #[error("invalid stream name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
