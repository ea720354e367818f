//! Classifier configuration.
//!
//! The message heuristics are coupled to the server's exact wording. The
//! defaults live as constants in [`crate::detector`]; this module lets a
//! deployment override them from a TOML file or `BQSTORAGE__*` environment
//! variables without a rebuild.

use std::path::Path;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::detector::{
    SCHEMA_MISMATCH_PHRASE, STREAM_FINALIZED_PHRASE, STREAM_NAME_PATTERN, UNKNOWN_STREAM_NAME,
};
use crate::error::ClassifierConfigError;

/// Overrides for the message classifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Phrase identifying a schema conflict. Matched case-insensitively.
    pub schema_mismatch_phrase: String,
    /// Phrase identifying a finalized stream. Matched case-insensitively.
    pub stream_finalized_phrase: String,
    /// Regular expression locating the stream name in a message.
    pub stream_name_pattern: String,
    /// Stream name used when the message contains none.
    pub unknown_stream_name: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            schema_mismatch_phrase: SCHEMA_MISMATCH_PHRASE.to_string(),
            stream_finalized_phrase: STREAM_FINALIZED_PHRASE.to_string(),
            stream_name_pattern: STREAM_NAME_PATTERN.to_string(),
            unknown_stream_name: UNKNOWN_STREAM_NAME.to_string(),
        }
    }
}

impl ClassifierConfig {
    /// Load classifier configuration from a TOML file.
    ///
    /// Keys missing from the file keep their defaults. Environment variables
    /// prefixed with `BQSTORAGE__` override file values, e.g.
    /// `BQSTORAGE__UNKNOWN_STREAM_NAME`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file does not exist
    /// - The configuration file cannot be parsed
    /// - The path is invalid
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bqstorage_errors::config::ClassifierConfig;
    ///
    /// let config = ClassifierConfig::load("bqstorage.toml")?;
    /// # Ok::<(), bqstorage_errors::error::ClassifierConfigError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ClassifierConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ClassifierConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::with_name(path_str))
            .add_source(
                Environment::with_prefix("BQSTORAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
