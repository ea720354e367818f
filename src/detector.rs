//! Message-based failure detector
//!
//! This module classifies append failures that arrive without structured
//! details, using only the transport code and the error message. It matches
//! known server phrasings and pulls the stream name out of the message with a
//! regular expression.
//!
//! The phrasings below are copied from the server's error text. If the server
//! rewords them, these constants (or a [`ClassifierConfig`]) are the only
//! place that needs to change.

use std::sync::OnceLock;

use regex::Regex;
use tonic::Code;

use crate::config::ClassifierConfig;
use crate::error::ClassifierConfigError;
use crate::failure::{Cause, FailureKind, StorageFailure};

/// Lower-cased phrase the server uses for rows with fields the table lacks.
pub const SCHEMA_MISMATCH_PHRASE: &str = "input schema has more fields than bigquery schema";

/// Lower-cased phrase the server uses for appends to a finalized stream.
pub const STREAM_FINALIZED_PHRASE: &str = "stream has been finalized and cannot be appended";

/// Shape of a fully-qualified write stream name.
pub const STREAM_NAME_PATTERN: &str = "projects/[^/]+/datasets/[^/]+/tables/[^/]+/streams/[^/]+";

/// Stream name reported when the message does not contain one.
pub const UNKNOWN_STREAM_NAME: &str = "unknown";

/// The only transport code the phrasings above are ever sent with.
pub const HEURISTIC_CODE: Code = Code::InvalidArgument;

/// A known server phrasing and the failure category it signals.
#[derive(Debug, Clone)]
pub struct MessagePattern {
    /// The phrase, lower-cased.
    phrase: String,
    kind: FailureKind,
    description: String,
}

impl MessagePattern {
    /// Creates a new message pattern. The phrase is lower-cased so it can be
    /// compared against lower-cased messages.
    pub fn new(phrase: &str, kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            phrase: phrase.to_lowercase(),
            kind,
            description: description.into(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Checks if this pattern occurs in an already lower-cased message.
    pub fn matches(&self, lowered: &str) -> bool {
        lowered.contains(&self.phrase)
    }
}

/// Classifies transport errors by their message text.
///
/// Holds no mutable state; a single instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    /// Patterns to match against, in priority order.
    patterns: Vec<MessagePattern>,
    stream_name: Regex,
    unknown_stream_name: String,
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageClassifier {
    /// Creates a classifier with the built-in phrasings.
    ///
    /// # Panics
    /// Panics if the built-in stream name pattern is invalid.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(SCHEMA_MISMATCH_PHRASE, STREAM_FINALIZED_PHRASE),
            stream_name: Regex::new(STREAM_NAME_PATTERN).expect("Invalid stream name pattern"),
            unknown_stream_name: UNKNOWN_STREAM_NAME.to_string(),
        }
    }

    /// Creates a classifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a phrase is blank or the stream name pattern is
    /// not a valid regex. A blank phrase would match every message.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierConfigError> {
        require_phrase("schema_mismatch_phrase", &config.schema_mismatch_phrase)?;
        require_phrase("stream_finalized_phrase", &config.stream_finalized_phrase)?;

        Ok(Self {
            patterns: Self::default_patterns(
                &config.schema_mismatch_phrase,
                &config.stream_finalized_phrase,
            ),
            stream_name: Regex::new(&config.stream_name_pattern)?,
            unknown_stream_name: config.unknown_stream_name.clone(),
        })
    }

    // Schema conflict is checked first. The two phrasings never appear together
    // in practice.
    fn default_patterns(schema_mismatch: &str, stream_finalized: &str) -> Vec<MessagePattern> {
        vec![
            MessagePattern::new(
                schema_mismatch,
                FailureKind::SchemaConflict,
                "Input schema has more fields than the table schema",
            ),
            MessagePattern::new(
                stream_finalized,
                FailureKind::StreamClosed,
                "Append to a finalized stream",
            ),
        ]
    }

    /// Returns the number of patterns configured.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[MessagePattern] {
        &self.patterns
    }

    pub fn unknown_stream_name(&self) -> &str {
        &self.unknown_stream_name
    }

    /// Finds the first stream name anywhere in the message.
    pub fn extract_stream_name<'a>(&self, message: &'a str) -> Option<&'a str> {
        self.stream_name.find(message).map(|m| m.as_str())
    }

    /// Classifies a transport error from its code and message.
    ///
    /// Returns `None` when there is no message, when the code is not
    /// `InvalidArgument`, or when no known phrasing occurs in the message.
    /// Failures produced here never carry sub-errors, and fall back to the
    /// unknown stream name when the message names no stream.
    pub fn classify(
        &self,
        code: Code,
        message: Option<&str>,
        cause: Option<Cause>,
    ) -> Option<StorageFailure> {
        let message = message?;
        if code != HEURISTIC_CODE {
            tracing::trace!(code = ?code, "transport code not eligible for message classification");
            return None;
        }

        let lowered = message.to_lowercase();
        let pattern = self.patterns.iter().find(|p| p.matches(&lowered))?;

        let stream_name = self
            .extract_stream_name(message)
            .unwrap_or(self.unknown_stream_name.as_str())
            .to_string();

        tracing::debug!(
            kind = %pattern.kind(),
            stream = %stream_name,
            "classified append failure from message"
        );

        Some(StorageFailure::new(
            pattern.kind(),
            Some(stream_name),
            Some(message.to_string()),
            cause,
        ))
    }
}

fn require_phrase(key: &'static str, phrase: &str) -> Result<(), ClassifierConfigError> {
    if phrase.trim().is_empty() {
        return Err(ClassifierConfigError::EmptyPhrase(key));
    }
    Ok(())
}

/// Returns the process-wide classifier built from the default phrasings.
pub fn default_classifier() -> &'static MessageClassifier {
    static DEFAULT: OnceLock<MessageClassifier> = OnceLock::new();
    DEFAULT.get_or_init(MessageClassifier::new)
}

/// Classifies a transport error from its code and message using the default
/// phrasings. See [`MessageClassifier::classify`].
pub fn classify_message(
    code: Code,
    message: Option<&str>,
    cause: Option<Cause>,
) -> Option<StorageFailure> {
    default_classifier().classify(code, message, cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const STREAM: &str = "projects/p1/datasets/d1/tables/t1/streams/s1";

    // ==================== MessagePattern Tests ====================

    #[test]
    fn test_message_pattern_lowercases_phrase() {
        let pattern = MessagePattern::new("Stream Closed", FailureKind::StreamClosed, "Closed");

        assert_eq!(pattern.phrase(), "stream closed");
        assert_eq!(pattern.kind(), FailureKind::StreamClosed);
        assert_eq!(pattern.description(), "Closed");
        assert!(pattern.matches("the stream closed early"));
        assert!(!pattern.matches("the stream is open"));
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_default_classifier_patterns() {
        let classifier = MessageClassifier::default();

        assert_eq!(classifier.pattern_count(), 2);
        assert_eq!(classifier.patterns()[0].kind(), FailureKind::SchemaConflict);
        assert_eq!(classifier.patterns()[1].kind(), FailureKind::StreamClosed);
        assert_eq!(classifier.unknown_stream_name(), UNKNOWN_STREAM_NAME);
    }

    #[test]
    fn test_from_config_overrides() {
        let config = ClassifierConfig {
            schema_mismatch_phrase: "Schema Drift".to_string(),
            stream_finalized_phrase: "stream closed".to_string(),
            stream_name_pattern: "streams/[a-z0-9]+".to_string(),
            unknown_stream_name: "n/a".to_string(),
        };
        let classifier = MessageClassifier::from_config(&config).unwrap();

        let failure = classifier
            .classify(
                Code::InvalidArgument,
                Some("SCHEMA DRIFT on streams/abc"),
                None,
            )
            .unwrap();
        assert_eq!(failure.kind(), FailureKind::SchemaConflict);
        assert_eq!(failure.stream_name(), Some("streams/abc"));

        let failure = classifier
            .classify(Code::InvalidArgument, Some("stream closed"), None)
            .unwrap();
        assert_eq!(failure.stream_name(), Some("n/a"));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let config = ClassifierConfig {
            stream_name_pattern: "projects/(".to_string(),
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            MessageClassifier::from_config(&config),
            Err(ClassifierConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_blank_phrases() {
        let config = ClassifierConfig {
            schema_mismatch_phrase: String::new(),
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            MessageClassifier::from_config(&config),
            Err(ClassifierConfigError::EmptyPhrase("schema_mismatch_phrase"))
        ));

        let config = ClassifierConfig {
            stream_finalized_phrase: "  \t".to_string(),
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            MessageClassifier::from_config(&config),
            Err(ClassifierConfigError::EmptyPhrase("stream_finalized_phrase"))
        ));
    }

    #[test]
    fn test_shared_default_classifier() {
        let a = default_classifier() as *const MessageClassifier;
        let b = default_classifier() as *const MessageClassifier;
        assert_eq!(a, b);
    }

    // ==================== Stream Name Extraction Tests ====================

    #[test]
    fn test_extract_stream_name() {
        let classifier = MessageClassifier::new();
        let message = format!("error on {} now", STREAM);

        assert_eq!(
            classifier.extract_stream_name(&message),
            Some("projects/p1/datasets/d1/tables/t1/streams/s1 now")
        );
        assert_eq!(classifier.extract_stream_name(STREAM), Some(STREAM));
        assert_eq!(classifier.extract_stream_name("no stream here"), None);
    }

    #[test]
    fn test_extract_stream_name_first_match_wins() {
        let classifier = MessageClassifier::new();
        let message = "projects/a/datasets/b/tables/c/streams/first/projects/x/datasets/y/tables/z/streams/second";

        assert_eq!(
            classifier.extract_stream_name(message),
            Some("projects/a/datasets/b/tables/c/streams/first")
        );
    }

    #[test]
    fn test_extract_stream_name_requires_all_segments() {
        let classifier = MessageClassifier::new();
        assert_eq!(
            classifier.extract_stream_name("projects/p/datasets/d/tables/t"),
            None
        );
        assert_eq!(
            classifier.extract_stream_name("projects//datasets/d/tables/t/streams/s"),
            None
        );
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_schema_conflict_with_stream() {
        let message = format!(
            "Input schema has more fields than BigQuery schema, extra fields: 'foo' Entity: {}",
            STREAM
        );
        let failure = classify_message(Code::InvalidArgument, Some(&message), None).unwrap();

        assert_eq!(failure.kind(), FailureKind::SchemaConflict);
        assert_eq!(failure.stream_name(), Some(STREAM));
        assert_eq!(failure.message(), Some(message.as_str()));
        assert!(failure.errors().is_empty());
    }

    #[test]
    fn test_classify_stream_closed_without_stream() {
        let failure = classify_message(
            Code::InvalidArgument,
            Some("Stream has been finalized and cannot be appended"),
            None,
        )
        .unwrap();

        assert_eq!(failure.kind(), FailureKind::StreamClosed);
        assert_eq!(failure.stream_name(), Some(UNKNOWN_STREAM_NAME));
        assert!(failure.errors().is_empty());
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let failure = classify_message(
            Code::InvalidArgument,
            Some("STREAM HAS BEEN FINALIZED AND CANNOT BE APPENDED"),
            None,
        );
        assert!(failure.is_some());
    }

    #[test]
    fn test_classify_stream_name_keeps_original_case() {
        let message = "stream has been finalized and cannot be appended: projects/P/datasets/D/tables/T/streams/S";
        let failure = classify_message(Code::InvalidArgument, Some(message), None).unwrap();

        assert_eq!(
            failure.stream_name(),
            Some("projects/P/datasets/D/tables/T/streams/S")
        );
    }

    #[test]
    fn test_classify_no_message() {
        assert!(classify_message(Code::InvalidArgument, None, None).is_none());
    }

    #[test]
    fn test_classify_empty_message() {
        assert!(classify_message(Code::InvalidArgument, Some(""), None).is_none());
    }

    #[test]
    fn test_classify_other_codes_never_match() {
        let message = "Stream has been finalized and cannot be appended";
        for code in [
            Code::Ok,
            Code::Unknown,
            Code::Unavailable,
            Code::FailedPrecondition,
            Code::NotFound,
            Code::Internal,
            Code::OutOfRange,
        ] {
            assert!(
                classify_message(code, Some(message), None).is_none(),
                "code {:?} should not classify",
                code
            );
        }
    }

    #[test]
    fn test_classify_unrelated_message() {
        assert!(classify_message(Code::InvalidArgument, Some("Bad request"), None).is_none());
    }

    #[test]
    fn test_classify_both_phrases_prefers_schema_conflict() {
        let message = "Stream has been finalized and cannot be appended; input schema has more fields than BigQuery schema";
        let failure = classify_message(Code::InvalidArgument, Some(message), None).unwrap();

        assert_eq!(failure.kind(), FailureKind::SchemaConflict);
    }

    #[test]
    fn test_classify_retains_cause() {
        let status =
            tonic::Status::invalid_argument("Stream has been finalized and cannot be appended");
        let cause: Cause = Arc::new(status.clone());

        let failure = classify_message(status.code(), Some(status.message()), Some(cause)).unwrap();

        let cause = failure.cause().expect("cause should be retained");
        assert!(cause.to_string().contains("finalized"));
    }

    #[test]
    fn test_classify_is_referentially_transparent() {
        let message = format!("Stream has been finalized and cannot be appended {}", STREAM);
        let first = classify_message(Code::InvalidArgument, Some(&message), None).unwrap();
        let second = classify_message(Code::InvalidArgument, Some(&message), None).unwrap();

        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.stream_name(), second.stream_name());
        assert_eq!(first.message(), second.message());
    }
}
