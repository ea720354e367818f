//! Classified append failures
//!
//! This module provides the typed failure value returned by both classification
//! paths. A failure carries its category, the stream it pertains to, the
//! server's message, the original error it was derived from, and an optional
//! map of per-stream sub-errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::transport::code_name;

/// The original error a failure was classified from.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The category of a classified append failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The stream has been finalized and no longer accepts appends.
    /// Terminal for that stream.
    StreamClosed,
    /// The input rows carry fields the destination table schema does not have.
    SchemaConflict,
}

impl FailureKind {
    /// Stable snake_case name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamClosed => "stream_closed",
            Self::SchemaConflict => "schema_conflict",
        }
    }

    /// The recovery strategy a caller should apply for this category.
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::StreamClosed => RecoveryHint::ReopenStream,
            Self::SchemaConflict => RecoveryHint::UpdateSchema,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hints for how a caller should recover from a classified failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryHint {
    /// Open a new write stream and append there.
    ReopenStream,
    /// Refresh the writer's schema from the destination table, then retry.
    UpdateSchema,
}

impl RecoveryHint {
    /// Stable snake_case name of the hint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReopenStream => "reopen_stream",
            Self::UpdateSchema => "update_schema",
        }
    }
}

impl fmt::Display for RecoveryHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified append failure.
///
/// Constructed fresh by each classification call and immutable afterwards.
#[derive(Clone)]
pub struct StorageFailure {
    kind: FailureKind,
    message: Option<String>,
    cause: Option<Cause>,
    stream_name: Option<String>,
    errors: HashMap<String, tonic::Code>,
}

impl StorageFailure {
    /// Creates a failure of the given kind with no sub-errors.
    pub fn new(
        kind: FailureKind,
        stream_name: Option<String>,
        message: Option<String>,
        cause: Option<Cause>,
    ) -> Self {
        Self {
            kind,
            message,
            cause,
            stream_name,
            errors: HashMap::new(),
        }
    }

    /// Creates a [`FailureKind::StreamClosed`] failure.
    pub fn stream_closed(
        stream_name: impl Into<String>,
        message: impl Into<String>,
        cause: Option<Cause>,
    ) -> Self {
        Self::new(
            FailureKind::StreamClosed,
            Some(stream_name.into()),
            Some(message.into()),
            cause,
        )
    }

    /// Creates a [`FailureKind::SchemaConflict`] failure.
    pub fn schema_conflict(
        stream_name: impl Into<String>,
        message: impl Into<String>,
        cause: Option<Cause>,
    ) -> Self {
        Self::new(
            FailureKind::SchemaConflict,
            Some(stream_name.into()),
            Some(message.into()),
            cause,
        )
    }

    /// Attaches a map of per-stream sub-errors.
    pub fn with_errors(mut self, errors: HashMap<String, tonic::Code>) -> Self {
        self.errors = errors;
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The fully-qualified name of the stream the failure pertains to.
    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    /// Per-stream sub-errors. Empty unless the server reported several.
    pub fn errors(&self) -> &HashMap<String, tonic::Code> {
        &self.errors
    }

    /// The original error this failure was classified from.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub fn recovery_hint(&self) -> RecoveryHint {
        self.kind.recovery_hint()
    }

    pub fn is_stream_closed(&self) -> bool {
        matches!(self.kind, FailureKind::StreamClosed)
    }

    pub fn is_schema_conflict(&self) -> bool {
        matches!(self.kind, FailureKind::SchemaConflict)
    }
}

impl fmt::Debug for StorageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: HashMap<&str, &str> = self
            .errors
            .iter()
            .map(|(stream, code)| (stream.as_str(), code_name(*code)))
            .collect();
        f.debug_struct("StorageFailure")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("stream_name", &self.stream_name)
            .field("errors", &errors)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for StorageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(stream) = &self.stream_name {
            write!(f, " ({})", stream)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn std::error::Error + 'static))
    }
}
