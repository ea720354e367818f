//! Structured-then-message classification of transport errors.
//!
//! Callers hand over the `tonic::Status` an append returned. The structured
//! details, when the server sent any, are tried first; the message heuristics
//! only run if they produce no match. A `None` from here means the failure is
//! not one of the categories this crate distinguishes and must get generic
//! handling.

use std::sync::Arc;

use prost::Message;

use crate::detector::{default_classifier, MessageClassifier};
use crate::error::ClassifyError;
use crate::failure::{Cause, StorageFailure};
use crate::proto::RpcStatus;
use crate::structured::classify_status;

/// Decodes the binary details of a transport error into a `google.rpc.Status`.
///
/// Returns `Ok(None)` when the error carries no details.
pub fn rpc_status(status: &tonic::Status) -> Result<Option<RpcStatus>, ClassifyError> {
    let details = status.details();
    if details.is_empty() {
        return Ok(None);
    }
    RpcStatus::decode(details)
        .map(Some)
        .map_err(ClassifyError::MalformedStatus)
}

/// Classifies a transport error with the default message phrasings.
///
/// See [`classify_with`].
pub fn classify(status: &tonic::Status) -> Result<Option<StorageFailure>, ClassifyError> {
    classify_with(default_classifier(), status)
}

/// Classifies a transport error.
///
/// The returned failure's cause is the transport error itself.
///
/// # Errors
///
/// Returns an error if the status carries details that cannot be decoded,
/// either as a `google.rpc.Status` or as the `StorageError` inside it. A
/// malformed payload is never downgraded to a message-based match.
pub fn classify_with(
    classifier: &MessageClassifier,
    status: &tonic::Status,
) -> Result<Option<StorageFailure>, ClassifyError> {
    let cause: Cause = Arc::new(status.clone());

    if let Some(rpc_status) = rpc_status(status)? {
        if let Some(failure) = classify_status(&rpc_status, Some(cause.clone()))? {
            return Ok(Some(failure));
        }
    }

    Ok(classifier.classify(status.code(), Some(status.message()), Some(cause)))
}
