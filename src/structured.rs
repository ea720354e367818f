//! Classification from structured status details.
//!
//! The server attaches a `StorageError` to the `google.rpc.Status` of a failed
//! append. Its code tells us exactly which failure occurred, so this path is
//! preferred over message matching whenever details are present.

use prost::Message;

use crate::error::ClassifyError;
use crate::failure::{Cause, FailureKind, StorageFailure};
use crate::proto::{is_storage_error, RpcStatus, StorageError, StorageErrorCode};

/// Finds and decodes the first `StorageError` attachment of a status.
///
/// Attachments of other types are skipped. Returns `Ok(None)` when no
/// attachment is a `StorageError`.
///
/// # Errors
///
/// Returns [`ClassifyError::MalformedDetail`] if the first `StorageError`
/// attachment cannot be decoded. Later attachments are not tried.
pub fn find_storage_error(status: &RpcStatus) -> Result<Option<StorageError>, ClassifyError> {
    let Some(detail) = status.details.iter().find(|d| is_storage_error(d)) else {
        return Ok(None);
    };

    match StorageError::decode(detail.value.as_slice()) {
        Ok(error) => Ok(Some(error)),
        Err(source) => {
            tracing::warn!(
                type_url = %detail.type_url,
                error = %source,
                "StorageError detail failed to decode"
            );
            Err(ClassifyError::MalformedDetail {
                type_url: detail.type_url.clone(),
                source,
            })
        }
    }
}

/// Maps a decoded `StorageError` to a failure category.
pub fn failure_kind(code: StorageErrorCode) -> Option<FailureKind> {
    match code {
        StorageErrorCode::StreamFinalized => Some(FailureKind::StreamClosed),
        StorageErrorCode::SchemaMismatchExtraFields => Some(FailureKind::SchemaConflict),
        _ => None,
    }
}

/// Classifies a structured status.
///
/// Returns `Ok(None)` when the status has no `StorageError` attachment or its
/// code is not one this crate distinguishes. The failure's stream name and
/// message come from the attachment's `entity` and `error_message` fields.
///
/// # Errors
///
/// Returns [`ClassifyError::MalformedDetail`] if the `StorageError`
/// attachment cannot be decoded.
pub fn classify_status(
    status: &RpcStatus,
    cause: Option<Cause>,
) -> Result<Option<StorageFailure>, ClassifyError> {
    let Some(error) = find_storage_error(status)? else {
        tracing::trace!("no StorageError detail in status");
        return Ok(None);
    };

    let Some(kind) = error.known_code().and_then(failure_kind) else {
        tracing::trace!(code = error.code, "StorageError code not classified");
        return Ok(None);
    };

    tracing::debug!(
        kind = %kind,
        stream = %error.entity,
        "classified append failure from StorageError"
    );

    Ok(Some(StorageFailure::new(
        kind,
        Some(error.entity),
        Some(error.error_message),
        cause,
    )))
}
