//! Wire types consumed from the Storage Write API.
//!
//! Only the pieces needed to read structured error details are modelled:
//! `google.rpc.Status` and `google.cloud.bigquery.storage.v1.StorageError`.
//! Field tags match the published protos.

use prost::Message;
use prost_types::Any;

/// Fully-qualified protobuf name of [`StorageError`].
pub const STORAGE_ERROR_TYPE_NAME: &str = "google.cloud.bigquery.storage.v1.StorageError";

/// Type URL the service uses when packing a [`StorageError`] into an `Any`.
pub const STORAGE_ERROR_TYPE_URL: &str =
    "type.googleapis.com/google.cloud.bigquery.storage.v1.StorageError";

/// `google.rpc.Status`: code, message and typed detail attachments.
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

impl RpcStatus {
    pub fn new(code: tonic::Code, message: impl Into<String>, details: Vec<Any>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            details,
        }
    }

    /// The transport code, with unknown values mapped to `Unknown`.
    pub fn transport_code(&self) -> tonic::Code {
        tonic::Code::from_i32(self.code)
    }
}

/// Structured error detail attached to Storage Write API failures.
#[derive(Clone, PartialEq, Message)]
pub struct StorageError {
    #[prost(enumeration = "StorageErrorCode", tag = "1")]
    pub code: i32,
    /// Name of the failed entity, usually a stream path.
    #[prost(string, tag = "2")]
    pub entity: String,
    #[prost(string, tag = "3")]
    pub error_message: String,
}

impl StorageError {
    pub fn new(
        code: StorageErrorCode,
        entity: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            code: code as i32,
            entity: entity.into(),
            error_message: error_message.into(),
        }
    }

    /// The error code, or `None` when the server sent a value this client
    /// does not know.
    pub fn known_code(&self) -> Option<StorageErrorCode> {
        StorageErrorCode::try_from(self.code).ok()
    }

    /// Packs this error into an `Any` tagged with [`STORAGE_ERROR_TYPE_URL`].
    pub fn to_any(&self) -> Any {
        Any {
            type_url: STORAGE_ERROR_TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }
}

/// `StorageError.StorageErrorCode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StorageErrorCode {
    Unspecified = 0,
    TableNotFound = 1,
    StreamAlreadyCommitted = 2,
    StreamNotFound = 3,
    InvalidStreamType = 4,
    InvalidStreamState = 5,
    /// The stream is closed to appends.
    StreamFinalized = 6,
    /// The input schema has fields the table schema does not.
    SchemaMismatchExtraFields = 7,
    OffsetAlreadyExists = 8,
    OffsetOutOfRange = 9,
    CmekNotProvided = 10,
    InvalidCmekProvided = 11,
    CmekEncryptionError = 12,
    KmsServiceError = 13,
    KmsPermissionDenied = 14,
}

impl StorageErrorCode {
    /// The proto enum value name, e.g. `STREAM_FINALIZED`.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "STORAGE_ERROR_CODE_UNSPECIFIED",
            Self::TableNotFound => "TABLE_NOT_FOUND",
            Self::StreamAlreadyCommitted => "STREAM_ALREADY_COMMITTED",
            Self::StreamNotFound => "STREAM_NOT_FOUND",
            Self::InvalidStreamType => "INVALID_STREAM_TYPE",
            Self::InvalidStreamState => "INVALID_STREAM_STATE",
            Self::StreamFinalized => "STREAM_FINALIZED",
            Self::SchemaMismatchExtraFields => "SCHEMA_MISMATCH_EXTRA_FIELDS",
            Self::OffsetAlreadyExists => "OFFSET_ALREADY_EXISTS",
            Self::OffsetOutOfRange => "OFFSET_OUT_OF_RANGE",
            Self::CmekNotProvided => "CMEK_NOT_PROVIDED",
            Self::InvalidCmekProvided => "INVALID_CMEK_PROVIDED",
            Self::CmekEncryptionError => "CMEK_ENCRYPTION_ERROR",
            Self::KmsServiceError => "KMS_SERVICE_ERROR",
            Self::KmsPermissionDenied => "KMS_PERMISSION_DENIED",
        }
    }
}

/// Returns the type name an `Any` type URL refers to: everything after the
/// last `/`. A URL without a `/` names no type.
pub fn type_name(type_url: &str) -> Option<&str> {
    type_url.rsplit_once('/').map(|(_, name)| name)
}

/// Returns true if the attachment is tagged as a [`StorageError`].
pub fn is_storage_error(detail: &Any) -> bool {
    type_name(&detail.type_url) == Some(STORAGE_ERROR_TYPE_NAME)
}
