//! Typed classification of BigQuery Storage Write API append failures.
//!
//! Append RPCs fail with a generic gRPC status. This crate turns such a
//! status into a [`StorageFailure`] when it signals one of the failures a
//! writer can recover from on its own:
//!
//! - [`FailureKind::StreamClosed`]: the stream was finalized; open a new one.
//! - [`FailureKind::SchemaConflict`]: the rows have fields the table lacks;
//!   refresh the schema and retry.
//!
//! Structured `StorageError` details are used when the server sends them
//! ([`structured`]). Otherwise the status message is matched against known
//! server phrasings ([`detector`]). [`dispatch::classify`] applies both in
//! that order. `Ok(None)` means the failure is not one of the above and needs
//! generic handling.
//!
//! ```
//! use bqstorage_errors::{classify, FailureKind};
//!
//! let status = tonic::Status::invalid_argument(
//!     "Stream has been finalized and cannot be appended",
//! );
//! let failure = classify(&status).unwrap().expect("classified");
//! assert_eq!(failure.kind(), FailureKind::StreamClosed);
//! assert_eq!(failure.stream_name(), Some("unknown"));
//! ```

pub mod config;
pub mod detector;
pub mod dispatch;
pub mod error;
pub mod failure;
pub mod logging;
pub mod proto;
pub mod structured;
pub mod transport;

pub use crate::config::ClassifierConfig;
pub use detector::{classify_message, MessageClassifier, MessagePattern};
pub use dispatch::{classify, classify_with};
pub use error::{ClassifierConfigError, ClassifyError};
pub use failure::{Cause, FailureKind, RecoveryHint, StorageFailure};
pub use proto::{RpcStatus, StorageError, StorageErrorCode};
pub use structured::classify_status;
