//! Error taxonomy and transport-failure translation.
//!
//! Every failed RPC reaches the core as a [`Failure`]: a status [`Code`], the
//! status message, and the optional `grpc-status-details-bin` side channel.
//! [`Error::from_failure`] resolves it to one of a closed set of domain kinds,
//! preferring the server's structured [`ErrorResponse`](crate::wire::ErrorResponse)
//! when one is attached and parseable, and falling back to the status code
//! otherwise.

use std::fmt;

use bytes::Bytes;
use prost::Message as _;
use thiserror::Error;

use crate::wire;

/// Convenience alias used throughout the client.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by every client operation that reaches the server.
///
/// The set is closed: callers that want fine-grained behaviour can match
/// exhaustively and use [`Error::Other`] as the forward-compatible fallback
/// for kinds this client does not recognise yet.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure or inability to reach the server.
    #[error("i/o error: {0}")]
    Io(String),
    /// An event, query or response could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// A conditional append was rejected because its consistency boundary
    /// was violated.
    #[error("integrity error: {0}")]
    Integrity(String),
    /// The server detected corrupted persisted data.
    #[error("corruption error: {0}")]
    Corruption(String),
    /// Internal server or client failure.
    #[error("internal error: {0}")]
    Internal(String),
    /// The call was rejected for missing or invalid credentials.
    #[error("authentication error: {0}")]
    Authentication(String),
    /// Anything the client does not map to a more specific kind.
    #[error("{message}")]
    Other {
        /// Human-readable description, including the transport status.
        message: String,
    },
}

/// Payload-free tag of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Serialization,
    Integrity,
    Corruption,
    Internal,
    Authentication,
    Other,
}

impl Error {
    /// The kind of this error without its message.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Corruption(_) => ErrorKind::Corruption,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// The message carried by this error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Io(message)
            | Self::Serialization(message)
            | Self::Integrity(message)
            | Self::Corruption(message)
            | Self::Internal(message)
            | Self::Authentication(message)
            | Self::Other { message } => message,
        }
    }

    /// Resolve a failed call to a domain error.
    ///
    /// A structured payload in the failure's details wins over the status
    /// code. A payload that fails to parse is ignored and the status code is
    /// used instead.
    #[must_use]
    pub fn from_failure(failure: Failure) -> Self {
        match failure.error_response() {
            Some(response) => Self::from_error_response(response),
            None => Self::from_status(failure.code, failure.message),
        }
    }

    fn from_error_response(response: wire::ErrorResponse) -> Self {
        let message = response.message;
        match wire::ErrorType::try_from(response.error_type) {
            Ok(wire::ErrorType::Io) => Self::Io(message),
            Ok(wire::ErrorType::Serialization) => Self::Serialization(message),
            Ok(wire::ErrorType::Integrity) => Self::Integrity(message),
            Ok(wire::ErrorType::Corruption) => Self::Corruption(message),
            Ok(wire::ErrorType::Internal) => Self::Internal(message),
            Ok(wire::ErrorType::Authentication) => Self::Authentication(message),
            Err(_) => Self::Other { message },
        }
    }

    fn from_status(code: Code, message: String) -> Self {
        match code {
            Code::Unauthenticated => Self::Authentication(message),
            Code::FailedPrecondition => Self::Integrity(message),
            Code::DataLoss => Self::Corruption(message),
            Code::InvalidArgument => Self::Serialization(message),
            Code::Internal => Self::Internal(message),
            other => Self::Other {
                message: format!("rpc failed with status {other}: {message}"),
            },
        }
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        Self::from_failure(failure)
    }
}

/// A call argument or client configuration was rejected before any network
/// activity took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(String);

impl InvalidArgument {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Build an error for configuration rejected by a transport crate.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The reason the argument was rejected.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Transport status code of a failed call.
///
/// Mirrors the canonical gRPC codes so the core stays independent of any
/// particular RPC framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        };
        f.write_str(name)
    }
}

/// A failed RPC as reported by a [`Channel`](crate::channel::Channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Transport status code.
    pub code: Code,
    /// Status message.
    pub message: String,
    /// Raw `grpc-status-details-bin` bytes, when the server attached any.
    pub details: Option<Bytes>,
}

impl Failure {
    /// A failure carrying only a status code and message.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// A failure carrying a structured error payload alongside the status.
    pub fn with_error_response(code: Code, response: &wire::ErrorResponse) -> Self {
        Self {
            code,
            message: response.message.clone(),
            details: Some(Bytes::from(response.encode_to_vec())),
        }
    }

    /// Decode the structured error payload, if present and well formed.
    #[must_use]
    pub fn error_response(&self) -> Option<wire::ErrorResponse> {
        let details = self.details.as_ref().filter(|details| !details.is_empty())?;
        match wire::ErrorResponse::decode(details.clone()) {
            Ok(response) => Some(response),
            Err(error) => {
                tracing::trace!(%error, "ignoring unparseable error details");
                None
            }
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(error_type: wire::ErrorType, message: &str) -> wire::ErrorResponse {
        wire::ErrorResponse {
            message: message.to_string(),
            error_type: error_type.into(),
        }
    }

    #[test]
    fn status_codes_map_to_domain_kinds() {
        let cases = [
            (Code::Unauthenticated, ErrorKind::Authentication),
            (Code::FailedPrecondition, ErrorKind::Integrity),
            (Code::DataLoss, ErrorKind::Corruption),
            (Code::InvalidArgument, ErrorKind::Serialization),
            (Code::Internal, ErrorKind::Internal),
            (Code::Unavailable, ErrorKind::Other),
            (Code::NotFound, ErrorKind::Other),
        ];

        for (code, kind) in cases {
            let error = Error::from_failure(Failure::new(code, "boom"));
            assert_eq!(error.kind(), kind, "{code}");
        }
    }

    #[test]
    fn unrecognised_status_keeps_code_in_message() {
        let error = Error::from_failure(Failure::new(Code::Unavailable, "connection refused"));
        assert_eq!(
            error.message(),
            "rpc failed with status UNAVAILABLE: connection refused"
        );
    }

    #[test]
    fn structured_payload_wins_over_status_code() {
        let failure = Failure::with_error_response(
            Code::Internal,
            &payload(wire::ErrorType::Integrity, "condition failed"),
        );

        let error = Error::from_failure(failure);

        assert!(matches!(error, Error::Integrity(ref m) if m == "condition failed"));
    }

    #[test]
    fn every_declared_payload_kind_maps_one_to_one() {
        let cases = [
            (wire::ErrorType::Io, ErrorKind::Io),
            (wire::ErrorType::Serialization, ErrorKind::Serialization),
            (wire::ErrorType::Integrity, ErrorKind::Integrity),
            (wire::ErrorType::Corruption, ErrorKind::Corruption),
            (wire::ErrorType::Internal, ErrorKind::Internal),
            (wire::ErrorType::Authentication, ErrorKind::Authentication),
        ];

        for (error_type, kind) in cases {
            let failure = Failure::with_error_response(Code::Unknown, &payload(error_type, "x"));
            assert_eq!(Error::from_failure(failure).kind(), kind);
        }
    }

    #[test]
    fn unknown_payload_kind_maps_to_fallback() {
        let response = wire::ErrorResponse {
            message: "from the future".to_string(),
            error_type: 42,
        };
        let failure = Failure::with_error_response(Code::FailedPrecondition, &response);

        let error = Error::from_failure(failure);

        assert_eq!(error.kind(), ErrorKind::Other);
        assert_eq!(error.message(), "from the future");
    }

    #[test]
    fn garbage_details_fall_back_to_status_code() {
        let failure = Failure {
            code: Code::DataLoss,
            message: "disk on fire".to_string(),
            details: Some(Bytes::from_static(&[0xff, 0xff, 0xff])),
        };

        let error = Error::from_failure(failure);

        assert!(matches!(error, Error::Corruption(ref m) if m == "disk on fire"));
    }

    #[test]
    fn empty_details_fall_back_to_status_code() {
        let failure = Failure {
            code: Code::Unauthenticated,
            message: "missing token".to_string(),
            details: Some(Bytes::new()),
        };

        assert_eq!(
            Error::from_failure(failure).kind(),
            ErrorKind::Authentication
        );
    }

    #[test]
    fn invalid_argument_displays_reason() {
        let error = InvalidArgument::new("after must be >= 0");
        assert_eq!(error.to_string(), "invalid argument: after must be >= 0");
        assert_eq!(error.message(), "after must be >= 0");
    }
}
