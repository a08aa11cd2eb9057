//! Conversion of `tonic` statuses into transport-neutral failures.

use bytes::Bytes;
use tonic::Status;
use umadb_core::{Code, Failure};

/// Keep the code, message and `grpc-status-details-bin` payload of a failed
/// call. Empty details are treated as absent.
pub fn into_failure(status: &Status) -> Failure {
    let details = status.details();
    Failure {
        code: code(status.code()),
        message: status.message().to_string(),
        details: (!details.is_empty()).then(|| Bytes::copy_from_slice(details)),
    }
}

pub const fn code(code: tonic::Code) -> Code {
    match code {
        tonic::Code::Ok => Code::Ok,
        tonic::Code::Cancelled => Code::Cancelled,
        tonic::Code::Unknown => Code::Unknown,
        tonic::Code::InvalidArgument => Code::InvalidArgument,
        tonic::Code::DeadlineExceeded => Code::DeadlineExceeded,
        tonic::Code::NotFound => Code::NotFound,
        tonic::Code::AlreadyExists => Code::AlreadyExists,
        tonic::Code::PermissionDenied => Code::PermissionDenied,
        tonic::Code::ResourceExhausted => Code::ResourceExhausted,
        tonic::Code::FailedPrecondition => Code::FailedPrecondition,
        tonic::Code::Aborted => Code::Aborted,
        tonic::Code::OutOfRange => Code::OutOfRange,
        tonic::Code::Unimplemented => Code::Unimplemented,
        tonic::Code::Internal => Code::Internal,
        tonic::Code::Unavailable => Code::Unavailable,
        tonic::Code::DataLoss => Code::DataLoss,
        tonic::Code::Unauthenticated => Code::Unauthenticated,
    }
}
