#![doc = include_str!("../README.md")]

pub use umadb_core::{
    client,
    client::{Client, ClientStream, SHUTDOWN_TIMEOUT},
    condition,
    condition::AppendCondition,
    error,
    error::{Error, ErrorKind, InvalidArgument, Result},
    event,
    event::{Event, SequencedEvent},
    query,
    query::{Query, QueryItem},
    request,
    request::{AppendRequest, AppendResponse, ReadRequest, ReadResponse},
    stream,
    stream::{Events, ReadStream},
};

pub mod channel {
    pub use umadb_core::channel::{Channel, Connector};

    // Wire-level types for Channel implementors only.
    #[doc(hidden)]
    pub use umadb_core::{Code, Failure, wire};

    pub use umadb_core::channel::inmemory;

    #[cfg(feature = "grpc")]
    #[cfg_attr(docsrs, doc(cfg(feature = "grpc")))]
    pub mod grpc {
        pub use umadb_grpc::{
            BearerAuth, Builder, Config, DEFAULT_HOST, DEFAULT_PORT, GrpcChannel, GrpcConnector,
            GrpcStream,
        };
    }
}

/// Start building a gRPC client. See [`channel::grpc::Builder`].
#[cfg(feature = "grpc")]
#[cfg_attr(docsrs, doc(cfg(feature = "grpc")))]
pub use umadb_grpc::builder;
