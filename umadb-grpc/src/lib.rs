//! gRPC transport for the UmaDB client.
//!
//! Connects [`umadb_core::Client`] to a server over `tonic`, with optional TLS
//! and bearer-token authentication.
//!
//! ```no_run
//! use umadb_core::{AppendRequest, Event};
//!
//! let mut client = umadb_grpc::builder()
//!     .host_and_port("localhost", 50051)
//!     .build()?;
//! client.connect()?;
//! let event = Event::tagged("greeted", "user:1", "hello")?;
//! client.append(&AppendRequest::new(vec![event])?)?;
//! client.shutdown()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod auth;
pub mod channel;
pub mod config;
pub mod status;
pub mod stream;

pub use auth::BearerAuth;
pub use channel::{GrpcChannel, GrpcConnector};
pub use config::{Builder, Config, DEFAULT_HOST, DEFAULT_PORT, builder};
pub use stream::GrpcStream;

/// A client talking to an UmaDB server over gRPC.
pub type Client = umadb_core::Client<GrpcConnector>;
