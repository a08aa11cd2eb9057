//! Core types and client lifecycle for the UmaDB event store.
//!
//! UmaDB stores events in a single totally ordered log and guards appends
//! with a *dynamic consistency boundary*: a query plus a position, meaning
//! "reject this append if anything matching the query was written after the
//! position I read up to".
//!
//! This crate is transport-agnostic:
//!
//! - [`event`] - Events and their stored form (`Event`, `SequencedEvent`)
//! - [`query`] - The matching language (`Query`, `QueryItem`)
//! - [`condition`] - Optimistic-concurrency preconditions (`AppendCondition`)
//! - [`request`] - Request and response values for append, read and head
//! - [`error`] - The closed error taxonomy and failure translation
//! - [`wire`] - Protobuf messages of the `umadb.v1` package
//! - [`channel`] - The RPC seam (`Channel`, `Connector`) and an in-memory store
//! - [`stream`] - Lazily-pulled read results (`ReadStream`)
//! - [`client`] - The blocking `Client` and its lifecycle
//!
//! # Example
//!
//! ```
//! use umadb_core::{AppendRequest, Client, Event, ReadRequest, channel::inmemory};
//!
//! let mut client = Client::new(inmemory::Store::new());
//! client.connect()?;
//! client.append(&AppendRequest::new(vec![Event::tagged("joined", "user:7", "")?])?)?;
//!
//! for batch in client.read(&ReadRequest::all())? {
//!     println!("{} events, head {:?}", batch?.events.len(), client.head()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Most users should depend on the [`umadb`](https://docs.rs/umadb) crate,
//! which adds the gRPC transport.

pub mod channel;
pub mod client;
pub mod condition;
pub mod error;
pub mod event;
pub mod query;
pub mod request;
pub mod stream;
pub mod wire;

pub use channel::{Channel, Connector};
pub use client::{Client, ClientStream, SHUTDOWN_TIMEOUT};
pub use condition::AppendCondition;
pub use error::{Code, Error, ErrorKind, Failure, InvalidArgument, Result};
pub use event::{Event, SequencedEvent};
pub use query::{Query, QueryItem};
pub use request::{AppendRequest, AppendResponse, ReadRequest, ReadResponse};
pub use stream::{Events, ReadStream};
