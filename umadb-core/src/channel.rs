//! The RPC seam between the client core and a transport.
//!
//! A [`Channel`] executes the three calls of the `umadb.v1.DCB` service on
//! wire messages and reports failures as raw [`Failure`]s; the client turns
//! those into domain errors. A [`Connector`] opens a channel and is where
//! transport bootstrap (sockets, TLS, credentials) lives.
//!
//! [`inmemory`] provides a reference channel backed by process memory for
//! tests and examples.

use std::time::Duration;

use crate::{
    error::{Error, Failure},
    wire,
};

pub mod inmemory;

/// Transport executing calls against a store.
///
/// All methods block the calling thread until the call completes. The
/// stream returned by [`read`](Self::read) blocks on each pull; dropping it
/// must cancel the underlying call.
// ANCHOR: channel_trait
pub trait Channel: Send + Sync {
    /// Lazy sequence of response batches for one read call.
    type Stream: Iterator<Item = Result<wire::ReadResponse, Failure>> + Send;

    /// Append a batch of events.
    ///
    /// # Errors
    ///
    /// Returns the call's [`Failure`] if the server rejects the append or the
    /// transport fails.
    fn append(&self, request: wire::AppendRequest) -> Result<wire::AppendResponse, Failure>;

    /// Start a read or subscription.
    ///
    /// # Errors
    ///
    /// Returns the call's [`Failure`] if the call cannot be started.
    fn read(&self, request: wire::ReadRequest) -> Result<Self::Stream, Failure>;

    /// Fetch the store's head position.
    ///
    /// # Errors
    ///
    /// Returns the call's [`Failure`] if the server or transport fails.
    fn head(&self) -> Result<wire::HeadResponse, Failure>;

    /// Drain and close the transport, waiting at most `timeout`.
    ///
    /// The channel is consumed whether or not the drain completes in time.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if the drain timed out or was interrupted.
    fn shutdown(self, timeout: Duration) -> Result<(), Failure>
    where
        Self: Sized;
}

/// Opens [`Channel`]s.
pub trait Connector {
    type Channel: Channel;

    /// Open a channel to the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the transport cannot be set up.
    fn connect(&self) -> Result<Self::Channel, Error>;
}
// ANCHOR_END: channel_trait
