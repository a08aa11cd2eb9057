//! Connection lifecycle and the blocking client API.
//!
//! [`Client`] is a three-state machine: `Unconnected → Connected → Shutdown`.
//! [`connect`](Client::connect) and [`shutdown`](Client::shutdown) are
//! idempotent and take `&mut self`, so lifecycle changes cannot race with
//! each other or with in-flight calls. Data operations take `&self` and may
//! be issued from several threads at once through a shared reference.

use std::time::Duration;

use crate::{
    channel::{Channel, Connector},
    error::{Error, Result},
    request::{AppendRequest, AppendResponse, ReadRequest},
    stream::ReadStream,
    wire,
};

/// Upper bound on how long [`Client::shutdown`] waits for the transport to
/// drain.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Stream type returned by [`Client::read`].
pub type ClientStream<C> = ReadStream<<<C as Connector>::Channel as Channel>::Stream>;

enum State<Ch> {
    Unconnected,
    Connected(Ch),
    Shutdown,
}

/// Blocking client for a DCB event store.
///
/// # Example
///
/// ```
/// use umadb_core::{
///     AppendCondition, AppendRequest, Client, Event, Query, QueryItem, ReadRequest,
///     channel::inmemory,
/// };
///
/// let mut client = Client::new(inmemory::Store::new());
/// client.connect()?;
///
/// let boundary = Query::of(QueryItem::of(["course-created"], ["course:42"]));
/// let head = client.head()?.unwrap_or(0);
/// let event = Event::tagged("course-created", "course:42", r#"{"capacity":30}"#)?;
/// let condition = AppendCondition::fail_if_exists_after(boundary.clone(), head.try_into()?)?;
/// client.append(&AppendRequest::new(vec![event])?.with_condition(condition))?;
///
/// let found = client.read(&ReadRequest::of(boundary))?.events().count();
/// assert_eq!(found, 1);
///
/// client.shutdown()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Client<C: Connector> {
    connector: C,
    state: State<C::Channel>,
}

impl<C: Connector> Client<C> {
    /// A client that will open its channel through `connector`.
    ///
    /// No connection is made until [`connect`](Self::connect) is called.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            state: State::Unconnected,
        }
    }

    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        matches!(self.state, State::Shutdown)
    }

    /// Open the channel. Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the transport cannot be set up.
    ///
    /// # Panics
    ///
    /// Panics if the client has already been shut down.
    #[tracing::instrument(skip(self))]
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            State::Connected(_) => return Ok(()),
            State::Shutdown => panic!("cannot connect a client that has been shut down"),
            State::Unconnected => {}
        }
        let channel = self.connector.connect()?;
        self.state = State::Connected(channel);
        tracing::debug!("client connected");
        Ok(())
    }

    fn channel(&self) -> &C::Channel {
        match &self.state {
            State::Connected(channel) => channel,
            State::Unconnected => panic!("client is not connected: call connect() first"),
            State::Shutdown => panic!("client has been shut down"),
        }
    }

    /// Append a batch of events, honouring its condition if any.
    ///
    /// The call is not retried. A violated condition fails the whole batch
    /// with [`Error::Integrity`].
    ///
    /// # Errors
    ///
    /// Returns the resolved domain error if the server or transport fails.
    ///
    /// # Panics
    ///
    /// Panics if the client is not connected.
    #[tracing::instrument(
        skip_all,
        fields(
            events_len = request.events().len(),
            conditional = request.condition().is_some(),
        )
    )]
    pub fn append(&self, request: &AppendRequest) -> Result<AppendResponse> {
        let response = self
            .channel()
            .append(wire::AppendRequest::from(request))
            .map_err(Error::from_failure)?;
        tracing::debug!(position = response.position, "events appended");
        Ok(response.into())
    }

    /// Start a read or subscription.
    ///
    /// Nothing beyond the first batch is fetched until the returned stream is
    /// pulled. Drop the stream to cancel the call.
    ///
    /// # Errors
    ///
    /// Returns the resolved domain error if the call cannot be started.
    /// Failures after the first batch are yielded by the stream.
    ///
    /// # Panics
    ///
    /// Panics if the client is not connected.
    #[tracing::instrument(
        skip_all,
        fields(
            start = ?request.start(),
            backwards = ?request.is_backwards(),
            subscribe = ?request.is_subscription(),
        )
    )]
    pub fn read(&self, request: &ReadRequest) -> Result<ClientStream<C>> {
        let stream = self
            .channel()
            .read(wire::ReadRequest::from(request))
            .map_err(Error::from_failure)?;
        Ok(ReadStream::new(stream))
    }

    /// Position of the most recently appended event, or `None` for an empty
    /// store.
    ///
    /// # Errors
    ///
    /// Returns the resolved domain error if the server or transport fails.
    ///
    /// # Panics
    ///
    /// Panics if the client is not connected.
    #[tracing::instrument(skip(self))]
    pub fn head(&self) -> Result<Option<u64>> {
        let response = self.channel().head().map_err(Error::from_failure)?;
        Ok(response.position)
    }

    /// Drain and close the channel, waiting at most [`SHUTDOWN_TIMEOUT`].
    ///
    /// Idempotent. The client is shut down when this returns, even if the
    /// drain failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the drain timed out or was interrupted.
    #[tracing::instrument(skip(self))]
    pub fn shutdown(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Shutdown) {
            State::Connected(channel) => {
                channel.shutdown(SHUTDOWN_TIMEOUT).map_err(|failure| {
                    tracing::warn!(%failure, "channel did not shut down cleanly");
                    Error::Internal(format!("shutdown interrupted: {}", failure.message))
                })?;
                tracing::debug!("client shut down");
            }
            State::Unconnected => tracing::debug!("client shut down before connecting"),
            State::Shutdown => {}
        }
        Ok(())
    }
}

impl<C: Connector> Drop for Client<C> {
    fn drop(&mut self) {
        if let State::Connected(channel) = std::mem::replace(&mut self.state, State::Shutdown)
            && let Err(failure) = channel.shutdown(SHUTDOWN_TIMEOUT)
        {
            tracing::warn!(%failure, "channel did not shut down cleanly on drop");
        }
    }
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Unconnected => "unconnected",
            State::Connected(_) => "connected",
            State::Shutdown => "shutdown",
        };
        f.debug_struct("Client")
            .field("connector", &self.connector)
            .field("state", &state)
            .finish()
    }
}
