//! In-memory channel implementation for testing.
//!
//! [`Store`] keeps every appended event in process memory and answers the
//! three DCB calls the way a server would: append conditions are checked
//! atomically under one lock, live subscriptions block on a condition
//! variable until matching events arrive, and conflicts are reported with a
//! structured `INTEGRITY` payload on a `FAILED_PRECONDITION` status.
//!
//! # Example
//!
//! ```
//! use umadb_core::{AppendRequest, Client, Event, channel::inmemory};
//!
//! let mut client = Client::new(inmemory::Store::new());
//! client.connect()?;
//!
//! let event = Event::tagged("greeted", "user:1", "hello")?;
//! let response = client.append(&AppendRequest::new(vec![event])?)?;
//! assert_eq!(client.head()?, Some(response.position));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use nonempty::NonEmpty;

use crate::{
    channel,
    condition::AppendCondition,
    error::{Code, Error, Failure},
    event::{Event, SequencedEvent},
    query::Query,
    request, wire,
};

/// Batch size used when a read does not ask for one.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Shared in-memory event store.
///
/// Cloning is cheap; clones see the same events. Every call to
/// [`connect`](channel::Connector::connect) opens an independent
/// [`Connection`].
#[derive(Clone, Default)]
pub struct Store {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    appended: Condvar,
}

#[derive(Default)]
struct State {
    events: Vec<SequencedEvent>,
    injected: VecDeque<Failure>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event appended so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SequencedEvent> {
        self.shared.lock().events.clone()
    }

    /// Position of the most recent event.
    #[must_use]
    pub fn head(&self) -> Option<u64> {
        self.shared.lock().head()
    }

    /// Make the next call or stream pull on any connection fail with
    /// `failure`. Failures queue up and are consumed in order.
    pub fn fail_next(&self, failure: Failure) {
        self.shared.lock().injected.push_back(failure);
    }
}

impl channel::Connector for Store {
    type Channel = Connection;

    fn connect(&self) -> Result<Connection, Error> {
        tracing::debug!("opening in-memory connection");
        Ok(Connection {
            shared: Arc::clone(&self.shared),
            session: Arc::new(Session::default()),
        })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("in-memory store lock poisoned")
    }
}

impl State {
    fn head(&self) -> Option<u64> {
        self.events.last().map(|e| e.position)
    }

    fn take_injected(&mut self) -> Result<(), Failure> {
        self.injected.pop_front().map_or(Ok(()), Err)
    }

    /// Indices of stored events that fail `condition`.
    fn conflicts<'a>(
        &'a self,
        condition: &'a AppendCondition,
    ) -> impl Iterator<Item = usize> + 'a {
        let query = condition.fail_if_events_match();
        self.events
            .iter()
            .enumerate()
            .filter(move |(_, stored)| {
                condition.after_position().is_none_or(|after| stored.position > after)
                    && query.matches(&stored.event)
            })
            .map(|(index, _)| index)
    }

    /// Position of an earlier, identical append of `batch`.
    ///
    /// Only batches whose events all carry ids can be recognised, and only
    /// while the earlier append is the sole reason `condition` now fails.
    fn previously_appended(
        &self,
        batch: &NonEmpty<Event>,
        condition: &AppendCondition,
    ) -> Option<u64> {
        let first_id = batch.head.id()?;
        if batch.iter().any(|event| event.id().is_none()) {
            return None;
        }
        let start = self
            .events
            .iter()
            .position(|stored| stored.event.id() == Some(first_id))?;
        let run = start..start + batch.len();
        let stored = self.events.get(run.clone())?;
        let identical = stored
            .iter()
            .zip(batch.iter())
            .all(|(stored, event)| &stored.event == event);
        if !identical || self.conflicts(condition).any(|index| !run.contains(&index)) {
            return None;
        }
        stored.last().map(|stored| stored.position)
    }

    fn append(&mut self, batch: NonEmpty<Event>) -> u64 {
        let mut position = self.head().unwrap_or(0);
        for event in batch {
            position += 1;
            self.events.push(SequencedEvent { position, event });
        }
        position
    }
}

#[derive(Default)]
struct Session {
    closed: AtomicBool,
}

/// One client's connection to a [`Store`].
pub struct Connection {
    shared: Arc<Shared>,
    session: Arc<Session>,
}

impl Connection {
    fn check_open(&self) -> Result<(), Failure> {
        if self.session.closed.load(Ordering::Acquire) {
            return Err(Failure::new(Code::Unavailable, "connection is shut down"));
        }
        Ok(())
    }
}

fn integrity_failure(message: impl Into<String>) -> Failure {
    Failure::with_error_response(
        Code::FailedPrecondition,
        &wire::ErrorResponse {
            message: message.into(),
            error_type: wire::ErrorType::Integrity.into(),
        },
    )
}

fn invalid_request(error: &Error) -> Failure {
    Failure::with_error_response(
        Code::InvalidArgument,
        &wire::ErrorResponse {
            message: error.message().to_string(),
            error_type: wire::ErrorType::Serialization.into(),
        },
    )
}

impl channel::Channel for Connection {
    type Stream = Stream;

    #[tracing::instrument(skip_all, fields(events_len = request.events.len()))]
    fn append(&self, request: wire::AppendRequest) -> Result<wire::AppendResponse, Failure> {
        self.check_open()?;
        let request =
            request::AppendRequest::try_from(request).map_err(|e| invalid_request(&e))?;

        let mut state = self.shared.lock();
        state.take_injected()?;

        if let Some(condition) = request.condition()
            && state.conflicts(condition).next().is_some()
        {
            if let Some(position) = state.previously_appended(request.events(), condition) {
                tracing::debug!(position, "identical batch already appended");
                return Ok(wire::AppendResponse { position });
            }
            tracing::debug!(after = ?condition.after_position(), "append condition failed");
            return Err(integrity_failure(format!(
                "append condition failed: matching events exist after {}",
                condition
                    .after_position()
                    .map_or_else(|| "the start of the store".to_string(), |a| a.to_string())
            )));
        }

        let (events, _) = request.into_parts();
        let position = state.append(events);
        drop(state);
        self.shared.appended.notify_all();

        tracing::trace!(position, "events appended");
        Ok(wire::AppendResponse { position })
    }

    fn read(&self, request: wire::ReadRequest) -> Result<Stream, Failure> {
        self.check_open()?;
        self.shared.lock().take_injected()?;

        let request = request::ReadRequest::from(request);
        let backwards = request.is_backwards().unwrap_or(false);
        let subscribe = request.is_subscription().unwrap_or(false);
        if backwards && subscribe {
            return Err(Failure::new(
                Code::InvalidArgument,
                "cannot subscribe while reading backwards",
            ));
        }

        let cursor = match (backwards, request.start()) {
            (false, start) => Cursor::Forward(start.unwrap_or(0)),
            (true, start) => Cursor::Backward(start),
        };

        Ok(Stream {
            shared: Arc::clone(&self.shared),
            session: Arc::clone(&self.session),
            query: request.query().cloned().unwrap_or_default(),
            cursor,
            subscribe,
            remaining: request.limit().map(|limit| limit as usize),
            batch_size: request
                .batch_size()
                .map_or(DEFAULT_BATCH_SIZE, |size| size as usize),
            delivered: false,
            finished: false,
        })
    }

    fn head(&self) -> Result<wire::HeadResponse, Failure> {
        self.check_open()?;
        let mut state = self.shared.lock();
        state.take_injected()?;
        Ok(wire::HeadResponse {
            position: state.head(),
        })
    }

    fn shutdown(self, _timeout: Duration) -> Result<(), Failure> {
        {
            let _state = self.shared.lock();
            self.session.closed.store(true, Ordering::Release);
        }
        self.shared.appended.notify_all();
        tracing::debug!("in-memory connection closed");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Next position to consider, inclusive.
    Forward(u64),
    /// Highest position to consider, inclusive; `None` means the head.
    Backward(Option<u64>),
    Exhausted,
}

/// Server side of one read call.
pub struct Stream {
    shared: Arc<Shared>,
    session: Arc<Session>,
    query: Query,
    cursor: Cursor,
    subscribe: bool,
    remaining: Option<usize>,
    batch_size: usize,
    delivered: bool,
    finished: bool,
}

impl Stream {
    fn batch_limit(&self) -> usize {
        self.remaining
            .map_or(self.batch_size, |remaining| remaining.min(self.batch_size))
    }

    fn next_batch(&self, state: &State) -> Vec<SequencedEvent> {
        let limit = self.batch_limit();
        match self.cursor {
            Cursor::Forward(next) => {
                let from = state.events.partition_point(|e| e.position < next);
                state.events[from..]
                    .iter()
                    .filter(|e| self.query.matches(&e.event))
                    .take(limit)
                    .cloned()
                    .collect()
            }
            Cursor::Backward(upper) => {
                let to = upper.map_or(state.events.len(), |upper| {
                    state.events.partition_point(|e| e.position <= upper)
                });
                state.events[..to]
                    .iter()
                    .rev()
                    .filter(|e| self.query.matches(&e.event))
                    .take(limit)
                    .cloned()
                    .collect()
            }
            Cursor::Exhausted => Vec::new(),
        }
    }

    fn advance(&mut self, batch: &[SequencedEvent]) {
        let Some(last) = batch.last() else {
            return;
        };
        self.cursor = match self.cursor {
            Cursor::Forward(_) => Cursor::Forward(last.position + 1),
            Cursor::Backward(_) => last
                .position
                .checked_sub(1)
                .filter(|&p| p > 0)
                .map_or(Cursor::Exhausted, |p| Cursor::Backward(Some(p))),
            Cursor::Exhausted => Cursor::Exhausted,
        };
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= batch.len();
        }
        self.delivered = true;
    }

    fn pull(&mut self) -> Option<Result<wire::ReadResponse, Failure>> {
        if self.finished || self.remaining == Some(0) {
            return None;
        }

        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        loop {
            if self.session.closed.load(Ordering::Acquire) {
                self.finished = true;
                return Some(Err(Failure::new(
                    Code::Unavailable,
                    "connection closed while streaming",
                )));
            }
            if let Err(failure) = state.take_injected() {
                self.finished = true;
                return Some(Err(failure));
            }

            let batch = self.next_batch(&state);
            if !batch.is_empty() {
                self.advance(&batch);
                return Some(Ok(response(&batch, state.head())));
            }

            if !self.subscribe {
                self.finished = true;
                if self.delivered {
                    return None;
                }
                self.delivered = true;
                return Some(Ok(response(&[], state.head())));
            }

            state = shared
                .appended
                .wait(state)
                .expect("in-memory store lock poisoned");
        }
    }
}

fn response(batch: &[SequencedEvent], head: Option<u64>) -> wire::ReadResponse {
    wire::ReadResponse {
        events: batch
            .iter()
            .map(|e| wire::SequencedEvent {
                position: e.position,
                event: Some(wire::Event::from(&e.event)),
            })
            .collect(),
        head,
    }
}

impl Iterator for Stream {
    type Item = Result<wire::ReadResponse, Failure>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull()
    }
}
