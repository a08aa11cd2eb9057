//! Request and response values for the three store operations.

use nonempty::NonEmpty;

use crate::{
    condition::AppendCondition,
    error::InvalidArgument,
    event::{Event, SequencedEvent},
    query::Query,
};

/// A batch of events to append, optionally guarded by a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRequest {
    events: NonEmpty<Event>,
    condition: Option<AppendCondition>,
}

impl AppendRequest {
    /// An unconditional append of `events`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `events` is empty.
    pub fn new(events: Vec<Event>) -> Result<Self, InvalidArgument> {
        let events = NonEmpty::from_vec(events)
            .ok_or_else(|| InvalidArgument::new("events must not be empty"))?;
        Ok(Self::from_events(events))
    }

    #[must_use]
    pub const fn from_events(events: NonEmpty<Event>) -> Self {
        Self {
            events,
            condition: None,
        }
    }

    /// The same batch guarded by `condition`.
    #[must_use]
    pub fn with_condition(self, condition: AppendCondition) -> Self {
        Self {
            condition: Some(condition),
            ..self
        }
    }

    #[must_use]
    pub const fn events(&self) -> &NonEmpty<Event> {
        &self.events
    }

    #[must_use]
    pub const fn condition(&self) -> Option<&AppendCondition> {
        self.condition.as_ref()
    }

    pub(crate) fn into_parts(self) -> (NonEmpty<Event>, Option<AppendCondition>) {
        (self.events, self.condition)
    }
}

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppendResponse {
    /// Position assigned to the last event of the batch.
    pub position: u64,
}

/// Parameters of a read or subscription.
///
/// Every field is optional; an absent field is sent as absent, never as its
/// zero value. `start` is inclusive: forward reads yield positions `>= start`
/// and backwards reads yield positions `<= start`.
///
/// Combining [`backwards`](Self::backwards) with [`subscribe`](Self::subscribe)
/// is not checked here. The server rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadRequest {
    query: Option<Query>,
    start: Option<u64>,
    backwards: Option<bool>,
    limit: Option<u32>,
    subscribe: Option<bool>,
    batch_size: Option<u32>,
}

impl ReadRequest {
    /// Read every event in the store, oldest first.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            query: None,
            start: None,
            backwards: Some(false),
            limit: None,
            subscribe: Some(false),
            batch_size: None,
        }
    }

    /// Read events matching `query`, oldest first.
    #[must_use]
    pub fn of(query: Query) -> Self {
        Self {
            query: Some(query),
            ..Self::all()
        }
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `start` is negative.
    pub fn with_start(self, start: i64) -> Result<Self, InvalidArgument> {
        let start = u64::try_from(start)
            .map_err(|_| InvalidArgument::new(format!("start must be >= 0, got {start}")))?;
        Ok(Self {
            start: Some(start),
            ..self
        })
    }

    #[must_use]
    pub fn with_direction(self, backwards: bool) -> Self {
        Self {
            backwards: Some(backwards),
            ..self
        }
    }

    /// Read newest first.
    #[must_use]
    pub fn backwards(self) -> Self {
        self.with_direction(true)
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `limit` is zero.
    pub fn with_limit(self, limit: u32) -> Result<Self, InvalidArgument> {
        if limit == 0 {
            return Err(InvalidArgument::new("limit must be > 0"));
        }
        Ok(Self {
            limit: Some(limit),
            ..self
        })
    }

    /// Keep the stream open and deliver newly appended matching events after
    /// the historical ones.
    #[must_use]
    pub fn subscribe(self) -> Self {
        Self {
            subscribe: Some(true),
            ..self
        }
    }

    /// Hint for how many events the server should put in each batch.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `batch_size` is zero.
    pub fn with_batch_size(self, batch_size: u32) -> Result<Self, InvalidArgument> {
        if batch_size == 0 {
            return Err(InvalidArgument::new("batch size must be > 0"));
        }
        Ok(Self {
            batch_size: Some(batch_size),
            ..self
        })
    }

    #[must_use]
    pub const fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    #[must_use]
    pub const fn start(&self) -> Option<u64> {
        self.start
    }

    #[must_use]
    pub const fn is_backwards(&self) -> Option<bool> {
        self.backwards
    }

    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    #[must_use]
    pub const fn is_subscription(&self) -> Option<bool> {
        self.subscribe
    }

    #[must_use]
    pub const fn batch_size(&self) -> Option<u32> {
        self.batch_size
    }

    pub(crate) const fn from_parts(
        query: Option<Query>,
        start: Option<u64>,
        backwards: Option<bool>,
        limit: Option<u32>,
        subscribe: Option<bool>,
        batch_size: Option<u32>,
    ) -> Self {
        Self {
            query,
            start,
            backwards,
            limit,
            subscribe,
            batch_size,
        }
    }
}

/// One batch of a read or subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadResponse {
    pub events: Vec<SequencedEvent>,
    /// Store head when the batch was produced, if the server reported it.
    pub head: Option<u64>,
}

impl ReadResponse {
    /// Position of the last event in this batch.
    #[must_use]
    pub fn last_position(&self) -> Option<u64> {
        self.events.last().map(|e| e.position)
    }
}
