//! Protobuf messages of the `umadb.v1` package and their conversions.
//!
//! The messages are written out with `prost` derives rather than generated at
//! build time; `proto/umadb.proto` is the source of truth for field numbers.
//! Proto3 `optional` is used wherever absence must stay distinguishable from
//! zero.
//!
//! Domain values convert into wire messages infallibly. Wire messages coming
//! back from the server are validated and convert with
//! [`Error::Serialization`] on malformed input.

use nonempty::NonEmpty;
use uuid::Uuid;

use crate::{
    condition::AppendCondition as DomainAppendCondition,
    error::Error,
    event::{Event as DomainEvent, SequencedEvent as DomainSequencedEvent},
    query::{Query as DomainQuery, QueryItem as DomainQueryItem},
    request,
};

/// Path of the unary append call.
pub const APPEND_PATH: &str = "/umadb.v1.DCB/Append";
/// Path of the server-streaming read call.
pub const READ_PATH: &str = "/umadb.v1.DCB/Read";
/// Path of the unary head call.
pub const HEAD_PATH: &str = "/umadb.v1.DCB/Head";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub event_type: String,
    #[prost(string, repeated, tag = "2")]
    pub tags: Vec<String>,
    #[prost(bytes = "bytes", tag = "3")]
    pub data: prost::bytes::Bytes,
    /// Empty when the event has no id.
    #[prost(string, tag = "4")]
    pub uuid: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SequencedEvent {
    #[prost(uint64, tag = "1")]
    pub position: u64,
    #[prost(message, optional, tag = "2")]
    pub event: Option<Event>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryItem {
    #[prost(string, repeated, tag = "1")]
    pub types: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub tags: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Query {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<QueryItem>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendCondition {
    #[prost(message, optional, tag = "1")]
    pub fail_if_events_match: Option<Query>,
    #[prost(uint64, optional, tag = "2")]
    pub after: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendRequest {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<Event>,
    #[prost(message, optional, tag = "2")]
    pub condition: Option<AppendCondition>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendResponse {
    #[prost(uint64, tag = "1")]
    pub position: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequest {
    #[prost(message, optional, tag = "1")]
    pub query: Option<Query>,
    #[prost(uint64, optional, tag = "2")]
    pub start: Option<u64>,
    #[prost(bool, optional, tag = "3")]
    pub backwards: Option<bool>,
    #[prost(uint32, optional, tag = "4")]
    pub limit: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub subscribe: Option<bool>,
    #[prost(uint32, optional, tag = "6")]
    pub batch_size: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadResponse {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<SequencedEvent>,
    #[prost(uint64, optional, tag = "2")]
    pub head: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct HeadRequest {}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct HeadResponse {
    /// Absent while the store is empty.
    #[prost(uint64, optional, tag = "1")]
    pub position: Option<u64>,
}

/// Kind declared by the server in a structured error payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ErrorType {
    Io = 0,
    Serialization = 1,
    Integrity = 2,
    Corruption = 3,
    Internal = 4,
    Authentication = 5,
}

/// Structured error payload carried in `grpc-status-details-bin`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ErrorResponse {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(enumeration = "ErrorType", tag = "2")]
    pub error_type: i32,
}

// ---------------------------------------------------------------------------
// domain -> wire
// ---------------------------------------------------------------------------

impl From<&DomainEvent> for Event {
    fn from(event: &DomainEvent) -> Self {
        Self {
            event_type: event.kind().to_string(),
            tags: event.tags().iter().cloned().collect(),
            data: event.data().clone(),
            uuid: event.id().map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

impl From<&DomainQueryItem> for QueryItem {
    fn from(item: &DomainQueryItem) -> Self {
        Self {
            types: item.types().to_vec(),
            tags: item.tags().to_vec(),
        }
    }
}

impl From<&DomainQuery> for Query {
    fn from(query: &DomainQuery) -> Self {
        Self {
            items: query.items().iter().map(QueryItem::from).collect(),
        }
    }
}

impl From<&DomainAppendCondition> for AppendCondition {
    fn from(condition: &DomainAppendCondition) -> Self {
        Self {
            fail_if_events_match: Some(condition.fail_if_events_match().into()),
            after: condition.after_position(),
        }
    }
}

impl From<&request::AppendRequest> for AppendRequest {
    fn from(request: &request::AppendRequest) -> Self {
        Self {
            events: request.events().iter().map(Event::from).collect(),
            condition: request.condition().map(AppendCondition::from),
        }
    }
}

impl From<&request::ReadRequest> for ReadRequest {
    fn from(request: &request::ReadRequest) -> Self {
        Self {
            query: request.query().map(Query::from),
            start: request.start(),
            backwards: request.is_backwards(),
            limit: request.limit(),
            subscribe: request.is_subscription(),
            batch_size: request.batch_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// wire -> domain
// ---------------------------------------------------------------------------

impl TryFrom<Event> for DomainEvent {
    type Error = Error;

    fn try_from(event: Event) -> Result<Self, Self::Error> {
        let tags = NonEmpty::from_vec(event.tags).ok_or_else(|| {
            Error::Serialization(format!("event `{}` has no tags", event.event_type))
        })?;
        let id = if event.uuid.trim().is_empty() {
            None
        } else {
            let id = Uuid::parse_str(&event.uuid).map_err(|e| {
                Error::Serialization(format!("invalid event uuid `{}`: {e}", event.uuid))
            })?;
            Some(id)
        };
        Self::from_parts(event.event_type, tags, event.data, id)
            .map_err(|e| Error::Serialization(e.message().to_string()))
    }
}

impl TryFrom<SequencedEvent> for DomainSequencedEvent {
    type Error = Error;

    fn try_from(sequenced: SequencedEvent) -> Result<Self, Self::Error> {
        let event = sequenced.event.ok_or_else(|| {
            Error::Serialization(format!(
                "sequenced event at position {} has no event",
                sequenced.position
            ))
        })?;
        Ok(Self {
            position: sequenced.position,
            event: event.try_into()?,
        })
    }
}

impl From<QueryItem> for DomainQueryItem {
    fn from(item: QueryItem) -> Self {
        Self::of(item.types, item.tags)
    }
}

impl From<Query> for DomainQuery {
    fn from(query: Query) -> Self {
        query.items.into_iter().map(DomainQueryItem::from).collect()
    }
}

impl From<AppendCondition> for DomainAppendCondition {
    fn from(condition: AppendCondition) -> Self {
        Self::from_parts(
            condition.fail_if_events_match.map(Into::into).unwrap_or_default(),
            condition.after,
        )
    }
}

impl TryFrom<AppendRequest> for request::AppendRequest {
    type Error = Error;

    fn try_from(request: AppendRequest) -> Result<Self, Self::Error> {
        let events = request
            .events
            .into_iter()
            .map(DomainEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let events = NonEmpty::from_vec(events)
            .ok_or_else(|| Error::Serialization("append request has no events".to_string()))?;
        let decoded = Self::from_events(events);
        Ok(match request.condition {
            Some(condition) => decoded.with_condition(condition.into()),
            None => decoded,
        })
    }
}

impl From<ReadRequest> for request::ReadRequest {
    fn from(request: ReadRequest) -> Self {
        Self::from_parts(
            request.query.map(Into::into),
            request.start,
            request.backwards,
            request.limit,
            request.subscribe,
            request.batch_size,
        )
    }
}

impl From<AppendResponse> for request::AppendResponse {
    fn from(response: AppendResponse) -> Self {
        Self {
            position: response.position,
        }
    }
}

impl TryFrom<ReadResponse> for request::ReadResponse {
    type Error = Error;

    fn try_from(response: ReadResponse) -> Result<Self, Self::Error> {
        let events = response
            .events
            .into_iter()
            .map(DomainSequencedEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            events,
            head: response.head,
        })
    }
}
