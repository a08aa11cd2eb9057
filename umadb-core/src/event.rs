//! Immutable event values.
//!
//! An [`Event`] is what a caller appends; a [`SequencedEvent`] is what the
//! store hands back, pinned to the position it was assigned.

use bytes::Bytes;
use nonempty::NonEmpty;
use uuid::Uuid;

use crate::error::InvalidArgument;

/// A single event: a type, one or more tags, and an opaque payload.
///
/// `id` is optional. Events built with [`Event::new`] get a random id so that
/// retried appends can be recognised by the server; an event decoded from a
/// response without an id keeps `None`, which is distinct from the nil UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: String,
    tags: NonEmpty<String>,
    data: Bytes,
    id: Option<Uuid>,
}

impl Event {
    /// Create an event with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `kind` is blank or `tags` is empty.
    pub fn new<T>(
        kind: impl Into<String>,
        tags: impl IntoIterator<Item = T>,
        data: impl Into<Bytes>,
    ) -> Result<Self, InvalidArgument>
    where
        T: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        let tags = NonEmpty::from_vec(tags)
            .ok_or_else(|| InvalidArgument::new("tags must not be empty"))?;
        Self::from_parts(kind.into(), tags, data.into(), Some(Uuid::new_v4()))
    }

    /// Create an event carrying a single tag.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `kind` is blank.
    pub fn tagged(
        kind: impl Into<String>,
        tag: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<Self, InvalidArgument> {
        Self::new(kind, [tag.into()], data)
    }

    pub(crate) fn from_parts(
        kind: String,
        tags: NonEmpty<String>,
        data: Bytes,
        id: Option<Uuid>,
    ) -> Result<Self, InvalidArgument> {
        if kind.trim().is_empty() {
            return Err(InvalidArgument::new("event type must not be blank"));
        }
        Ok(Self {
            kind,
            tags,
            data,
            id,
        })
    }

    /// The same event with `id` replaced.
    #[must_use]
    pub fn with_id(self, id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// The same event without an id, leaving assignment to the server.
    #[must_use]
    pub fn without_id(self) -> Self {
        Self { id: None, ..self }
    }

    /// The event type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub const fn tags(&self) -> &NonEmpty<String> {
        &self.tags
    }

    /// Whether `tag` is among this event's tags.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }
}

/// An event together with the position the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent {
    pub position: u64,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_random_id() {
        let a = Event::tagged("order-placed", "order:1", "{}").unwrap();
        let b = Event::tagged("order-placed", "order:1", "{}").unwrap();

        assert!(a.id().is_some());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn blank_kind_is_rejected() {
        let error = Event::tagged("  ", "order:1", "{}").unwrap_err();
        assert!(error.message().contains("type"));
    }

    #[test]
    fn empty_tags_are_rejected() {
        let error = Event::new("order-placed", Vec::<String>::new(), "{}").unwrap_err();
        assert!(error.message().contains("tags"));
    }

    #[test]
    fn duplicate_tags_are_kept_in_order() {
        let event = Event::new("e", ["b", "a", "b"], Bytes::new()).unwrap();
        let tags: Vec<&str> = event.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, ["b", "a", "b"]);
    }

    #[test]
    fn with_id_and_without_id_return_new_values() {
        let id = Uuid::new_v4();
        let event = Event::tagged("e", "t", "x").unwrap();

        let identified = event.clone().with_id(id);
        let anonymous = event.clone().without_id();

        assert_eq!(identified.id(), Some(id));
        assert_eq!(anonymous.id(), None);
        assert_eq!(identified.kind(), event.kind());
        assert_eq!(anonymous.data(), event.data());
    }

    #[test]
    fn has_tag_checks_membership() {
        let event = Event::new("e", ["a", "b"], "").unwrap();
        assert!(event.has_tag("a"));
        assert!(!event.has_tag("c"));
    }
}
