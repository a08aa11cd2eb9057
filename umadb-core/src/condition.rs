//! Optimistic-concurrency preconditions for appends.
//!
//! An [`AppendCondition`] says: "reject this append if any event matching the
//! query exists after position `after`". The client only encodes the
//! condition. Checking it is the server's job, and a violated condition comes
//! back as [`Error::Integrity`](crate::Error::Integrity). The whole batch is
//! rejected; nothing is partially appended.
//!
//! # Example
//!
//! ```
//! use umadb_core::{AppendCondition, Query, QueryItem};
//!
//! let boundary = Query::of(QueryItem::of(["course-created"], ["course:42"]));
//! let condition = AppendCondition::fail_if_exists_after(boundary, 17)?;
//! assert_eq!(condition.after_position(), Some(17));
//! # Ok::<(), umadb_core::InvalidArgument>(())
//! ```

use crate::{error::InvalidArgument, query::Query};

/// The consistency boundary attached to an append.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppendCondition {
    fail_if_events_match: Query,
    after: Option<u64>,
}

impl AppendCondition {
    /// Fail if any event in the whole store matches `query`.
    #[must_use]
    pub const fn fail_if_exists(query: Query) -> Self {
        Self {
            fail_if_events_match: query,
            after: None,
        }
    }

    /// Fail if any event after position `after` matches `query`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `after` is negative.
    pub fn fail_if_exists_after(query: Query, after: i64) -> Result<Self, InvalidArgument> {
        Ok(Self {
            fail_if_events_match: query,
            after: Some(non_negative(after)?),
        })
    }

    /// A new condition with the lower bound replaced.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `after` is negative.
    pub fn after(&self, after: i64) -> Result<Self, InvalidArgument> {
        Self::fail_if_exists_after(self.fail_if_events_match.clone(), after)
    }

    #[must_use]
    pub const fn fail_if_events_match(&self) -> &Query {
        &self.fail_if_events_match
    }

    /// The exclusive lower bound, or `None` to check the entire history.
    #[must_use]
    pub const fn after_position(&self) -> Option<u64> {
        self.after
    }

    pub(crate) const fn from_parts(fail_if_events_match: Query, after: Option<u64>) -> Self {
        Self {
            fail_if_events_match,
            after,
        }
    }
}

fn non_negative(after: i64) -> Result<u64, InvalidArgument> {
    u64::try_from(after).map_err(|_| InvalidArgument::new(format!("after must be >= 0, got {after}")))
}
