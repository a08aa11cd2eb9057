//! Blocking, lazily-pulled read results.

use crate::{
    error::{Error, Failure, Result},
    event::SequencedEvent,
    request::ReadResponse,
    wire,
};

/// The batches of one read or subscription, pulled one at a time.
///
/// Each call to [`next`](Iterator::next) blocks until the server sends the
/// next batch, the stream ends, or the call fails. After an error or the
/// natural end, the stream yields `None` forever.
///
/// Dropping the stream cancels the underlying call. For a subscription this is
/// the only way to stop it.
pub struct ReadStream<S> {
    inner: Option<S>,
}

impl<S> ReadStream<S>
where
    S: Iterator<Item = std::result::Result<wire::ReadResponse, Failure>>,
{
    pub(crate) const fn new(inner: S) -> Self {
        Self { inner: Some(inner) }
    }

    /// Flatten the batches into individual events.
    ///
    /// Empty batches are skipped. An error is yielded in place and ends the
    /// iteration.
    pub fn events(self) -> Events<S> {
        Events {
            batches: self,
            current: Vec::new().into_iter(),
        }
    }

    fn finish(&mut self) {
        if self.inner.take().is_some() {
            tracing::trace!("read stream finished");
        }
    }
}

impl<S> Iterator for ReadStream<S>
where
    S: Iterator<Item = std::result::Result<wire::ReadResponse, Failure>>,
{
    type Item = Result<ReadResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.as_mut()?.next();
        match next {
            None => {
                self.finish();
                None
            }
            Some(Err(failure)) => {
                tracing::debug!(%failure, "read stream failed");
                self.finish();
                Some(Err(Error::from_failure(failure)))
            }
            Some(Ok(batch)) => match ReadResponse::try_from(batch) {
                Ok(batch) => {
                    tracing::trace!(
                        events = batch.events.len(),
                        head = ?batch.head,
                        "received read batch"
                    );
                    Some(Ok(batch))
                }
                Err(error) => {
                    self.finish();
                    Some(Err(error))
                }
            },
        }
    }
}

impl<S> std::iter::FusedIterator for ReadStream<S> where
    S: Iterator<Item = std::result::Result<wire::ReadResponse, Failure>>
{
}

impl<S> Drop for ReadStream<S> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::trace!("read stream dropped before completion");
        }
    }
}

impl<S> std::fmt::Debug for ReadStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadStream")
            .field("finished", &self.inner.is_none())
            .finish()
    }
}

/// Event-by-event view of a [`ReadStream`].
pub struct Events<S> {
    batches: ReadStream<S>,
    current: std::vec::IntoIter<SequencedEvent>,
}

impl<S> Iterator for Events<S>
where
    S: Iterator<Item = std::result::Result<wire::ReadResponse, Failure>>,
{
    type Item = Result<SequencedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.current.next() {
                return Some(Ok(event));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.events.into_iter(),
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

impl<S> std::iter::FusedIterator for Events<S> where
    S: Iterator<Item = std::result::Result<wire::ReadResponse, Failure>>
{
}
