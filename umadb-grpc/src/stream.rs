use tokio::runtime::Handle;
use tonic::Streaming;
use umadb_core::{Failure, wire};

use crate::status::into_failure;

/// Blocking view of a server-streaming `Read` call.
///
/// Each [`next`](Iterator::next) waits for one message. Dropping the stream
/// drops the underlying [`Streaming`], which resets the HTTP/2 stream and
/// cancels the call on the server.
pub struct GrpcStream {
    streaming: Option<Streaming<wire::ReadResponse>>,
    handle: Handle,
}

impl GrpcStream {
    pub(crate) const fn new(streaming: Streaming<wire::ReadResponse>, handle: Handle) -> Self {
        Self {
            streaming: Some(streaming),
            handle,
        }
    }
}

impl Iterator for GrpcStream {
    type Item = Result<wire::ReadResponse, Failure>;

    fn next(&mut self) -> Option<Self::Item> {
        let streaming = self.streaming.as_mut()?;
        match self.handle.block_on(streaming.message()) {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => {
                self.streaming = None;
                None
            }
            Err(status) => {
                self.streaming = None;
                Some(Err(into_failure(&status)))
            }
        }
    }
}

impl std::fmt::Debug for GrpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcStream")
            .field("open", &self.streaming.is_some())
            .finish()
    }
}
