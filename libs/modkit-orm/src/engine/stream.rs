use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::Result;

/// Forward-only stream of entities produced by [`Database::range`](crate::Database::range).
///
/// Rows are populated one at a time as the stream is polled. Dropping the stream stops the
/// producer.
#[must_use = "streams do nothing unless polled"]
pub struct EntityStream<E> {
    inner: ReceiverStream<Result<E>>,
}

impl<E> EntityStream<E> {
    pub(crate) fn new(rx: mpsc::Receiver<Result<E>>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }
}

impl<E> std::fmt::Debug for EntityStream<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStream").finish_non_exhaustive()
    }
}

impl<E> Stream for EntityStream<E> {
    type Item = Result<E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
