//! Response body stream handed to the HTTP transport.

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::dispatcher::Dispatcher;
use crate::topic::TopicKey;

use super::{Sink, SinkId};

/// Frames queued for one sink.
///
/// Ends when the sink is closed by the relay. Dropping it (the client
/// went away) tears the sink down.
pub struct SinkStream {
    frames: BoxStream<'static, Result<Bytes, Infallible>>,
    sink: Arc<Sink>,
    dispatcher: Dispatcher,
}

impl SinkStream {
    pub(crate) fn new(
        sink: Arc<Sink>,
        receiver: mpsc::Receiver<Bytes>,
        dispatcher: Dispatcher,
    ) -> Self {
        let closed = sink.cancellation().clone();
        let frames = stream::unfold((receiver, closed), |(mut receiver, closed)| async move {
            tokio::select! {
                biased;
                frame = receiver.recv() => frame.map(|f| (Ok(f), (receiver, closed))),
                _ = closed.cancelled() => None,
            }
        })
        .boxed();

        Self {
            frames,
            sink,
            dispatcher,
        }
    }

    /// Identifier of the underlying sink.
    pub fn sink_id(&self) -> SinkId {
        self.sink.id()
    }

    /// Topic the stream is subscribed to.
    pub fn topic(&self) -> &TopicKey {
        self.sink.topic()
    }
}

impl Stream for SinkStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames.poll_next_unpin(cx)
    }
}

impl Drop for SinkStream {
    fn drop(&mut self) {
        self.dispatcher.teardown(&self.sink);
    }
}

impl fmt::Debug for SinkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkStream")
            .field("sink_id", &self.sink.id())
            .field("topic", self.sink.topic())
            .finish()
    }
}
