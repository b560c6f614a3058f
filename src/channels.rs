use std::sync::Arc;

use futures_util::{Stream, stream};
use tokio::sync::{Mutex, mpsc};

use crate::{Args, BatchId, Error, EventName, InvocationResult, Result, batch_id::BatchSequence};

pub(crate) type Submission = (BatchId, Args);

/// Sending half of an event: submits argument batches to its dispatch loop.
///
/// Cheap to clone; every clone feeds the same event and draws batch ids from
/// the same sequence. Two handles are equal when they feed the same event
/// instance. `emit` waits while the
/// event's intake buffer is full (see
/// [`Config::with_emit_channel_capacity`](crate::Config::with_emit_channel_capacity)).
#[derive(Debug, Clone)]
pub struct EmitChannel {
    event: EventName,
    sender: mpsc::Sender<Submission>,
    sequence: Arc<BatchSequence>,
}

impl EmitChannel {
    pub(crate) fn new(event: EventName, sender: mpsc::Sender<Submission>) -> Self {
        Self {
            event,
            sender,
            sequence: Arc::new(BatchSequence::default()),
        }
    }

    /// Submit one batch. Returns the id stamped on every result it produces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventClosed`] once the event has been unregistered.
    pub async fn emit(&self, args: impl Into<Args>) -> Result<BatchId> {
        let id = self.sequence.next();
        self.sender
            .send((id, args.into()))
            .await
            .map_err(|_| Error::EventClosed(self.event.clone()))?;
        Ok(id)
    }

    pub fn event(&self) -> &EventName {
        &self.event
    }

    /// `true` once the event stopped accepting batches.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for EmitChannel {
    fn eq(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl Eq for EmitChannel {}

/// Receiving half of an event: yields one [`InvocationResult`] per matched
/// invocation plus one sentinel per batch that matched nothing.
///
/// Clones share one queue: each result is delivered to exactly one reader.
/// After the event is unregistered and every in-flight invocation has
/// delivered, `recv` returns `None`.
#[derive(Debug, Clone)]
pub struct ReceiveChannel {
    event: EventName,
    receiver: Arc<Mutex<mpsc::Receiver<InvocationResult>>>,
}

impl ReceiveChannel {
    pub(crate) fn new(event: EventName, receiver: mpsc::Receiver<InvocationResult>) -> Self {
        Self {
            event,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Wait for the next result. `None` once the event is closed and drained.
    pub async fn recv(&self) -> Option<InvocationResult> {
        self.receiver.lock().await.recv().await
    }

    /// Take a result if one is ready, without waiting.
    ///
    /// Also returns `None` while another clone is inside [`recv`](Self::recv).
    pub fn try_recv(&self) -> Option<InvocationResult> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }

    /// Adapts the channel into a [`Stream`] ending when the event is closed.
    pub fn stream(&self) -> impl Stream<Item = InvocationResult> + Send + 'static {
        stream::unfold(self.clone(), |rx| async move {
            let next = rx.recv().await?;
            Some((next, rx))
        })
    }

    pub fn event(&self) -> &EventName {
        &self.event
    }
}

impl PartialEq for ReceiveChannel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.receiver, &other.receiver)
    }
}

impl Eq for ReceiveChannel {}

/// The emit/receive pair of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub emit: EmitChannel,
    pub receive: ReceiveChannel,
}

impl Channels {
    pub fn into_parts(self) -> (EmitChannel, ReceiveChannel) {
        (self.emit, self.receive)
    }
}
