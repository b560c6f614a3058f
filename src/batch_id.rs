use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Position of one emitted batch within its event.
///
/// Assigned by [`EmitChannel::emit`](crate::EmitChannel::emit) from a counter
/// shared by every clone of the event's emit channel, starting at 1, and
/// stamped on every [`InvocationResult`](crate::InvocationResult) the batch
/// produces. Consumers group results by it and order batches by it: a batch
/// whose `emit` started later has a larger id. An emit that fails with
/// [`Error::EventClosed`](crate::Error::EventClosed) still consumes its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(u64);

impl BatchId {
    pub(crate) fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

/// Per-event source of [`BatchId`]s.
#[derive(Debug, Default)]
pub(crate) struct BatchSequence(AtomicU64);

impl BatchSequence {
    pub fn next(&self) -> BatchId {
        BatchId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
