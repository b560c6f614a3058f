use std::{fmt, sync::Arc};

use crate::{BatchId, Fault, Value};

/// What one invocation produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The handler returned; its return values in order (empty for `()`).
    Returned(Vec<Value>),
    /// The handler panicked, timed out or could not accept the batch.
    Faulted(Fault),
}

/// One message on the receive channel.
///
/// Produced once per matched handler invocation, or once per batch as the
/// zero-match sentinel when no handler accepted the batch. The sentinel has
/// an empty handler name and no values.
///
/// `fan_out` is the number of results the batch produces in total (the
/// matched handler count, or 1 for the sentinel). Together with
/// [`batch`](Self::batch) it lets consumers detect when a batch is complete.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    handler: Arc<str>,
    batch: BatchId,
    fan_out: usize,
    outcome: Outcome,
}

impl InvocationResult {
    pub(crate) fn new(handler: Arc<str>, batch: BatchId, fan_out: usize, outcome: Outcome) -> Self {
        Self {
            handler,
            batch,
            fan_out,
            outcome,
        }
    }

    pub(crate) fn unmatched(batch: BatchId) -> Self {
        Self::new(Arc::from(""), batch, 1, Outcome::Returned(Vec::new()))
    }

    /// Name of the handler that produced this result; empty for the sentinel.
    #[inline]
    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    #[inline]
    pub fn batch(&self) -> BatchId {
        self.batch
    }

    #[inline]
    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    #[inline]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Return values of the handler; empty for the sentinel and for faults.
    pub fn values(&self) -> &[Value] {
        match &self.outcome {
            Outcome::Returned(values) => values,
            Outcome::Faulted(_) => &[],
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match &self.outcome {
            Outcome::Returned(_) => None,
            Outcome::Faulted(fault) => Some(fault),
        }
    }

    /// `true` for the zero-match sentinel.
    pub fn is_unmatched(&self) -> bool {
        self.handler.is_empty() && matches!(&self.outcome, Outcome::Returned(v) if v.is_empty())
    }

    /// Shorthand for downcasting the return value at `index`.
    pub fn value<T: std::any::Any>(&self, index: usize) -> Option<&T> {
        self.values().get(index).and_then(Value::downcast_ref::<T>)
    }
}

impl fmt::Display for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Returned(values) => {
                write!(f, "Func: {}, Returned values: {:?}", self.handler, values)
            }
            Outcome::Faulted(fault) => write!(f, "Func: {}, Fault: {}", self.handler, fault),
        }
    }
}
