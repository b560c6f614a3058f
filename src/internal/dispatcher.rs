use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    sync::mpsc,
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use super::HandlerRegistry;
use crate::{
    Args, BatchId, EventName, Fault, Handler, InvocationResult, Outcome, Value,
    channels::Submission,
};

/// Everything a batch task needs; cloned once per accepted batch.
#[derive(Clone)]
struct BatchContext {
    event: EventName,
    registry: Arc<HandlerRegistry>,
    results: mpsc::Sender<InvocationResult>,
    timeout: Option<Duration>,
}

/// Per-event dispatch loop.
///
/// Pulls batches from the event's intake, spawns one task per batch, and
/// inside it one task per matching handler. On cancellation it stops
/// accepting, dispatches what was already buffered, waits for every batch
/// and returns. Its join handle is the event's done signal; the receive
/// channel closes once this loop and all invocation tasks dropped their
/// result senders.
pub(crate) struct Dispatcher {
    intake: mpsc::Receiver<Submission>,
    cancel: CancellationToken,
    ctx: BatchContext,
}

impl Dispatcher {
    pub fn new(
        event: EventName,
        intake: mpsc::Receiver<Submission>,
        registry: Arc<HandlerRegistry>,
        results: mpsc::Sender<InvocationResult>,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            intake,
            cancel,
            ctx: BatchContext {
                event,
                registry,
                results,
                timeout,
            },
        }
    }

    pub async fn run(mut self) {
        let mut batches = JoinSet::new();

        loop {
            select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(res) = batches.join_next() => self.reap(res),
                maybe = self.intake.recv() => {
                    let Some(submission) = maybe else {
                        break;
                    };
                    self.spawn_batch(&mut batches, submission);
                }
            }
        }

        // Refuse new batches but dispatch everything already accepted.
        self.intake.close();
        while let Some(submission) = self.intake.recv().await {
            self.spawn_batch(&mut batches, submission);
        }
        while let Some(res) = batches.join_next().await {
            self.reap(res);
        }

        tracing::debug!(event = %self.ctx.event, "dispatch loop drained");
    }

    fn spawn_batch(&self, batches: &mut JoinSet<()>, (batch, args): Submission) {
        tracing::trace!(event = %self.ctx.event, batch = %batch, args = args.len(), "batch accepted");
        batches.spawn(dispatch_batch(self.ctx.clone(), batch, args));
    }

    fn reap(&self, res: Result<(), JoinError>) {
        if let Err(e) = res {
            tracing::error!(event = %self.ctx.event, error = %e, "batch task failed");
        }
    }
}

async fn dispatch_batch(ctx: BatchContext, batch: BatchId, args: Args) {
    let snapshot = ctx.registry.snapshot().await;
    let args: Arc<[Value]> = Arc::from(args.into_values());

    let matched: Vec<Handler> = snapshot
        .iter()
        .filter(|h| h.matches(&args))
        .cloned()
        .collect();

    if matched.is_empty() {
        tracing::trace!(event = %ctx.event, batch = %batch, "no handler matched");
        deliver(&ctx, InvocationResult::unmatched(batch)).await;
        return;
    }

    let fan_out = matched.len();
    let mut invocations = JoinSet::new();
    for handler in matched {
        invocations.spawn(invoke(ctx.clone(), handler, args.clone(), batch, fan_out));
    }
    while let Some(res) = invocations.join_next().await {
        if let Err(e) = res {
            tracing::error!(event = %ctx.event, batch = %batch, error = %e, "invocation task failed");
        }
    }
}

async fn invoke(
    ctx: BatchContext,
    handler: Handler,
    args: Arc<[Value]>,
    batch: BatchId,
    fan_out: usize,
) {
    let name = handler.shared_name();
    let call = tokio::task::spawn_blocking(move || handler.call(&args));

    let joined = match ctx.timeout {
        Some(after) => match tokio::time::timeout(after, call).await {
            Ok(joined) => joined,
            // The blocking body keeps running detached; nothing waits on it.
            Err(_) => Ok(Err(Fault::TimedOut { after })),
        },
        None => call.await,
    };

    let outcome = match joined {
        Ok(Ok(values)) => Outcome::Returned(values),
        Ok(Err(fault)) => Outcome::Faulted(fault),
        Err(e) if e.is_panic() => Outcome::Faulted(Fault::from_panic(e.into_panic())),
        Err(e) => Outcome::Faulted(Fault::Panicked {
            message: e.to_string(),
        }),
    };

    match &outcome {
        Outcome::Faulted(fault) => tracing::warn!(
            event = %ctx.event,
            batch = %batch,
            handler = %name,
            fault = fault.as_label(),
            error = %fault,
            "handler invocation faulted"
        ),
        Outcome::Returned(values) => tracing::trace!(
            event = %ctx.event,
            batch = %batch,
            handler = %name,
            values = values.len(),
            "handler returned"
        ),
    }

    deliver(&ctx, InvocationResult::new(name, batch, fan_out, outcome)).await;
}

async fn deliver(ctx: &BatchContext, result: InvocationResult) {
    if ctx.results.send(result).await.is_err() {
        tracing::trace!(event = %ctx.event, "receive side dropped, result discarded");
    }
}
