use std::{collections::HashMap, sync::Arc};

use futures_util::future::join_all;
use tokio::{
    sync::{RwLock, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{Dispatcher, HandlerRegistry};
use crate::{
    Channels, Config, EmitChannel, Error, EventName, Handler, ReceiveChannel, Result,
};

/// Everything owned by one registered event.
struct EventEntry {
    name: EventName,
    registry: Arc<HandlerRegistry>,
    channels: Channels,
    cancel: CancellationToken,
    done: JoinHandle<()>,
}

impl EventEntry {
    /// Create the channel pair and spawn the event's dispatch loop.
    fn open(name: EventName, config: &Config) -> Self {
        let (emit_tx, emit_rx) = mpsc::channel(config.emit_channel_capacity());
        let (result_tx, result_rx) = mpsc::channel(config.receive_channel_capacity());
        let registry = Arc::new(HandlerRegistry::new());
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher::new(
            name.clone(),
            emit_rx,
            registry.clone(),
            result_tx,
            cancel.clone(),
            config.invocation_timeout(),
        );
        let done = tokio::spawn(dispatcher.run());

        tracing::debug!(event = %name, "event opened");

        Self {
            channels: Channels {
                emit: EmitChannel::new(name.clone(), emit_tx),
                receive: ReceiveChannel::new(name.clone(), result_rx),
            },
            name,
            registry,
            cancel,
            done,
        }
    }

    /// Stop the loop, wait until it drained, then drop the handlers.
    ///
    /// Batches accepted before the stop are still dispatched against the
    /// handlers registered at that point.
    async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.done.await {
            tracing::error!(event = %self.name, error = %e, "dispatch loop failed");
        }
        self.registry.clear().await;
        tracing::debug!(event = %self.name, "event closed");
    }
}

/// Name-keyed table of registered events. Sole owner of every event.
pub(crate) struct EventTable {
    config: Config,
    events: RwLock<HashMap<EventName, EventEntry>>,
}

impl EventTable {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open `name` if absent, then append `handlers` to its registry.
    pub async fn register(&self, name: EventName, handlers: Vec<Handler>) -> Channels {
        let mut events = self.events.write().await;
        let entry = events
            .entry(name.clone())
            .or_insert_with(|| EventEntry::open(name, &self.config));

        let added = handlers.len();
        entry.registry.add(handlers).await;
        tracing::debug!(event = %entry.name, added, "handlers registered");

        entry.channels.clone()
    }

    pub async fn unregister<'a>(
        &self,
        name: &str,
        handlers: impl IntoIterator<Item = &'a Handler>,
    ) -> Result<()> {
        let registry = self.entry_registry(name).await?;
        for handler in handlers {
            let removed = registry.remove(handler).await;
            tracing::debug!(event = name, handler = handler.name(), removed, "handler unregistered");
        }
        Ok(())
    }

    /// Remove `name` from the table first, then drain it. Concurrent lookups
    /// fail with `EventNotFound` as soon as the entry is gone.
    pub async fn unregister_event(&self, name: &str) -> Result<()> {
        let entry = self
            .events
            .write()
            .await
            .remove(name)
            .ok_or_else(|| Error::EventNotFound(name.into()))?;
        entry.close().await;
        Ok(())
    }

    pub async fn channels(&self, name: &str) -> Result<Channels> {
        self.events
            .read()
            .await
            .get(name)
            .map(|entry| entry.channels.clone())
            .ok_or_else(|| Error::EventNotFound(name.into()))
    }

    /// Registered names in ascending order.
    pub async fn names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self.events.read().await.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Close every event concurrently and wait for all of them to drain.
    pub async fn close_all(&self) {
        let entries: Vec<EventEntry> = self
            .events
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        if entries.is_empty() {
            return;
        }
        tracing::debug!(events = entries.len(), "closing all events");
        join_all(entries.into_iter().map(EventEntry::close)).await;
    }

    async fn entry_registry(&self, name: &str) -> Result<Arc<HandlerRegistry>> {
        self.events
            .read()
            .await
            .get(name)
            .map(|entry| entry.registry.clone())
            .ok_or_else(|| Error::EventNotFound(name.into()))
    }
}

impl Drop for EventTable {
    fn drop(&mut self) {
        // Loops keep draining in the background; nobody awaits them.
        for entry in self.events.get_mut().values() {
            entry.cancel.cancel();
        }
    }
}
