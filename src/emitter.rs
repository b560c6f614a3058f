use std::sync::Arc;

use crate::{Candidate, Channels, Config, Error, EventName, Handler, Result, internal::EventTable};

/// Registers handlers under event names and hands out each event's channel pair.
///
/// # Lifecycle
///
/// - [`register(name, handlers)`](Self::register) opens the event on first use,
///   spawning its dispatch loop, and appends handlers on every call.
/// - [`unregister(name, handlers)`](Self::unregister) detaches handlers by identity.
/// - [`unregister_event(name)`](Self::unregister_event) drains and closes one event.
/// - [`shutdown()`](Self::shutdown) does the same for every event.
///
/// `Emitter` is a cheap cloneable handle; clones share the same events.
/// Dropping the last handle stops every dispatch loop without waiting for it.
///
/// ```rust
/// use chanemit::{args, Emitter, Handler};
///
/// # #[tokio::main(flavor = "multi_thread")]
/// # async fn main() -> chanemit::Result {
/// let emitter = Emitter::default();
/// let channels = emitter.register("add", [Handler::new(|a: i32, b: i32| a + b)]).await?;
///
/// channels.emit.emit(args![2, 3]).await?;
/// let result = channels.receive.recv().await.expect("one result");
/// assert_eq!(result.value::<i32>(0), Some(&5));
///
/// emitter.unregister_event("add").await
/// # }
/// ```
///
/// See also: [`Handler`], [`Channels`], [`Config`].
#[derive(Clone)]
pub struct Emitter {
    table: Arc<EventTable>,
}

impl Emitter {
    /// Create an emitter with the given runtime configuration.
    pub fn new(config: Config) -> Self {
        Self {
            table: Arc::new(EventTable::new(config)),
        }
    }

    pub fn config(&self) -> &Config {
        self.table.config()
    }

    /// Open `event` if it does not exist yet and attach `handlers` to it.
    ///
    /// Re-registering an existing name keeps its channels and appends the
    /// new handlers; handlers registered later take part in every batch
    /// dispatched afterwards. An empty `handlers` list only opens the event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandler`] listing the positions of inputs that
    /// are not handlers (a [`Value`](crate::Value) not holding a [`Handler`]).
    /// The valid inputs are registered regardless, and the event is usable:
    /// the error carries its pair, see [`Error::into_channels`].
    pub async fn register<N, I>(&self, event: N, handlers: I) -> Result<Channels>
    where
        N: Into<EventName>,
        I: IntoIterator,
        I::Item: Into<Candidate>,
    {
        let event = event.into();
        let mut valid = Vec::new();
        let mut positions = Vec::new();

        for (position, candidate) in handlers.into_iter().enumerate() {
            match candidate.into().into_handler() {
                Some(handler) => valid.push(handler),
                None => {
                    tracing::warn!(event = %event, position, "rejected non-handler input");
                    positions.push(position);
                }
            }
        }

        let channels = self.table.register(event.clone(), valid).await;

        if positions.is_empty() {
            Ok(channels)
        } else {
            Err(Error::InvalidHandler {
                event,
                positions,
                channels,
            })
        }
    }

    /// Open `event` without attaching handlers. Every batch emitted before a
    /// handler is registered yields the zero-match sentinel.
    pub async fn open(&self, event: impl Into<EventName>) -> Channels {
        self.table.register(event.into(), Vec::new()).await
    }

    /// Detach each of `handlers` from `event`, every occurrence of it.
    /// Handlers that were never attached are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if `event` is not registered.
    pub async fn unregister<'a, I>(&self, event: impl AsRef<str>, handlers: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Handler>,
    {
        self.table.unregister(event.as_ref(), handlers).await
    }

    /// Close `event` and wait until every in-flight invocation delivered.
    ///
    /// The name disappears from the emitter immediately; afterwards emits on
    /// its [`EmitChannel`](crate::EmitChannel) fail and its
    /// [`ReceiveChannel`](crate::ReceiveChannel) yields the remaining results
    /// and then `None`.
    ///
    /// Batches accepted before the call are still dispatched to the handlers
    /// registered at that moment; the handlers are detached only afterwards.
    ///
    /// If nobody reads the receive channel and more results are pending than
    /// [`Config::receive_channel_capacity`] allows, this waits for a reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if `event` is not registered.
    pub async fn unregister_event(&self, event: impl AsRef<str>) -> Result<()> {
        self.table.unregister_event(event.as_ref()).await
    }

    /// The channel pair of an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if `event` is not registered.
    pub async fn channels(&self, event: impl AsRef<str>) -> Result<Channels> {
        self.table.channels(event.as_ref()).await
    }

    /// Names of all registered events, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRegistry`] when no event is registered; see
    /// [`Error::is_empty_registry`].
    pub async fn list_events(&self) -> Result<Vec<String>> {
        let names = self.table.names().await;
        if names.is_empty() {
            return Err(Error::EmptyRegistry);
        }
        Ok(names.iter().map(|name| name.as_str().to_owned()).collect())
    }

    /// Unregister every event, draining them concurrently.
    pub async fn shutdown(&self) {
        self.table.close_all().await;
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        time::Duration,
    };

    use super::*;
    use crate::{BatchId, Fault, InvocationResult, ReceiveChannel, Value, Values, args};

    const WAIT: Duration = Duration::from_secs(5);

    async fn recv(rx: &ReceiveChannel) -> InvocationResult {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("result within timeout")
            .expect("receive channel open")
    }

    async fn recv_n(rx: &ReceiveChannel, n: usize) -> Vec<InvocationResult> {
        let mut results = Vec::with_capacity(n);
        for _ in 0..n {
            results.push(recv(rx).await);
        }
        results
    }

    fn names(results: &[InvocationResult]) -> HashSet<String> {
        results.iter().map(|r| r.handler_name().to_owned()).collect()
    }

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn labelled(name: &str) -> Handler {
        Handler::new(|n: i32| n).with_name(name)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn register_is_idempotent_per_name() {
        let emitter = Emitter::default();
        emitter.register("EVENT", [labelled("a")]).await.unwrap();
        emitter.register("EVENT", [labelled("b")]).await.unwrap();

        assert_eq!(emitter.list_events().await.unwrap(), ["EVENT"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn handlers_accumulate_across_registrations() {
        let emitter = Emitter::default();
        let channels = emitter.register("EVENT", [labelled("a")]).await.unwrap();

        channels.emit.emit(args![1]).await.unwrap();
        assert_eq!(names(&recv_n(&channels.receive, 1).await), set(&["a"]));

        let again = emitter.register("EVENT", [labelled("b")]).await.unwrap();
        again.emit.emit(args![2]).await.unwrap();
        assert_eq!(
            names(&recv_n(&channels.receive, 2).await),
            set(&["a", "b"])
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn late_handler_activates_on_open_event() {
        let emitter = Emitter::default();
        let channels = emitter.open("EVENT").await;

        channels.emit.emit(args![1]).await.unwrap();
        assert!(recv(&channels.receive).await.is_unmatched());

        emitter.register("EVENT", [labelled("late")]).await.unwrap();
        channels.emit.emit(args![2]).await.unwrap();
        let r = recv(&channels.receive).await;
        assert_eq!(r.handler_name(), "late");
        assert_eq!(r.value::<i32>(0), Some(&2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn registry_churn_during_dispatch() {
        const BATCHES: usize = 200;

        let emitter = Emitter::default();
        let channels = emitter.register("EVENT", [labelled("stable")]).await.unwrap();
        let churn = labelled("churn");

        let emitting = async {
            for i in 0..BATCHES {
                channels.emit.emit(args![i as i32]).await.unwrap();
            }
        };
        let churning = async {
            for _ in 0..BATCHES {
                emitter.register("EVENT", [&churn]).await.unwrap();
                tokio::task::yield_now().await;
                emitter.unregister("EVENT", [&churn]).await.unwrap();
            }
        };
        let reading = async {
            let mut seen: HashMap<BatchId, (usize, usize, bool)> = HashMap::new();
            let mut complete = 0;
            while complete < BATCHES {
                let r = recv(&channels.receive).await;
                let entry = seen.entry(r.batch()).or_insert((0, r.fan_out(), false));
                entry.0 += 1;
                entry.2 |= r.handler_name() == "stable";
                assert_eq!(entry.1, r.fan_out());
                if entry.0 == entry.1 {
                    complete += 1;
                }
            }
            seen
        };

        let ((), (), seen) = tokio::join!(emitting, churning, reading);
        assert_eq!(seen.len(), BATCHES);
        assert!(seen.values().all(|(count, fan_out, stable)| {
            *stable && count == fan_out && (1..=2).contains(fan_out)
        }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_is_type_exact() {
        let emitter = Emitter::default();
        let channels = emitter.register("EVENT", [labelled("int")]).await.unwrap();

        channels.emit.emit(args![1]).await.unwrap();
        assert_eq!(recv(&channels.receive).await.handler_name(), "int");

        for batch in [args![String::from("1")], args![1, 2], args![1_i64]] {
            channels.emit.emit(batch).await.unwrap();
            assert!(recv(&channels.receive).await.is_unmatched());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn variadic_handlers_take_spread_tails() {
        let emitter = Emitter::default();
        let sum = Handler::variadic(|xs: Vec<i32>| xs.iter().sum::<i32>()).with_name("sum");
        let channels = emitter.register("EVENT", [sum]).await.unwrap();

        channels.emit.emit(args![1, 2, 3]).await.unwrap();
        assert_eq!(recv(&channels.receive).await.value::<i32>(0), Some(&6));

        channels.emit.emit(args![]).await.unwrap();
        assert_eq!(recv(&channels.receive).await.value::<i32>(0), Some(&0));

        channels.emit.emit(args![vec![1, 2]]).await.unwrap();
        assert!(recv(&channels.receive).await.is_unmatched());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_match_yields_single_sentinel() {
        let emitter = Emitter::default();
        let channels = emitter.open("EVENT").await;

        channels.emit.emit(args![1]).await.unwrap();
        let r = recv(&channels.receive).await;
        assert!(r.is_unmatched());
        assert_eq!(r.handler_name(), "");
        assert!(r.values().is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(channels.receive.try_recv().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unregister_by_identity() {
        let emitter = Emitter::default();
        let h = labelled("h");
        let other = labelled("other");
        let channels = emitter
            .register("EVENT", [&h, &other, &h])
            .await
            .unwrap();

        emitter.unregister("EVENT", [&h.clone()]).await.unwrap();
        channels.emit.emit(args![1]).await.unwrap();
        let results = recv_n(&channels.receive, 1).await;
        assert_eq!(names(&results), set(&["other"]));
        assert_eq!(results[0].fan_out(), 1);

        // Unknown handlers are ignored, unknown events are not.
        emitter.unregister("EVENT", [&labelled("never")]).await.unwrap();
        assert_eq!(
            emitter.unregister("MISSING", [&h]).await,
            Err(Error::EventNotFound("MISSING".into()))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn teardown_drains_in_flight_invocations() {
        let emitter = Emitter::default();
        let slow = Handler::new(|n: i32| {
            std::thread::sleep(Duration::from_millis(100));
            n
        });
        let channels = emitter.register("EVENT", [slow]).await.unwrap();

        channels.emit.emit(args![1]).await.unwrap();
        channels.emit.emit(args![2]).await.unwrap();
        tokio::time::timeout(WAIT, emitter.unregister_event("EVENT"))
            .await
            .unwrap()
            .unwrap();

        let mut values: Vec<i32> = recv_n(&channels.receive, 2)
            .await
            .iter()
            .filter_map(|r| r.value::<i32>(0).copied())
            .collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2]);
        assert!(channels.receive.recv().await.is_none());

        assert_eq!(emitter.list_events().await, Err(Error::EmptyRegistry));
        assert_eq!(
            emitter.channels("EVENT").await.unwrap_err(),
            Error::EventNotFound("EVENT".into())
        );
        assert_eq!(
            channels.emit.emit(args![3]).await,
            Err(Error::EventClosed("EVENT".into()))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn events_run_independently() {
        let emitter = Emitter::default();
        let a = emitter
            .register("A", [Handler::new(|n: i32| format!("a{n}"))])
            .await
            .unwrap();
        let b = emitter
            .register("B", [Handler::new(|n: i32| format!("b{n}"))])
            .await
            .unwrap();

        let (ra, rb) = tokio::join!(
            async {
                for i in 0..10 {
                    a.emit.emit(args![i]).await.unwrap();
                }
                recv_n(&a.receive, 10).await
            },
            async {
                for i in 0..10 {
                    b.emit.emit(args![i]).await.unwrap();
                }
                recv_n(&b.receive, 10).await
            },
        );

        assert!(ra.iter().all(|r| r.value::<String>(0).is_some_and(|s| s.starts_with('a'))));
        assert!(rb.iter().all(|r| r.value::<String>(0).is_some_and(|s| s.starts_with('b'))));
        assert_eq!(emitter.list_events().await.unwrap(), ["A", "B"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn return_values_round_trip() {
        let emitter = Emitter::default();
        let channels = emitter
            .register(
                "EVENT",
                [
                    Handler::new(|n: i32| n).with_name("echo"),
                    Handler::new(|n: i32| Values::from(vec![Value::new(n), Value::new(n * 2)]))
                        .with_name("pair"),
                    Handler::new(|_: i32| {}).with_name("unit"),
                ],
            )
            .await
            .unwrap();

        channels.emit.emit(args![21]).await.unwrap();
        let mut results = recv_n(&channels.receive, 3).await;
        results.sort_by(|a, b| a.handler_name().cmp(b.handler_name()));

        assert_eq!(results[0].handler_name(), "echo");
        assert_eq!(results[0].values().len(), 1);
        assert_eq!(results[0].value::<i32>(0), Some(&21));
        assert_eq!(results[1].value::<i32>(1), Some(&42));
        assert!(results[2].values().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panics_are_contained() {
        let emitter = Emitter::default();
        let channels = emitter
            .register(
                "EVENT",
                [
                    Handler::new(|_: i32| -> i32 { panic!("bad handler") }).with_name("bad"),
                    labelled("good"),
                ],
            )
            .await
            .unwrap();

        channels.emit.emit(args![5]).await.unwrap();
        let results = recv_n(&channels.receive, 2).await;
        let bad = results.iter().find(|r| r.handler_name() == "bad").unwrap();
        let good = results.iter().find(|r| r.handler_name() == "good").unwrap();
        assert_eq!(
            bad.fault(),
            Some(&Fault::Panicked {
                message: "bad handler".into()
            })
        );
        assert_eq!(good.value::<i32>(0), Some(&5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeouts_are_reported() {
        let emitter = Emitter::new(Config::default().with_invocation_timeout(Duration::from_millis(20)));
        let channels = emitter
            .register(
                "EVENT",
                [
                    Handler::new(|| std::thread::sleep(Duration::from_millis(300))).with_name("slow"),
                    Handler::new(|| 1_u8).with_name("fast"),
                ],
            )
            .await
            .unwrap();

        channels.emit.emit(args![]).await.unwrap();
        let results = recv_n(&channels.receive, 2).await;
        let slow = results.iter().find(|r| r.handler_name() == "slow").unwrap();
        let fast = results.iter().find(|r| r.handler_name() == "fast").unwrap();
        assert!(matches!(slow.fault(), Some(Fault::TimedOut { .. })));
        assert_eq!(fast.value::<u8>(0), Some(&1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn results_carry_batch_id_and_fan_out() {
        let emitter = Emitter::default();
        let channels = emitter
            .register("EVENT", [labelled("a"), labelled("b"), labelled("c")])
            .await
            .unwrap();

        let first = channels.emit.emit(args![1]).await.unwrap();
        let second = channels.emit.emit(args![2]).await.unwrap();
        assert_ne!(first, second);

        let results = recv_n(&channels.receive, 6).await;
        for batch in [first, second] {
            let of_batch: Vec<_> = results.iter().filter(|r| r.batch() == batch).collect();
            assert_eq!(of_batch.len(), 3);
            assert!(of_batch.iter().all(|r| r.fan_out() == 3));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_inputs_are_reported_but_valid_ones_register() {
        let emitter = Emitter::default();
        let candidates: Vec<Candidate> = vec![
            Value::new(1_i32).into(),
            Value::new(2_i32).into(),
            labelled("valid").into(),
            Value::new(labelled("wrapped")).into(),
        ];

        let err = emitter.register("EVENT", candidates).await.unwrap_err();
        let Error::InvalidHandler {
            event, positions, ..
        } = &err
        else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(event.as_str(), "EVENT");
        assert_eq!(positions, &[0, 1]);
        let message = err.to_string();
        assert!(message.contains("argument 0 is not a handler"));
        assert!(message.contains("argument 1 is not a handler"));

        // The pair comes with the error and is the event's own pair.
        let channels = err.into_channels().unwrap();
        assert_eq!(emitter.channels("EVENT").await.unwrap(), channels);

        channels.emit.emit(args![3]).await.unwrap();
        assert_eq!(
            names(&recv_n(&channels.receive, 2).await),
            set(&["valid", "wrapped"])
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn partial_registration_pair_outlives_concurrent_teardown() {
        let emitter = Emitter::default();
        let other = emitter.clone();

        let channels = emitter
            .register("EVENT", [Candidate::from(Value::new(1_i32)), labelled("h").into()])
            .await
            .unwrap_err()
            .into_channels()
            .unwrap();

        other.unregister_event("EVENT").await.unwrap();
        assert!(emitter.channels("EVENT").await.is_err());

        // The caller still observes the event it created, now closed.
        assert_eq!(
            channels.emit.emit(args![1]).await,
            Err(Error::EventClosed("EVENT".into()))
        );
        assert!(tokio::time::timeout(WAIT, channels.receive.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_registry_and_missing_event() {
        let emitter = Emitter::default();
        let err = emitter.list_events().await.unwrap_err();
        assert!(err.is_empty_registry());
        assert_eq!(
            emitter.unregister_event("EVENT").await,
            Err(Error::EventNotFound("EVENT".into()))
        );
        assert!(emitter.channels("EVENT").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_closes_every_event() {
        let emitter = Emitter::default();
        let a = emitter.open("A").await;
        let b = emitter.register("B", [labelled("b")]).await.unwrap();
        b.emit.emit(args![1]).await.unwrap();

        tokio::time::timeout(WAIT, emitter.shutdown())
            .await
            .unwrap();

        assert!(emitter.list_events().await.unwrap_err().is_empty_registry());
        assert!(a.receive.recv().await.is_none());
        assert_eq!(recv(&b.receive).await.value::<i32>(0), Some(&1));
        assert!(b.receive.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn receive_stream_yields_until_closed() {
        use futures_util::StreamExt;

        let emitter = Emitter::default();
        let channels = emitter.register("EVENT", [labelled("a")]).await.unwrap();
        let stream = channels.receive.stream();

        for i in 0..3 {
            channels.emit.emit(args![i]).await.unwrap();
        }
        emitter.unregister_event("EVENT").await.unwrap();

        let collected: Vec<_> = tokio::time::timeout(WAIT, stream.collect::<Vec<_>>())
            .await
            .unwrap();
        assert_eq!(collected.len(), 3);
    }
}
