use std::time::Duration;

/// Runtime configuration for an [`Emitter`](crate::Emitter).
///
/// Controls channel buffer sizes and the optional per-invocation timeout.
/// Use the builder methods to customize, or [`Default`] for defaults that
/// keep the emit side as close to an unbuffered hand-off as tokio allows.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use chanemit::Config;
///
/// let config = Config::default()
///     .with_emit_channel_capacity(16)
///     .with_receive_channel_capacity(256)
///     .with_invocation_timeout(Duration::from_secs(2));
///
/// assert_eq!(config.emit_channel_capacity(), 16);
/// assert_eq!(config.invocation_timeout(), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Batches buffered per event before `emit` waits for the dispatch loop.
    /// Default: 1
    emit_channel_capacity: usize,

    /// Results buffered per event before invocations wait for a reader.
    /// Default: 64
    receive_channel_capacity: usize,

    /// Upper bound for a single handler invocation. `None` waits forever.
    /// Default: None
    invocation_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            emit_channel_capacity: 1,
            receive_channel_capacity: 64,
            invocation_timeout: None,
        }
    }
}

impl Config {
    /// Set the per-event emit channel capacity. Clamped to at least 1.
    pub fn with_emit_channel_capacity(mut self, capacity: usize) -> Self {
        self.emit_channel_capacity = capacity;
        self
    }

    pub fn emit_channel_capacity(&self) -> usize {
        self.emit_channel_capacity.max(1)
    }

    /// Set the per-event receive channel capacity. Clamped to at least 1.
    ///
    /// When the receive channel is full, finished invocations wait for a
    /// reader, and so does [`Emitter::unregister_event`](crate::Emitter::unregister_event).
    pub fn with_receive_channel_capacity(mut self, capacity: usize) -> Self {
        self.receive_channel_capacity = capacity;
        self
    }

    pub fn receive_channel_capacity(&self) -> usize {
        self.receive_channel_capacity.max(1)
    }

    /// Bound every handler invocation. An invocation exceeding it is reported
    /// as [`Fault::TimedOut`](crate::Fault::TimedOut).
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    /// Remove the invocation timeout.
    pub fn without_invocation_timeout(mut self) -> Self {
        self.invocation_timeout = None;
        self
    }

    /// Returns the timeout; a zero duration counts as no timeout.
    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.invocation_timeout.filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_are_clamped() {
        let config = Config::default()
            .with_emit_channel_capacity(0)
            .with_receive_channel_capacity(0);
        assert_eq!(config.emit_channel_capacity(), 1);
        assert_eq!(config.receive_channel_capacity(), 1);
    }

    #[test]
    fn zero_timeout_means_none() {
        let config = Config::default().with_invocation_timeout(Duration::ZERO);
        assert_eq!(config.invocation_timeout(), None);

        let config = Config::default()
            .with_invocation_timeout(Duration::from_millis(5))
            .without_invocation_timeout();
        assert_eq!(config.invocation_timeout(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let config = Config::default().with_invocation_timeout(Duration::from_millis(250));
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
