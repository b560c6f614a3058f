use std::time::Duration;

use crate::{Channels, EventName};

/// The single error type for all emitter operations.
///
/// Every fallible facade API returns `chanemit::Result<T>` (alias for
/// `Result<T, chanemit::Error>`). Faults raised while a handler runs are not
/// errors of the facade; they travel on the receive channel as [`Fault`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Some inputs passed to [`Emitter::register`](crate::Emitter::register)
    /// were not handlers. The valid ones were registered anyway, and
    /// `channels` is the event's pair, as the successful call would return.
    #[error("emitter: {event}: {}", describe_positions(.positions))]
    InvalidHandler {
        event: EventName,
        positions: Vec<usize>,
        channels: Channels,
    },

    #[error("emitter: {0} is not registered")]
    EventNotFound(EventName),

    #[error("emitter: there are no registered events")]
    EmptyRegistry,

    #[error("emitter: {0} is closed")]
    EventClosed(EventName),
}

impl Error {
    /// `true` for [`Error::EmptyRegistry`], which callers usually treat as
    /// "zero events" rather than a failure.
    pub fn is_empty_registry(&self) -> bool {
        matches!(self, Error::EmptyRegistry)
    }

    /// The event's channel pair carried by [`Error::InvalidHandler`].
    pub fn channels(&self) -> Option<&Channels> {
        match self {
            Error::InvalidHandler { channels, .. } => Some(channels),
            _ => None,
        }
    }

    /// Like [`channels`](Self::channels), consuming the error.
    pub fn into_channels(self) -> Option<Channels> {
        match self {
            Error::InvalidHandler { channels, .. } => Some(channels),
            _ => None,
        }
    }
}

fn describe_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|i| format!("argument {i} is not a handler and was not registered"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single handler invocation produced no return values.
///
/// A fault is contained to its own invocation: sibling invocations of the
/// same batch, other batches and other events keep running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("handler panicked: {message}")]
    Panicked { message: String },

    #[error("handler timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("argument {position}: expected {expected}, found {found}")]
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },
}

impl Fault {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::Panicked { .. } => "handler_panicked",
            Fault::TimedOut { .. } => "handler_timed_out",
            Fault::ArgumentMismatch { .. } => "argument_mismatch",
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Fault::Panicked { message }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{EmitChannel, ReceiveChannel};

    fn channels() -> Channels {
        let (emit_tx, _) = mpsc::channel(1);
        let (_, result_rx) = mpsc::channel(1);
        Channels {
            emit: EmitChannel::new(EventName::new("EVENT"), emit_tx),
            receive: ReceiveChannel::new(EventName::new("EVENT"), result_rx),
        }
    }

    #[test]
    fn invalid_handler_lists_every_position() {
        let pair = channels();
        let err = Error::InvalidHandler {
            event: EventName::new("EVENT"),
            positions: vec![0, 2],
            channels: pair.clone(),
        };
        assert_eq!(err.channels(), Some(&pair));
        assert_eq!(err.clone().into_channels(), Some(pair));
        assert_eq!(Error::EmptyRegistry.channels(), None);

        let msg = err.to_string();
        assert!(msg.contains("EVENT"));
        assert!(msg.contains("argument 0 is not a handler"));
        assert!(msg.contains("argument 2 is not a handler"));
        assert!(!msg.contains("argument 1"));
    }

    #[test]
    fn empty_registry_is_soft() {
        assert!(Error::EmptyRegistry.is_empty_registry());
        assert!(!Error::EventNotFound(EventName::new("x")).is_empty_registry());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let fault = Fault::from_panic(Box::new("boom"));
        assert_eq!(
            fault,
            Fault::Panicked {
                message: "boom".into()
            }
        );

        let fault = Fault::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(fault.to_string(), "handler panicked: owned boom");

        let fault = Fault::from_panic(Box::new(7_u8));
        assert_eq!(fault.as_label(), "handler_panicked");
    }
}
