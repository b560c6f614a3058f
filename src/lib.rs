#![cfg_attr(docsrs, feature(doc_cfg))]
//! # chanemit
//!
//! A channel-based event emitter for Tokio.
//!
//! Register handlers under an event name and get back a pair of channels:
//! emit argument batches on one side, read one result per handler
//! invocation on the other. Each batch is matched against the event's
//! handlers by exact runtime type; every matching handler runs concurrently
//! and independently of the others.
//!
//! ## Quick Start
//!
//! ```rust
//! use chanemit::*;
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result {
//!     let emitter = Emitter::default();
//!
//!     let greet = Handler::new(|name: String| format!("Hello, {name}!")).with_name("greet");
//!     let count = Handler::new(|name: String| name.len()).with_name("count");
//!     let channels = emitter.register("hello", [greet, count]).await?;
//!
//!     channels.emit.emit(args![String::from("World")]).await?;
//!     for _ in 0..2 {
//!         if let Some(result) = channels.receive.recv().await {
//!             println!("{result}");
//!         }
//!     }
//!
//!     emitter.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Emitter`] | Registers handlers per event and owns every event's dispatch loop |
//! | [`Handler`] | Named callable built from a typed closure or `fn` item |
//! | [`Signature`] | Declared parameter types; decides which batches a handler accepts |
//! | [`Value`] / [`Args`] | Dynamically typed value and one emitted batch of them |
//! | [`Channels`] | The [`EmitChannel`] / [`ReceiveChannel`] pair of one event |
//! | [`InvocationResult`] | Return values or [`Fault`] of one invocation |
//! | [`Config`] | Channel capacities and the optional invocation timeout |
//!
//! ## Matching
//!
//! A batch is passed to a handler only when every argument has exactly the
//! declared type: no widening, no conversion. `args![1]` carries an `i32`
//! and does not reach a handler taking `i64`. Variadic handlers, built with
//! [`Handler::variadic`], take a trailing `Vec<T>` filled from zero or more
//! trailing `T` arguments.
//!
//! When no handler matches, the receive channel gets exactly one sentinel
//! result with an empty handler name, so a reader waiting for the batch
//! never blocks forever.
//!
//! ## Lifecycle
//!
//! Each event runs its own dispatch loop. [`Emitter::unregister_event`]
//! stops accepting batches, finishes every batch already accepted and
//! returns once all their results were delivered; the receive channel then
//! yields `None`.
//!
//! ## Features
//!
//! - **`serde`** - `Serialize`/`Deserialize` for [`Config`]

mod batch_id;
mod channels;
mod config;
mod emitter;
mod error;
mod event_name;
mod handler;
mod handler_fn;
mod invocation;
mod signature;
mod value;

mod internal;

pub use batch_id::BatchId;
pub use channels::{Channels, EmitChannel, ReceiveChannel};
pub use config::Config;
pub use emitter::Emitter;
pub use error::{Error, Fault};
pub use event_name::EventName;
pub use handler::{Candidate, Handler, HandlerId};
pub use handler_fn::{HandlerFn, VariadicFn};
pub use invocation::{InvocationResult, Outcome};
pub use signature::{Signature, VariadicTail};
pub use value::{Args, TypeTag, Value, Values};

/// Convenience alias for `Result<T, chanemit::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
