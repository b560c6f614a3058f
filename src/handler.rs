use std::{
    any::type_name,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{Fault, HandlerFn, Signature, Value, VariadicFn};

static HANDLER_SEQ: AtomicU64 = AtomicU64::new(1);

type Invoke = dyn Fn(&[Value]) -> Result<Vec<Value>, Fault> + Send + Sync;

/// Identity of a [`Handler`].
///
/// Assigned once at construction and shared by every clone, so a clone can
/// be used to unregister the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(HANDLER_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A named callable attached to one or more events.
///
/// Built from a typed closure or `fn` item; the closure's parameter types
/// become the handler's [`Signature`], its return value the result values.
///
/// ```
/// use chanemit::{args, Handler};
///
/// let double = Handler::new(|n: i32| n * 2);
/// assert!(double.matches(&args![21]));
/// assert!(!double.matches(&args![21_i64]));
///
/// // Variadic: the trailing `Vec<T>` collects zero or more `T`s.
/// let sum = Handler::variadic(|xs: Vec<i32>| xs.iter().sum::<i32>()).with_name("sum");
/// assert!(sum.matches(&args![1, 2, 3]));
/// assert_eq!(sum.name(), "sum");
/// ```
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    name: Arc<str>,
    signature: Arc<Signature>,
    invoke: Arc<Invoke>,
}

impl Handler {
    /// Wraps a callable with a fixed parameter list.
    pub fn new<F, A>(f: F) -> Self
    where
        F: HandlerFn<A>,
        A: 'static,
    {
        Self::from_parts(
            type_name::<F>(),
            F::signature(),
            Arc::new(move |args: &[Value]| f.invoke(args)),
        )
    }

    /// Wraps a callable whose last parameter is a `Vec<T>` variadic tail.
    pub fn variadic<F, A>(f: F) -> Self
    where
        F: VariadicFn<A>,
        A: 'static,
    {
        Self::from_parts(
            type_name::<F>(),
            F::signature(),
            Arc::new(move |args: &[Value]| f.invoke(args)),
        )
    }

    fn from_parts(name: &str, signature: Signature, invoke: Arc<Invoke>) -> Self {
        Self {
            id: HandlerId::next(),
            name: Arc::from(name),
            signature: Arc::new(signature),
            invoke,
        }
    }

    /// Replaces the derived label. Identity is unchanged.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    #[inline]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Best-effort label; derived from the callable's type unless set with
    /// [`with_name`](Self::with_name).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn matches(&self, args: &[Value]) -> bool {
        self.signature.matches(args)
    }

    /// Calls the handler synchronously. Panics are not caught here.
    pub(crate) fn call(&self, args: &[Value]) -> Result<Vec<Value>, Fault> {
        (self.invoke)(args)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// One input to [`Emitter::register`](crate::Emitter::register).
///
/// Registration accepts arbitrary values so that non-callables can be
/// reported individually. A [`Value`] counts as a handler only when it
/// holds a [`Handler`].
#[derive(Debug, Clone)]
pub enum Candidate {
    Handler(Handler),
    Value(Value),
}

impl Candidate {
    pub(crate) fn into_handler(self) -> Option<Handler> {
        match self {
            Candidate::Handler(handler) => Some(handler),
            Candidate::Value(value) => value.downcast_ref::<Handler>().cloned(),
        }
    }
}

impl From<Handler> for Candidate {
    fn from(handler: Handler) -> Self {
        Candidate::Handler(handler)
    }
}

impl From<&Handler> for Candidate {
    fn from(handler: &Handler) -> Self {
        Candidate::Handler(handler.clone())
    }
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        Candidate::Value(value)
    }
}
