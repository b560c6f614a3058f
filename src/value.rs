use std::{
    any::{Any, TypeId},
    fmt, hash,
    ops::Deref,
    sync::Arc,
};

/// Runtime type of a [`Value`] or of a declared handler parameter.
///
/// Two tags are equal iff their `TypeId`s are equal; the name is carried for
/// diagnostics only.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    #[inline]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl hash::Hash for TypeTag {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One dynamically typed value travelling through the emitter.
///
/// Values are emitted as handler arguments and come back as handler return
/// values. Cloning is cheap: the payload is shared.
///
/// ```
/// use chanemit::Value;
///
/// let v = Value::new(42_i32);
/// assert!(v.is::<i32>());
/// assert_eq!(v.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(v.downcast_ref::<i64>(), None);
/// ```
#[derive(Clone)]
pub struct Value {
    tag: TypeTag,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Wraps an already boxed payload whose concrete type is `T`.
    pub(crate) fn from_boxed<T: Any>(boxed: Box<dyn Any + Send + Sync>) -> Self {
        debug_assert_eq!((*boxed).type_id(), TypeId::of::<T>());
        Self {
            tag: TypeTag::of::<T>(),
            inner: Arc::from(boxed),
        }
    }

    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.tag.id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.tag.name)
    }
}

/// One ordered batch of arguments submitted for a single emission.
///
/// Build one with the [`args!`](crate::args) macro or from any iterator of
/// [`Value`]s.
///
/// ```
/// use chanemit::{args, Args};
///
/// let batch: Args = args![1_i32, String::from("two")];
/// assert_eq!(batch.len(), 2);
/// assert!(batch[0].is::<i32>());
/// assert!(batch[1].is::<String>());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends one argument, builder style.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.0.push(Value::new(value));
        self
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for Args {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Several return values of one handler.
///
/// A handler returning `()` yields no values, a handler returning `Values`
/// yields each contained value, any other return type yields exactly one.
///
/// ```
/// use chanemit::{Handler, Value, Values};
///
/// let split = Handler::new(|n: i32| Values::from(vec![Value::new(n / 2), Value::new(n % 2)]));
/// # let _ = split;
/// ```
#[derive(Clone, Debug, Default)]
pub struct Values(pub Vec<Value>);

impl From<Vec<Value>> for Values {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Converts a typed handler return into the dynamic value sequence published
/// on the receive channel.
pub(crate) fn returned_values<R: Any + Send + Sync>(ret: R) -> Vec<Value> {
    let boxed: Box<dyn Any + Send + Sync> = Box::new(ret);
    if boxed.is::<()>() {
        return Vec::new();
    }
    match boxed.downcast::<Values>() {
        Ok(values) => values.0,
        Err(other) => vec![Value::from_boxed::<R>(other)],
    }
}

/// Builds an [`Args`] batch from a list of expressions.
///
/// Each expression becomes one [`Value`] with the expression's exact type:
/// `args![1]` carries an `i32`, `args![1_u8]` a `u8`.
#[macro_export]
macro_rules! args {
    () => { $crate::Args::new() };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::from(vec![$($crate::Value::new($arg)),+])
    };
}
