use std::any::Any;

use crate::{TypeTag, Value};

/// Declared variadic tail of a handler: `Vec<T>` collecting zero or more `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariadicTail {
    sequence: TypeTag,
    element: TypeTag,
}

impl VariadicTail {
    pub fn of<T: Any>() -> Self {
        Self {
            sequence: TypeTag::of::<Vec<T>>(),
            element: TypeTag::of::<T>(),
        }
    }

    /// The declared parameter type, `Vec<T>`.
    pub fn sequence(&self) -> TypeTag {
        self.sequence
    }

    pub fn element(&self) -> TypeTag {
        self.element
    }

    /// A spread argument of type `X` fills the tail iff `Vec<X>` is the
    /// declared sequence type, i.e. iff `X == T`.
    fn accepts(&self, tag: TypeTag) -> bool {
        tag == self.element
    }
}

/// Parameter list of a handler.
///
/// `matches` decides whether an argument batch may be passed to the handler.
/// Matching is exact: no widening, no coercion, no implicit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    fixed: Vec<TypeTag>,
    variadic: Option<VariadicTail>,
}

impl Signature {
    pub fn new(fixed: Vec<TypeTag>) -> Self {
        Self {
            fixed,
            variadic: None,
        }
    }

    pub fn variadic(fixed: Vec<TypeTag>, tail: VariadicTail) -> Self {
        Self {
            fixed,
            variadic: Some(tail),
        }
    }

    pub fn fixed(&self) -> &[TypeTag] {
        &self.fixed
    }

    pub fn tail(&self) -> Option<VariadicTail> {
        self.variadic
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Returns `true` when `args` can be passed to a handler with this signature.
    ///
    /// - Non-variadic: same length, every position the exact declared type.
    /// - Variadic: at least the fixed parameters, fixed positions exact, and
    ///   every position from the variadic slot on is an element of the tail:
    ///   `f(i32, Vec<u8>)` accepts `[i32]`, `[i32, u8]`, `[i32, u8, u8]` but
    ///   not `[i32, Vec<u8>]`.
    pub fn matches(&self, args: &[Value]) -> bool {
        let fixed = self.fixed.len();
        let arity_ok = match self.variadic {
            None => args.len() == fixed,
            Some(_) => args.len() >= fixed,
        };
        if !arity_ok {
            return false;
        }

        let fixed_ok = self
            .fixed
            .iter()
            .zip(args)
            .all(|(param, arg)| *param == arg.type_tag());
        if !fixed_ok {
            return false;
        }

        match self.variadic {
            None => true,
            Some(tail) => args[fixed..].iter().all(|arg| tail.accepts(arg.type_tag())),
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for tag in &self.fixed {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{tag}")?;
        }
        if let Some(tail) = &self.variadic {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "...{}", tail.element)?;
        }
        write!(f, ")")
    }
}
