//! Adapters from typed Rust closures to dynamically invoked handlers.
//!
//! [`HandlerFn`] is implemented for every `Fn(A1, .., An) -> R` up to six
//! parameters, [`VariadicFn`] for every `Fn(A1, .., An, Vec<T>) -> R` up to
//! four fixed parameters. Users never implement them by hand; they pass
//! closures or `fn` items to
//! [`Handler::new`](crate::Handler::new) and
//! [`Handler::variadic`](crate::Handler::variadic).
//!
//! Arguments are cloned out of the batch, so parameter types must be
//! `Clone`. Emitting `Arc<T>` keeps that cheap for large payloads.

use std::any::{Any, type_name};

use crate::{
    Fault, Signature, TypeTag, Value,
    signature::VariadicTail,
    value::returned_values,
};

/// A callable with a fixed parameter list, invoked with a matching batch.
pub trait HandlerFn<Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, Fault>;
}

/// A callable whose last parameter is a `Vec<T>` collecting the batch tail.
pub trait VariadicFn<Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, Fault>;
}

fn arg<T: Any + Clone>(args: &[Value], position: usize) -> Result<T, Fault> {
    let Some(value) = args.get(position) else {
        return Err(Fault::ArgumentMismatch {
            position,
            expected: type_name::<T>(),
            found: "<missing>",
        });
    };
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| Fault::ArgumentMismatch {
            position,
            expected: type_name::<T>(),
            found: value.type_tag().name(),
        })
}

fn tail<T: Any + Clone>(args: &[Value], from: usize) -> Result<Vec<T>, Fault> {
    (from..args.len()).map(|position| arg::<T>(args, position)).collect()
}

macro_rules! impl_handler_fn {
    ($($ty:ident $var:ident),*) => {
        impl<F, R, $($ty,)*> HandlerFn<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Any + Send + Sync,
            $($ty: Any + Clone + Send + Sync,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(TypeTag::of::<$ty>()),*])
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, Fault> {
                let mut position = 0;
                $(
                    let $var = arg::<$ty>(args, position)?;
                    position += 1;
                )*
                Ok(returned_values((self)($($var),*)))
            }
        }
    };
}

impl_handler_fn!();
impl_handler_fn!(A1 a1);
impl_handler_fn!(A1 a1, A2 a2);
impl_handler_fn!(A1 a1, A2 a2, A3 a3);
impl_handler_fn!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_handler_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_handler_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

macro_rules! impl_variadic_fn {
    ($($ty:ident $var:ident),*) => {
        impl<F, R, T, $($ty,)*> VariadicFn<($($ty,)* Vec<T>,)> for F
        where
            F: Fn($($ty,)* Vec<T>) -> R + Send + Sync + 'static,
            R: Any + Send + Sync,
            T: Any + Clone + Send + Sync,
            $($ty: Any + Clone + Send + Sync,)*
        {
            fn signature() -> Signature {
                Signature::variadic(vec![$(TypeTag::of::<$ty>()),*], VariadicTail::of::<T>())
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, Fault> {
                let mut position = 0;
                $(
                    let $var = arg::<$ty>(args, position)?;
                    position += 1;
                )*
                let rest = tail::<T>(args, position)?;
                Ok(returned_values((self)($($var,)* rest)))
            }
        }
    };
}

impl_variadic_fn!();
impl_variadic_fn!(A1 a1);
impl_variadic_fn!(A1 a1, A2 a2);
impl_variadic_fn!(A1 a1, A2 a2, A3 a3);
impl_variadic_fn!(A1 a1, A2 a2, A3 a3, A4 a4);
