//! Callables invoked on every firing.
//!
//! Extra arguments travel as a tuple and are spread into the call, so a
//! handler written as `|name: String, attempt: u32| ...` is called with two
//! arguments, not one tuple.

/// A callable that accepts the elements of `Args` as separate arguments.
///
/// Implemented for every `Fn` taking up to eight arguments.
pub trait Handler<Args>: Send + 'static {
    /// Invoke the handler with `args` spread into individual arguments.
    fn call(&self, args: Args);
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) + Send + 'static,
        {
            #[allow(non_snake_case)]
            fn call(&self, args: ($($ty,)*)) {
                let ($($ty,)*) = args;
                self($($ty),*)
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
