//! Argument-trimming adapters.
//!
//! A signal has one argument type, but handlers often need less of it. These
//! adapters turn a handler that takes nothing, or only the first element of a
//! tuple, into the `Fn(&Args)` shape the slot list stores.

/// Tuples whose first element can be handed to a handler on its own.
pub trait Head {
    /// The first element's type.
    type Head;

    fn head(&self) -> &Self::Head;
}

macro_rules! impl_head {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first $(, $rest)*> Head for ($first, $($rest,)*) {
            type Head = $first;

            #[inline]
            fn head(&self) -> &$first {
                &self.0
            }
        }
    };
}

impl_head!(A);
impl_head!(A, B);
impl_head!(A, B, C);
impl_head!(A, B, C, D);

/// Adapt a handler that ignores the signal's arguments.
pub fn ignore_args<Args, F>(handler: F) -> impl Fn(&Args) + Send + Sync + 'static
where
    Args: 'static,
    F: Fn() + Send + Sync + 'static,
{
    move |_: &Args| handler()
}

/// Adapt a handler that only takes the first argument.
pub fn head<Args, F>(handler: F) -> impl Fn(&Args) + Send + Sync + 'static
where
    Args: Head + 'static,
    F: Fn(&Args::Head) + Send + Sync + 'static,
{
    move |args: &Args| handler(args.head())
}
