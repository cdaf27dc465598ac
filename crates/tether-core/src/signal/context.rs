//! Per-invocation dispatch state.
//!
//! Every handler call runs inside a fresh [`DispatchContext`]. The context
//! carries the "disconnect requested" flag that the signal inspects as soon
//! as the handler returns. Handlers reach it either explicitly (handlers
//! connected with [`Signal::connect_with_context`](crate::Signal::connect_with_context))
//! or through the free function [`disconnect`], which targets the innermost
//! handler running on the calling thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{SignalError, SignalResult};
use crate::object::ObjectId;
use crate::signal::ConnectionId;

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<DispatchContext>>> = const { RefCell::new(Vec::new()) };
}

/// State scoped to exactly one handler invocation.
#[derive(Debug)]
pub struct DispatchContext {
    connection: ConnectionId,
    receiver: ObjectId,
    disconnect_requested: Cell<bool>,
}

impl DispatchContext {
    fn new(connection: ConnectionId, receiver: ObjectId) -> Self {
        Self {
            connection,
            receiver,
            disconnect_requested: Cell::new(false),
        }
    }

    /// Request that the running slot be removed once the handler returns.
    ///
    /// The current invocation completes normally; later emissions no longer
    /// reach this slot.
    pub fn disconnect(&self) {
        self.disconnect_requested.set(true);
    }

    /// The connection whose handler is running.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// The receiver of the running slot.
    pub fn receiver(&self) -> ObjectId {
        self.receiver
    }

    pub fn is_disconnect_requested(&self) -> bool {
        self.disconnect_requested.get()
    }
}

/// Pops the context pushed by [`run_scoped`], also on unwind.
struct Frame;

impl Drop for Frame {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.borrow_mut().pop());
    }
}

/// Run `f` inside a fresh context, returning its result and whether the
/// handler asked to be disconnected.
pub(crate) fn run_scoped<R>(
    connection: ConnectionId,
    receiver: ObjectId,
    f: impl FnOnce(&DispatchContext) -> R,
) -> (R, bool) {
    let context = Rc::new(DispatchContext::new(connection, receiver));
    ACTIVE.with(|active| active.borrow_mut().push(Rc::clone(&context)));
    let frame = Frame;
    let result = f(&context);
    drop(frame);
    (result, context.is_disconnect_requested())
}

/// Disconnect the slot whose handler is currently running on this thread.
///
/// With nested emissions the innermost running handler is targeted.
///
/// # Errors
///
/// Returns [`SignalError::NoActiveHandler`] when called outside a handler.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tether_core::{ObjectBase, Signal, signal};
///
/// let receiver = ObjectBase::new::<ObjectBase>();
/// let clicked = Signal::<()>::new();
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// let counter = calls.clone();
/// clicked
///     .connect(&receiver, move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         signal::disconnect().unwrap();
///     })
///     .unwrap();
///
/// clicked.emit(()).unwrap();
/// clicked.emit(()).unwrap();
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// assert!(signal::disconnect().is_err());
/// ```
pub fn disconnect() -> SignalResult<()> {
    ACTIVE.with(|active| match active.borrow().last() {
        Some(context) => {
            context.disconnect();
            Ok(())
        }
        None => Err(SignalError::NoActiveHandler),
    })
}

/// Whether a slot handler is running on the calling thread.
pub fn in_handler() -> bool {
    ACTIVE.with(|active| !active.borrow().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn receiver() -> ObjectId {
        ObjectId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn test_disconnect_outside_handler_is_rejected() {
        assert!(!in_handler());
        assert_eq!(disconnect(), Err(SignalError::NoActiveHandler));
    }

    #[test]
    fn test_flag_is_scoped_to_one_invocation() {
        let conn = ConnectionId::next();
        let ((), requested) = run_scoped(conn, receiver(), |_| {
            assert!(in_handler());
            disconnect().unwrap();
        });
        assert!(requested);

        let ((), requested) = run_scoped(conn, receiver(), |ctx| {
            assert!(!ctx.is_disconnect_requested());
        });
        assert!(!requested);
        assert!(!in_handler());
    }

    #[test]
    fn test_innermost_context_wins() {
        let outer = ConnectionId::next();
        let inner = ConnectionId::next();

        let (inner_requested, outer_requested) = run_scoped(outer, receiver(), |_| {
            let ((), requested) = run_scoped(inner, receiver(), |ctx| {
                assert_eq!(ctx.connection_id(), inner);
                disconnect().unwrap();
            });
            requested
        });

        assert!(inner_requested);
        assert!(!outer_requested);
    }

    #[test]
    fn test_frame_popped_on_panic() {
        let conn = ConnectionId::next();
        let result = std::panic::catch_unwind(|| {
            run_scoped(conn, receiver(), |_| panic!("handler panic"));
        });
        assert!(result.is_err());
        assert!(!in_handler());
    }
}
