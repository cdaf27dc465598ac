//! Thread-affine signal/slot dispatch.
//!
//! This crate provides an in-process publish/subscribe mechanism in which
//! typed signals broadcast values to dynamically registered receivers:
//!
//! - **Object Model**: Stable generational ids, weak receiver references,
//!   owning threads and dispatch policies
//! - **Signal/Slot System**: Connect, disconnect and emit from any thread,
//!   with reentrancy-safe emission
//! - **Dispatcher**: Per-thread mailboxes that deliver slot calls on the
//!   receiver's owning thread
//!
//! Handlers may connect, disconnect and destroy any participant while an
//! emission is running, including the emitter itself.
//!
//! # Signal/Slot Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use tether_core::{Object, ObjectBase, ObjectId, Signal};
//!
//! struct Counter {
//!     base: ObjectBase,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Object for Counter {
//!     fn object_id(&self) -> ObjectId {
//!         self.base.id()
//!     }
//! }
//!
//! let base = ObjectBase::new::<Counter>();
//! let counter = Counter { value_changed: Signal::with_owner(&base), base };
//! let display = ObjectBase::new::<ObjectBase>();
//!
//! let last = Arc::new(AtomicI32::new(0));
//! let sink = last.clone();
//! counter
//!     .value_changed
//!     .connect(&display, move |value| sink.store(*value, Ordering::SeqCst))
//!     .unwrap();
//!
//! counter.value_changed.emit(42).unwrap();
//! assert_eq!(last.load(Ordering::SeqCst), 42);
//!
//! // Destroying the receiver disconnects it everywhere.
//! drop(display);
//! assert_eq!(counter.value_changed.connection_count(), 0);
//! ```
//!
//! # Cross-Thread Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use parking_lot::Mutex;
//! use tether_core::{Dispatcher, ObjectBase, Signal};
//!
//! let receiver = ObjectBase::new::<ObjectBase>();
//! let signal = Arc::new(Signal::<String>::new());
//! let seen = Arc::new(Mutex::new(None));
//!
//! let sink = seen.clone();
//! signal
//!     .connect(&receiver, move |msg| {
//!         *sink.lock() = Some((msg.clone(), std::thread::current().id()));
//!     })
//!     .unwrap();
//!
//! let emitter = signal.clone();
//! std::thread::spawn(move || emitter.emit("hello".into()).unwrap())
//!     .join()
//!     .unwrap();
//!
//! // The handler runs here, on the receiver's thread, once it drains its mailbox.
//! Dispatcher::current().process_until(Duration::from_secs(5), || seen.lock().is_some());
//! assert_eq!(*seen.lock(), Some(("hello".to_string(), std::thread::current().id())));
//! ```

pub mod dispatcher;
mod error;
pub mod logging;
pub mod object;
pub mod signal;
pub mod thread_check;

pub use dispatcher::{Dispatcher, DispatcherConfig, QueuedInvocation};
pub use error::{DispatchError, HandlerError, SignalError, SignalResult};
pub use logging::{PerfSpan, RegistryDebug, RegistryFormatOptions};
pub use object::{
    DispatchPolicy, Object, ObjectBase, ObjectBuilder, ObjectError, ObjectHold, ObjectId,
    ObjectRegistry, ObjectResult, ObjectSummary, SharedObjectRegistry, WeakObject, global_registry,
};
pub use signal::{
    ConnectionGuard, ConnectionId, DispatchContext, Signal, SignalId, SignalLink, disconnect,
};
pub use thread_check::ThreadAffinity;

static_assertions::assert_impl_all!(ObjectBase: Send, Sync);
static_assertions::assert_impl_all!(WeakObject: Send, Sync, Copy);
static_assertions::assert_impl_all!(QueuedInvocation: Send);
static_assertions::assert_not_impl_any!(Dispatcher: Send, Sync);
