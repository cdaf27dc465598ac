//! Signal/slot system for Tether.
//!
//! A [`Signal<Args>`] broadcasts a value to every connected slot. Each slot
//! targets a receiver [`Object`] that the signal refers to only weakly: a
//! destroyed receiver is never called and its slots disappear from every
//! signal it was connected to.
//!
//! # Delivery
//!
//! When a signal is emitted, each slot's receiver is resolved and then:
//!
//! - if the receiver uses [`DispatchPolicy::OwnerThreadOnly`] (the default)
//!   and the emitting thread is not its owning thread, the call is queued onto
//!   the owner's [`Dispatcher`] mailbox and `emit` moves on without waiting;
//! - otherwise the handler runs synchronously on the emitting thread.
//!
//! # Reentrancy
//!
//! Handlers may connect, disconnect, emit, or destroy any participant,
//! including the emitter and the signal's own receivers. An emission detaches
//! the live slot list into a local snapshot before running any handler and
//! merges it back afterwards, so slots connected from inside a handler are
//! first called by the next emission, and disconnected slots stop receiving
//! calls from the next emission on.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use tether_core::{ObjectBase, Signal};
//!
//! let receiver = ObjectBase::new::<ObjectBase>();
//! let text_changed = Signal::<String>::new();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let id = text_changed
//!     .connect(&receiver, move |text| sink.lock().push(text.clone()))
//!     .unwrap();
//!
//! text_changed.emit("hello".to_string()).unwrap();
//! assert!(text_changed.disconnect(id));
//! text_changed.emit("ignored".to_string()).unwrap();
//!
//! assert_eq!(*seen.lock(), vec!["hello".to_string()]);
//! ```

pub mod adapt;
pub mod context;

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::dispatcher::{Dispatcher, QueuedInvocation};
use crate::error::{HandlerError, SignalError, SignalResult};
use crate::logging::targets;
use crate::object::{DispatchPolicy, Object, ObjectId, WeakObject, global_registry};

pub use adapt::Head;
pub use context::{DispatchContext, disconnect, in_handler};

/// Identifies a signal in object back-links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// A unique identifier for a signal-slot connection.
///
/// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
/// Every connect call issues a fresh id, so connecting the same handler twice
/// yields two independent connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

type Handler<Args> =
    Box<dyn Fn(&DispatchContext, &Args) -> Result<(), HandlerError> + Send + Sync>;

/// One binding inside a signal.
struct Slot<Args> {
    id: ConnectionId,
    receiver: ObjectId,
    handler: Handler<Args>,
    /// Set once the slot has been removed; only flipped under the slot lock.
    disconnected: AtomicBool,
}

impl<Args> Slot<Args> {
    #[inline]
    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// Returns `true` if this call marked the slot.
    #[inline]
    fn mark_disconnected(&self) -> bool {
        !self.disconnected.swap(true, Ordering::AcqRel)
    }

    #[inline]
    fn call(&self, context: &DispatchContext, args: &Args) -> Result<(), HandlerError> {
        (self.handler)(context, args)
    }
}

impl<Args> PartialEq for Slot<Args> {
    fn eq(&self, other: &Self) -> bool {
        self.receiver == other.receiver && self.id == other.id
    }
}

type SlotRef<Args> = Arc<Slot<Args>>;

/// Slots detached by an emission that has not finished yet.
struct InFlight<Args> {
    emission: u64,
    thread: ThreadId,
    slots: Vec<SlotRef<Args>>,
}

struct SlotList<Args> {
    live: Vec<SlotRef<Args>>,
    in_flight: Vec<InFlight<Args>>,
}

impl<Args> Default for SlotList<Args> {
    fn default() -> Self {
        Self {
            live: Vec::new(),
            in_flight: Vec::new(),
        }
    }
}

/// A removed slot, and whether the removal that produced it still has to
/// settle the connection count and receiver link.
type Removed<Args> = Vec<(SlotRef<Args>, bool)>;

struct SignalInner<Args> {
    id: SignalId,
    owner: Option<ObjectId>,
    slots: Mutex<SlotList<Args>>,
    /// Number of slots not yet marked disconnected.
    connected: AtomicUsize,
    blocked: AtomicBool,
    next_emission: AtomicU64,
}

impl<Args> SignalInner<Args> {
    fn new(owner: Option<ObjectId>) -> Self {
        Self {
            id: SignalId::next(),
            owner,
            slots: Mutex::new(SlotList::default()),
            connected: AtomicUsize::new(0),
            blocked: AtomicBool::new(false),
            next_emission: AtomicU64::new(0),
        }
    }

    /// Run `f` with the slot list locked.
    ///
    /// `f` must not run user code or drop the last reference to a slot.
    fn with_slots<R>(&self, f: impl FnOnce(&mut SlotList<Args>) -> R) -> R {
        let mut list = self.slots.lock();
        f(&mut list)
    }

    /// Settle removed slots. Must be called with the slot lock released.
    fn release(&self, removed: Removed<Args>) -> usize {
        let registry = global_registry();
        let mut count = 0;
        for (slot, newly_marked) in &removed {
            if *newly_marked {
                count += 1;
                registry.unlink_incoming(slot.receiver, self.id);
            }
        }
        if count > 0 {
            self.connected.fetch_sub(count, Ordering::AcqRel);
        }
        drop(removed);
        count
    }

    /// Remove every slot matching `pred`, including slots detached by
    /// emissions in progress.
    fn remove_where(&self, pred: impl Fn(&Slot<Args>) -> bool) -> usize {
        let removed = self.with_slots(|list| {
            let (matched, kept): (Vec<_>, Vec<_>) =
                mem::take(&mut list.live).into_iter().partition(|slot| pred(&**slot));
            list.live = kept;

            let mut removed: Removed<Args> = matched
                .into_iter()
                .map(|slot| {
                    let newly_marked = slot.mark_disconnected();
                    (slot, newly_marked)
                })
                .collect();
            for flight in &list.in_flight {
                for slot in &flight.slots {
                    if !slot.is_disconnected() && pred(&**slot) {
                        let newly_marked = slot.mark_disconnected();
                        removed.push((Arc::clone(slot), newly_marked));
                    }
                }
            }
            removed
        });
        let count = self.release(removed);
        if count > 0 {
            tracing::trace!(target: targets::SIGNAL, signal = self.id.as_raw(), count, "disconnected slots");
        }
        count
    }

    /// Remove one slot wherever it currently lives.
    fn retire(&self, slot: &SlotRef<Args>) {
        let removed = self.with_slots(|list| {
            let mut removed = vec![(Arc::clone(slot), slot.mark_disconnected())];
            if let Some(pos) = list.live.iter().position(|live| **live == **slot) {
                removed.push((list.live.remove(pos), false));
            }
            removed
        });
        self.release(removed);
    }
}

impl<Args: Clone + Send + 'static> SignalInner<Args> {
    fn invoke(self: &Arc<Self>, emitter: Option<ObjectId>, args: &Args) -> SignalResult<()> {
        if self.connected.load(Ordering::Acquire) == 0 {
            return Ok(());
        }
        if self.blocked.load(Ordering::Acquire) {
            tracing::trace!(target: targets::SIGNAL, signal = self.id.as_raw(), "signal blocked, skipping emit");
            return Ok(());
        }

        let _emitter = emitter.and_then(|id| WeakObject::new(id).resolve());
        let emission = self.next_emission.fetch_add(1, Ordering::Relaxed);
        let thread = std::thread::current().id();

        let (snapshot, borrowed) = self.with_slots(|list| {
            let snapshot = mem::take(&mut list.live);
            let borrowed: Vec<SlotRef<Args>> = list
                .in_flight
                .iter()
                .filter(|flight| flight.thread != thread)
                .flat_map(|flight| flight.slots.iter().cloned())
                .collect();
            list.in_flight.push(InFlight {
                emission,
                thread,
                slots: snapshot.clone(),
            });
            (snapshot, borrowed)
        });
        tracing::trace!(
            target: targets::SIGNAL,
            signal = self.id.as_raw(),
            emission,
            slots = snapshot.len(),
            borrowed = borrowed.len(),
            "emitting signal"
        );

        let guard = EmissionGuard {
            signal: self,
            emission,
            snapshot,
        };

        // Slots held by another thread's emission still belong to this one.
        for slot in &borrowed {
            if !slot.is_disconnected() {
                self.dispatch_slot(slot, args)?;
            }
        }
        for slot in &guard.snapshot {
            self.dispatch_slot(slot, args)?;
        }
        Ok(())
    }

    fn dispatch_slot(self: &Arc<Self>, slot: &SlotRef<Args>, args: &Args) -> SignalResult<()> {
        let Some(receiver) = WeakObject::new(slot.receiver).resolve() else {
            tracing::trace!(
                target: targets::SIGNAL,
                signal = self.id.as_raw(),
                connection = slot.id.as_raw(),
                "receiver destroyed, dropping slot"
            );
            self.retire(slot);
            return Ok(());
        };

        if receiver.policy() == DispatchPolicy::OwnerThreadOnly
            && receiver.thread() != std::thread::current().id()
        {
            let owner = receiver.thread();
            drop(receiver);
            self.queue_slot(owner, slot, args);
            return Ok(());
        }

        let (result, disconnect_requested) =
            context::run_scoped(slot.id, slot.receiver, |context| slot.call(context, args));
        drop(receiver);
        if disconnect_requested {
            self.retire(slot);
        }
        result.map_err(SignalError::from)
    }

    fn queue_slot(self: &Arc<Self>, owner: ThreadId, slot: &SlotRef<Args>, args: &Args) {
        let signal = Arc::downgrade(self);
        let slot = Arc::clone(slot);
        let connection = slot.id;
        let args = args.clone();

        let invocation = QueuedInvocation::new(move || {
            if slot.is_disconnected() {
                return Ok(());
            }
            let Some(receiver) = WeakObject::new(slot.receiver).resolve() else {
                return Ok(());
            };
            let (result, disconnect_requested) =
                context::run_scoped(slot.id, slot.receiver, |context| slot.call(context, &args));
            drop(receiver);
            if disconnect_requested && let Some(signal) = signal.upgrade() {
                signal.retire(&slot);
            }
            result
        });

        if let Err(err) = Dispatcher::enqueue_to(owner, invocation) {
            tracing::warn!(
                target: targets::SIGNAL,
                signal = self.id.as_raw(),
                connection = connection.as_raw(),
                %err,
                "cross-thread delivery failed"
            );
        }
    }
}

/// Merges an emission's snapshot back into the live list, also on early
/// return and unwind.
struct EmissionGuard<'a, Args> {
    signal: &'a SignalInner<Args>,
    emission: u64,
    snapshot: Vec<SlotRef<Args>>,
}

impl<Args> Drop for EmissionGuard<'_, Args> {
    fn drop(&mut self) {
        let emission = self.emission;
        let snapshot = mem::take(&mut self.snapshot);
        let released = self.signal.with_slots(|list| {
            let shadow = list
                .in_flight
                .iter()
                .position(|flight| flight.emission == emission)
                .map(|pos| list.in_flight.remove(pos));

            let (kept, dropped): (Vec<_>, Vec<_>) =
                snapshot.into_iter().partition(|slot| !slot.is_disconnected());
            if list.live.is_empty() {
                list.live = kept;
            } else {
                let mut merged = kept;
                merged.append(&mut list.live);
                list.live = merged;
            }
            (shadow, dropped)
        });
        drop(released);
    }
}

/// Type-erased view of a signal, held weakly by the objects it references.
pub trait SignalLink: Send + Sync {
    fn signal_id(&self) -> SignalId;

    /// Remove every slot. Returns the number of slots removed.
    fn disconnect_all(&self) -> usize;

    /// Remove every slot targeting `receiver`.
    fn disconnect_receiver(&self, receiver: ObjectId) -> usize;

    fn connection_count(&self) -> usize;
}

impl<Args: 'static> SignalLink for SignalInner<Args> {
    fn signal_id(&self) -> SignalId {
        self.id
    }

    fn disconnect_all(&self) -> usize {
        self.remove_where(|_| true)
    }

    fn disconnect_receiver(&self, receiver: ObjectId) -> usize {
        self.remove_where(|slot| slot.receiver == receiver)
    }

    fn connection_count(&self) -> usize {
        self.connected.load(Ordering::Acquire)
    }
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(String, i32)` for multiple arguments.
///   Arguments are cloned for every cross-thread delivery.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync` and may be emitted from any thread.
pub struct Signal<Args> {
    inner: Arc<SignalInner<Args>>,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a free-standing signal with no connections.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner::new(None)),
        }
    }

    /// Create a signal owned by `owner`.
    ///
    /// The owner is the emitter of [`emit`](Self::emit). Destroying the owner
    /// disconnects every slot of this signal.
    pub fn with_owner<O: Object>(owner: &O) -> Self {
        let owner = owner.object_id();
        let signal = Self {
            inner: Arc::new(SignalInner::new(Some(owner))),
        };
        let weak: Weak<SignalInner<Args>> = Arc::downgrade(&signal.inner);
        let link: Weak<dyn SignalLink> = weak;
        let registered = global_registry()
            .with_write(|registry| registry.register_outgoing(owner, signal.inner.id, link));
        if registered.is_err() {
            tracing::trace!(target: targets::SIGNAL, signal = signal.inner.id.as_raw(), ?owner, "owner already destroyed");
        }
        signal
    }

    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    fn connect_handler(&self, receiver: ObjectId, handler: Handler<Args>) -> SignalResult<ConnectionId> {
        let weak: Weak<SignalInner<Args>> = Arc::downgrade(&self.inner);
        let link: Weak<dyn SignalLink> = weak;
        global_registry()
            .with_write(|registry| registry.link_incoming(receiver, self.inner.id, link))
            .map_err(|_| SignalError::ReceiverDestroyed(receiver))?;

        let id = ConnectionId::next();
        let slot = Arc::new(Slot {
            id,
            receiver,
            handler,
            disconnected: AtomicBool::new(false),
        });
        self.inner.connected.fetch_add(1, Ordering::AcqRel);
        self.inner.with_slots(|list| list.live.push(Arc::clone(&slot)));

        // The receiver may have been destroyed between linking and insertion.
        if !global_registry().contains(receiver) {
            self.inner.retire(&slot);
            return Err(SignalError::ReceiverDestroyed(receiver));
        }

        tracing::trace!(target: targets::SIGNAL, signal = self.inner.id.as_raw(), connection = id.as_raw(), ?receiver, "connected slot");
        Ok(id)
    }

    /// Connect a handler to this signal on behalf of `receiver`.
    ///
    /// The handler runs on the receiver's owning thread unless the receiver
    /// uses [`DispatchPolicy::AlwaysCallerThread`]. It stops being called once
    /// the receiver is destroyed.
    ///
    /// # Errors
    ///
    /// [`SignalError::ReceiverDestroyed`] if `receiver` was already destroyed.
    pub fn connect<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionId>
    where
        R: Object + ?Sized,
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_handler(
            receiver.object_id(),
            Box::new(move |_: &DispatchContext, args: &Args| {
                handler(args);
                Ok(())
            }),
        )
    }

    /// Connect a handler that may fail.
    ///
    /// A failure of a synchronously called handler aborts the emission and is
    /// returned from [`emit`](Self::emit); slots not reached yet stay connected.
    pub fn connect_fallible<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionId>
    where
        R: Object + ?Sized,
        F: Fn(&Args) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.connect_handler(
            receiver.object_id(),
            Box::new(move |_: &DispatchContext, args: &Args| handler(args)),
        )
    }

    /// Connect a handler that receives its [`DispatchContext`].
    pub fn connect_with_context<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionId>
    where
        R: Object + ?Sized,
        F: Fn(&DispatchContext, &Args) + Send + Sync + 'static,
    {
        self.connect_handler(
            receiver.object_id(),
            Box::new(move |context: &DispatchContext, args: &Args| {
                handler(context, args);
                Ok(())
            }),
        )
    }

    /// Connect a handler that ignores the arguments.
    pub fn connect_no_args<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionId>
    where
        R: Object + ?Sized,
        F: Fn() + Send + Sync + 'static,
    {
        self.connect(receiver, adapt::ignore_args::<Args, F>(handler))
    }

    /// Connect a handler that takes only the first argument.
    pub fn connect_head<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionId>
    where
        R: Object + ?Sized,
        Args: Head,
        F: Fn(&Args::Head) + Send + Sync + 'static,
    {
        self.connect(receiver, adapt::head::<Args, F>(handler))
    }

    /// Connect a method of `receiver`.
    ///
    /// The slot keeps only a weak reference to the receiver, so the
    /// connection never keeps it alive.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use tether_core::{Object, ObjectBase, ObjectId, Signal};
    ///
    /// struct Counter {
    ///     base: ObjectBase,
    ///     total: AtomicI32,
    /// }
    ///
    /// impl Object for Counter {
    ///     fn object_id(&self) -> ObjectId {
    ///         self.base.id()
    ///     }
    /// }
    ///
    /// impl Counter {
    ///     fn add(&self, n: &i32) {
    ///         self.total.fetch_add(*n, Ordering::SeqCst);
    ///     }
    /// }
    ///
    /// let counter = Arc::new(Counter { base: ObjectBase::new::<Counter>(), total: AtomicI32::new(0) });
    /// let value_changed = Signal::<i32>::new();
    /// value_changed.connect_method(&counter, Counter::add).unwrap();
    ///
    /// value_changed.emit(5).unwrap();
    /// assert_eq!(counter.total.load(Ordering::SeqCst), 5);
    /// ```
    pub fn connect_method<R, M>(&self, receiver: &Arc<R>, method: M) -> SignalResult<ConnectionId>
    where
        R: Object,
        M: Fn(&R, &Args) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(receiver);
        self.connect(receiver.as_ref(), move |args: &Args| {
            if let Some(receiver) = weak.upgrade() {
                method(&receiver, args);
            }
        })
    }

    /// Connect a handler and return a guard that disconnects it when dropped.
    pub fn connect_scoped<R, F>(&self, receiver: &R, handler: F) -> SignalResult<ConnectionGuard<Args>>
    where
        R: Object + ?Sized,
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(receiver, handler)?;
        Ok(ConnectionGuard {
            signal: Arc::downgrade(&self.inner),
            id,
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.remove_where(|slot| slot.id == id) > 0
    }

    /// Disconnect all slots. Returns the number of slots removed.
    pub fn disconnect_all(&self) -> usize {
        self.inner.remove_where(|_| true)
    }

    /// Disconnect every slot targeting `receiver`.
    pub fn disconnect_all_from<R: Object + ?Sized>(&self, receiver: &R) -> usize {
        let receiver = receiver.object_id();
        self.inner.remove_where(|slot| slot.receiver == receiver)
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.inner.connected.load(Ordering::Acquire)
    }

    pub fn has_connections(&self) -> bool {
        self.connection_count() > 0
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, with the signal's owner (if any) as emitter.
    ///
    /// Returns once every same-thread handler has run and every cross-thread
    /// delivery has been queued.
    ///
    /// # Errors
    ///
    /// [`SignalError::HandlerFailed`] if a synchronously called handler
    /// failed. The remaining slots of this emission are skipped but stay
    /// connected.
    #[tracing::instrument(skip_all, fields(signal = self.inner.id.as_raw()), target = "tether_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> SignalResult<()> {
        self.inner.invoke(self.inner.owner, &args)
    }

    /// Emit the signal on behalf of an explicit emitter.
    ///
    /// The emitter is held for the duration of the call.
    pub fn emit_from<E: Object + ?Sized>(&self, emitter: &E, args: Args) -> SignalResult<()> {
        self.inner.invoke(Some(emitter.object_id()), &args)
    }
}

impl<Args> Drop for Signal<Args> {
    fn drop(&mut self) {
        self.inner.remove_where(|_| true);
        if let Some(owner) = self.inner.owner {
            global_registry().with_write(|registry| registry.unregister_outgoing(owner, self.inner.id));
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("owner", &self.inner.owner)
            .field("connections", &self.inner.connected.load(Ordering::Acquire))
            .field("blocked", &self.inner.blocked.load(Ordering::Acquire))
            .finish()
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`]. The guard refers to the signal
/// weakly and may outlive it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use tether_core::{ObjectBase, Signal};
///
/// let receiver = ObjectBase::new::<ObjectBase>();
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
/// {
///     let counter = counter.clone();
///     let _guard = signal
///         .connect_scoped(&receiver, move |&n| {
///             counter.fetch_add(n, Ordering::SeqCst);
///         })
///         .unwrap();
///     signal.emit(42).unwrap();
/// }
/// signal.emit(43).unwrap();
/// assert_eq!(counter.load(Ordering::SeqCst), 42);
/// ```
pub struct ConnectionGuard<Args> {
    signal: Weak<SignalInner<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            let id = self.id;
            signal.remove_where(|slot| slot.id == id);
        }
    }
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);
static_assertions::assert_impl_all!(ConnectionGuard<String>: Send, Sync);
