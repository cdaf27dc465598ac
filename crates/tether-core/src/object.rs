//! Object model for Tether.
//!
//! Provides the identity layer that signals use to refer to their
//! participants without owning them:
//! - Stable, generational object identifiers via arena-based storage
//! - Weak references ([`WeakObject`]) that resolve into short-lived
//!   [`ObjectHold`]s and fail once the object is destroyed
//! - The owning thread and [`DispatchPolicy`] of every object
//! - Back-links from each object to the signals that reference it, so that
//!   destroying the object erases it from every slot list
//!
//! # Key Types
//!
//! - [`Object`] - Base trait that all objects implement
//! - [`ObjectBase`] - Helper struct for implementing [`Object`]
//! - [`ObjectBuilder`] - Configures name, owning thread and dispatch policy
//! - [`ObjectId`] - Unique stable identifier for each object
//! - [`ObjectRegistry`] - Central registry managing all objects
//! - [`SharedObjectRegistry`] - Thread-safe wrapper around [`ObjectRegistry`]
//!
//! # Lifetime
//!
//! An object is *alive* from registration until [`ObjectBase::destroy`] (run
//! automatically on drop). Destruction marks the registry entry destroyed,
//! detaches the object from every signal it is connected to or owns, and
//! reclaims the entry as soon as no [`ObjectHold`] is outstanding.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{OnceLock, Weak};
use std::thread::ThreadId;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;
use crate::signal::{SignalId, SignalLink};
use crate::thread_check::ThreadAffinity;

new_key_type! {
    /// A unique identifier for an object in the registry.
    ///
    /// `ObjectId`s are generational: once an object is destroyed its id never
    /// resolves again, even if the registry slot is reused.
    pub struct ObjectId;
}

impl ObjectId {
    /// Convert the ObjectId to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Errors that can occur during object operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    /// The object ID is invalid or has been destroyed.
    #[error("invalid or destroyed object id")]
    InvalidObjectId,
}

/// Result type for object operations.
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

/// Where a receiver's handlers run when a signal is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchPolicy {
    /// Handlers run synchronously on whichever thread emits.
    AlwaysCallerThread,
    /// Handlers run on the object's owning thread. Emissions from other
    /// threads are queued onto the owner's dispatcher.
    #[default]
    OwnerThreadOnly,
}

/// A signal holding slots that target an object, with the number of such slots.
struct IncomingLink {
    signal: Weak<dyn SignalLink>,
    slots: usize,
}

/// Internal data stored in the registry for each object.
struct ObjectData {
    /// Human-readable name for debugging.
    name: String,
    /// The type name for debugging.
    type_name: &'static str,
    affinity: ThreadAffinity,
    policy: DispatchPolicy,
    /// Signals holding at least one slot with this object as receiver.
    incoming: HashMap<SignalId, IncomingLink>,
    /// Signals owned by this object.
    outgoing: HashMap<SignalId, Weak<dyn SignalLink>>,
    /// Outstanding [`ObjectHold`]s. Modified under the read lock.
    holds: AtomicUsize,
    destroyed: bool,
}

impl ObjectData {
    fn new(type_name: &'static str, affinity: ThreadAffinity, policy: DispatchPolicy) -> Self {
        Self {
            name: String::new(),
            type_name,
            affinity,
            policy,
            incoming: HashMap::new(),
            outgoing: HashMap::new(),
            holds: AtomicUsize::new(0),
            destroyed: false,
        }
    }
}

/// Signals an object was linked to when its destruction began.
///
/// Returned by [`ObjectRegistry::begin_destroy`] so the caller can detach the
/// object from each signal after releasing the registry lock.
pub struct Teardown {
    /// Signals holding slots that target the destroyed object.
    pub incoming: Vec<Weak<dyn SignalLink>>,
    /// Signals owned by the destroyed object.
    pub outgoing: Vec<Weak<dyn SignalLink>>,
}

/// A point-in-time description of one registered object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub id: ObjectId,
    pub name: String,
    pub type_name: &'static str,
    pub thread: ThreadId,
    pub policy: DispatchPolicy,
    /// Number of distinct signals with slots targeting the object.
    pub incoming_links: usize,
    /// Number of signals owned by the object.
    pub outgoing_signals: usize,
    pub holds: usize,
    pub destroyed: bool,
}

/// The central registry that manages all objects and their signal links.
///
/// Uses arena-based storage via SlotMap for stable object IDs.
pub struct ObjectRegistry {
    objects: SlotMap<ObjectId, ObjectData>,
}

impl ObjectRegistry {
    /// Create a new empty object registry.
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
        }
    }

    /// Register a new object and return its ID.
    pub fn register<T: Object + 'static>(
        &mut self,
        affinity: ThreadAffinity,
        policy: DispatchPolicy,
    ) -> ObjectId {
        let type_name = std::any::type_name::<T>();
        let id = self.objects.insert(ObjectData::new(type_name, affinity, policy));
        tracing::trace!(target: targets::OBJECT, ?id, type_name, thread = ?affinity.thread_id(), "registered object");
        id
    }

    fn alive(&self, id: ObjectId) -> Option<&ObjectData> {
        self.objects.get(id).filter(|data| !data.destroyed)
    }

    fn alive_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData> {
        self.objects.get_mut(id).filter(|data| !data.destroyed)
    }

    /// Check if an object exists and has not been destroyed.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.alive(id).is_some()
    }

    /// The owning thread of an object.
    pub fn thread_of(&self, id: ObjectId) -> ObjectResult<ThreadId> {
        self.alive(id)
            .map(|data| data.affinity.thread_id())
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// The dispatch policy of an object.
    pub fn policy_of(&self, id: ObjectId) -> ObjectResult<DispatchPolicy> {
        self.alive(id)
            .map(|data| data.policy)
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Change the dispatch policy of an object.
    pub fn set_policy(&mut self, id: ObjectId, policy: DispatchPolicy) -> ObjectResult<()> {
        let data = self.alive_mut(id).ok_or(ObjectError::InvalidObjectId)?;
        data.policy = policy;
        Ok(())
    }

    /// Get the object's name.
    pub fn object_name(&self, id: ObjectId) -> ObjectResult<&str> {
        self.alive(id)
            .map(|data| data.name.as_str())
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Set the object's name.
    pub fn set_object_name(&mut self, id: ObjectId, name: String) -> ObjectResult<()> {
        let data = self.alive_mut(id).ok_or(ObjectError::InvalidObjectId)?;
        data.name = name;
        Ok(())
    }

    /// Get the object's type name.
    pub fn type_name(&self, id: ObjectId) -> ObjectResult<&'static str> {
        self.alive(id)
            .map(|data| data.type_name)
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Record that `signal` holds one more slot targeting `receiver`.
    pub fn link_incoming(
        &mut self,
        receiver: ObjectId,
        signal_id: SignalId,
        signal: Weak<dyn SignalLink>,
    ) -> ObjectResult<()> {
        let data = self.alive_mut(receiver).ok_or(ObjectError::InvalidObjectId)?;
        data.incoming
            .entry(signal_id)
            .or_insert(IncomingLink { signal, slots: 0 })
            .slots += 1;
        Ok(())
    }

    /// Record that `signal` dropped one slot targeting `receiver`.
    ///
    /// Does nothing if the receiver is gone or was never linked.
    pub fn unlink_incoming(&mut self, receiver: ObjectId, signal_id: SignalId) {
        let Some(data) = self.alive_mut(receiver) else {
            return;
        };
        if let Some(link) = data.incoming.get_mut(&signal_id) {
            link.slots = link.slots.saturating_sub(1);
            if link.slots == 0 {
                data.incoming.remove(&signal_id);
            }
        }
    }

    /// Record that `owner` owns `signal`.
    pub fn register_outgoing(
        &mut self,
        owner: ObjectId,
        signal_id: SignalId,
        signal: Weak<dyn SignalLink>,
    ) -> ObjectResult<()> {
        let data = self.alive_mut(owner).ok_or(ObjectError::InvalidObjectId)?;
        data.outgoing.insert(signal_id, signal);
        Ok(())
    }

    /// Forget an owned signal (the signal is being dropped).
    pub fn unregister_outgoing(&mut self, owner: ObjectId, signal_id: SignalId) {
        if let Some(data) = self.alive_mut(owner) {
            data.outgoing.remove(&signal_id);
        }
    }

    /// Mark an object destroyed and take its signal links.
    ///
    /// Returns `None` if the object is unknown or already destroyed. The
    /// registry entry is removed immediately when no hold is outstanding,
    /// otherwise when the last hold is released.
    pub fn begin_destroy(&mut self, id: ObjectId) -> Option<Teardown> {
        let data = self.alive_mut(id)?;
        data.destroyed = true;
        let incoming = data.incoming.drain().map(|(_, link)| link.signal).collect();
        let outgoing = data.outgoing.drain().map(|(_, signal)| signal).collect();
        let held = data.holds.load(Ordering::Acquire) > 0;
        if !held {
            self.objects.remove(id);
        }
        tracing::trace!(target: targets::OBJECT, ?id, deferred = held, "destroying object");
        Some(Teardown { incoming, outgoing })
    }

    fn reclaim_if_unheld(&mut self, id: ObjectId) {
        let reclaim = self
            .objects
            .get(id)
            .is_some_and(|data| data.destroyed && data.holds.load(Ordering::Acquire) == 0);
        if reclaim {
            self.objects.remove(id);
            tracing::trace!(target: targets::OBJECT, ?id, "reclaimed destroyed object");
        }
    }

    /// Number of distinct signals holding slots that target `id`.
    pub fn incoming_link_count(&self, id: ObjectId) -> usize {
        self.alive(id).map_or(0, |data| data.incoming.len())
    }

    /// Total number of slots, across all signals, that target `id`.
    pub fn incoming_slot_count(&self, id: ObjectId) -> usize {
        self.alive(id)
            .map_or(0, |data| data.incoming.values().map(|link| link.slots).sum())
    }

    /// Number of signals owned by `id`.
    pub fn outgoing_signal_count(&self, id: ObjectId) -> usize {
        self.alive(id).map_or(0, |data| data.outgoing.len())
    }

    /// Get the number of live objects in the registry.
    pub fn object_count(&self) -> usize {
        self.objects.values().filter(|data| !data.destroyed).count()
    }

    /// Describe every entry in the registry, including destroyed entries
    /// still pinned by holds.
    pub fn snapshot(&self) -> Vec<ObjectSummary> {
        self.objects
            .iter()
            .map(|(id, data)| ObjectSummary {
                id,
                name: data.name.clone(),
                type_name: data.type_name,
                thread: data.affinity.thread_id(),
                policy: data.policy,
                incoming_links: data.incoming.len(),
                outgoing_signals: data.outgoing.len(),
                holds: data.holds.load(Ordering::Acquire),
                destroyed: data.destroyed,
            })
            .collect()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around [`ObjectRegistry`].
///
/// Provides concurrent read access with exclusive write access via `RwLock`.
/// The registry lock is never held while a signal's slot list is locked.
pub struct SharedObjectRegistry {
    inner: RwLock<ObjectRegistry>,
}

impl SharedObjectRegistry {
    /// Create a new shared object registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ObjectRegistry::new()),
        }
    }

    /// Check if an object exists and has not been destroyed.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.read().contains(id)
    }

    /// The owning thread of an object.
    pub fn thread_of(&self, id: ObjectId) -> ObjectResult<ThreadId> {
        self.inner.read().thread_of(id)
    }

    /// The dispatch policy of an object.
    pub fn policy_of(&self, id: ObjectId) -> ObjectResult<DispatchPolicy> {
        self.inner.read().policy_of(id)
    }

    /// Get the object's name.
    pub fn object_name(&self, id: ObjectId) -> ObjectResult<String> {
        self.inner.read().object_name(id).map(String::from)
    }

    /// Number of distinct signals holding slots that target `id`.
    pub fn incoming_link_count(&self, id: ObjectId) -> usize {
        self.inner.read().incoming_link_count(id)
    }

    /// Total number of slots, across all signals, that target `id`.
    pub fn incoming_slot_count(&self, id: ObjectId) -> usize {
        self.inner.read().incoming_slot_count(id)
    }

    /// Number of signals owned by `id`.
    pub fn outgoing_signal_count(&self, id: ObjectId) -> usize {
        self.inner.read().outgoing_signal_count(id)
    }

    /// Get the number of live objects.
    pub fn object_count(&self) -> usize {
        self.inner.read().object_count()
    }

    pub(crate) fn unlink_incoming(&self, receiver: ObjectId, signal_id: SignalId) {
        self.inner.write().unlink_incoming(receiver, signal_id);
    }

    fn acquire_hold(&self, id: ObjectId) -> Option<ObjectHold> {
        let registry = self.inner.read();
        let data = registry.alive(id)?;
        data.holds.fetch_add(1, Ordering::AcqRel);
        Some(ObjectHold {
            id,
            thread: data.affinity.thread_id(),
            policy: data.policy,
        })
    }

    fn release_hold(&self, id: ObjectId) {
        let reclaim = {
            let registry = self.inner.read();
            registry.objects.get(id).is_some_and(|data| {
                data.holds.fetch_sub(1, Ordering::AcqRel) == 1 && data.destroyed
            })
        };
        if reclaim {
            self.inner.write().reclaim_if_unheld(id);
        }
    }

    /// Access the registry with a read lock for complex operations.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ObjectRegistry) -> R,
    {
        f(&self.inner.read())
    }

    /// Access the registry with a write lock for complex operations.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ObjectRegistry) -> R,
    {
        f(&mut self.inner.write())
    }
}

impl Default for SharedObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<SharedObjectRegistry> = OnceLock::new();

/// Get a reference to the global object registry, creating it on first use.
pub fn global_registry() -> &'static SharedObjectRegistry {
    GLOBAL_REGISTRY.get_or_init(SharedObjectRegistry::new)
}

/// A non-owning reference to an object.
///
/// Resolving yields an [`ObjectHold`] while the object is alive and `None`
/// once it has been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakObject {
    id: ObjectId,
}

impl WeakObject {
    /// Create a weak reference from an object id.
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    /// The referenced object's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Try to acquire a temporary hold on the object.
    pub fn resolve(&self) -> Option<ObjectHold> {
        global_registry().acquire_hold(self.id)
    }
}

/// A temporary strong reference to a live object.
///
/// While a hold exists the object's registry entry is not reclaimed, and the
/// owning thread and dispatch policy observed at resolution stay available.
/// Released on drop.
#[derive(Debug)]
pub struct ObjectHold {
    id: ObjectId,
    thread: ThreadId,
    policy: DispatchPolicy,
}

impl ObjectHold {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The object's owning thread.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }
}

impl Drop for ObjectHold {
    fn drop(&mut self) {
        global_registry().release_hold(self.id);
    }
}

/// The base trait that all objects must implement.
///
/// Types implementing this trait can emit signals (through
/// [`Signal::with_owner`](crate::Signal::with_owner)) and receive them
/// (as the receiver of a [`connect`](crate::Signal::connect) call).
///
/// # Example
///
/// ```
/// use tether_core::{Object, ObjectBase, ObjectId};
///
/// struct Label {
///     base: ObjectBase,
///     text: String,
/// }
///
/// impl Object for Label {
///     fn object_id(&self) -> ObjectId {
///         self.base.id()
///     }
/// }
///
/// let label = Label { base: ObjectBase::new::<Label>(), text: "hi".into() };
/// assert!(!label.base.is_destroyed());
/// assert_eq!(label.text, "hi");
/// ```
pub trait Object: Any + Send + Sync {
    /// Get this object's unique identifier.
    fn object_id(&self) -> ObjectId;
}

/// Configures an [`ObjectBase`] before registration.
///
/// ```
/// use tether_core::{DispatchPolicy, ObjectBase, ObjectBuilder};
///
/// let base = ObjectBuilder::new()
///     .name("worker-sink")
///     .dispatch_policy(DispatchPolicy::AlwaysCallerThread)
///     .build::<ObjectBase>();
/// assert_eq!(base.name(), "worker-sink");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectBuilder {
    name: Option<String>,
    thread: Option<ThreadId>,
    policy: DispatchPolicy,
}

impl ObjectBuilder {
    /// Create a builder for an object owned by the current thread.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object's name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Assign the object to a thread other than the creating one.
    ///
    /// That thread must attach its mailbox (for example by calling
    /// [`Dispatcher::current`](crate::Dispatcher::current)) before it can
    /// receive cross-thread deliveries. Until then they are dropped and logged.
    pub fn thread(mut self, thread: ThreadId) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Set the dispatch policy.
    pub fn dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register the object and return its base.
    pub fn build<T: Object + 'static>(self) -> ObjectBase {
        let affinity = match self.thread {
            Some(thread) => ThreadAffinity::for_thread(thread),
            None => ThreadAffinity::current(),
        };
        if affinity.is_same_thread() {
            crate::dispatcher::attach_current_thread();
        }

        let id = global_registry().with_write(|registry| {
            let id = registry.register::<T>(affinity, self.policy);
            if let Some(name) = self.name {
                // Freshly registered, cannot fail.
                let _ = registry.set_object_name(id, name);
            }
            id
        });
        ObjectBase { id, affinity }
    }
}

/// Helper for implementing the [`Object`] trait.
///
/// Include this as a field in your object types. On construction it
/// registers the object with the [`global_registry`]; on drop it destroys
/// the object, detaching it from every signal.
///
/// An `ObjectBase` is itself an [`Object`], which is convenient for plain
/// receivers that carry no other state.
pub struct ObjectBase {
    id: ObjectId,
    affinity: ThreadAffinity,
}

impl ObjectBase {
    /// Create a new ObjectBase owned by the current thread with the default
    /// dispatch policy.
    pub fn new<T: Object + 'static>() -> Self {
        ObjectBuilder::new().build::<T>()
    }

    /// Start configuring a new object.
    pub fn builder() -> ObjectBuilder {
        ObjectBuilder::new()
    }

    /// Get the object's ID.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A weak reference to this object.
    pub fn weak(&self) -> WeakObject {
        WeakObject::new(self.id)
    }

    /// The owning thread.
    pub fn thread(&self) -> ThreadId {
        self.affinity.thread_id()
    }

    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        global_registry().policy_of(self.id).unwrap_or_default()
    }

    /// Change where this object's handlers run.
    ///
    /// Must be called on the owning thread.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidObjectId`] if the object was already destroyed.
    pub fn set_dispatch_policy(&self, policy: DispatchPolicy) -> ObjectResult<()> {
        self.affinity
            .debug_assert_same_thread_with_msg("dispatch policy changed off the owning thread");
        global_registry().with_write(|registry| registry.set_policy(self.id, policy))
    }

    /// Get the object's name from the registry.
    pub fn name(&self) -> String {
        global_registry().object_name(self.id).unwrap_or_default()
    }

    /// Set the object's name in the registry.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidObjectId`] if the object was already destroyed.
    pub fn set_name(&self, name: impl Into<String>) -> ObjectResult<()> {
        let name = name.into();
        global_registry().with_write(|registry| registry.set_object_name(self.id, name))
    }

    pub fn is_destroyed(&self) -> bool {
        !global_registry().contains(self.id)
    }

    /// Destroy the object.
    ///
    /// Every slot targeting this object is removed from its signal, and every
    /// signal owned by this object loses all of its connections. Handlers of
    /// an emission already in progress may still finish. Calling this more
    /// than once has no further effect.
    #[tracing::instrument(skip(self), fields(id = ?self.id), target = "tether_core::object", level = "trace")]
    pub fn destroy(&self) {
        let Some(teardown) = global_registry().with_write(|registry| registry.begin_destroy(self.id))
        else {
            return;
        };

        for signal in teardown.incoming.iter().filter_map(Weak::upgrade) {
            signal.disconnect_receiver(self.id);
        }
        for signal in teardown.outgoing.iter().filter_map(Weak::upgrade) {
            signal.disconnect_all();
        }
    }
}

impl Object for ObjectBase {
    fn object_id(&self) -> ObjectId {
        self.id
    }
}

impl std::fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBase")
            .field("id", &self.id)
            .field("thread", &self.affinity.thread_id())
            .finish()
    }
}

impl Drop for ObjectBase {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct TestObject {
        base: ObjectBase,
        value: i32,
    }

    impl TestObject {
        fn new(value: i32) -> Self {
            Self {
                base: ObjectBase::new::<Self>(),
                value,
            }
        }
    }

    impl Object for TestObject {
        fn object_id(&self) -> ObjectId {
            self.base.id()
        }
    }

    /// Records the teardown calls it receives.
    struct RecordingLink {
        id: SignalId,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingLink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SignalId::next(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl SignalLink for RecordingLink {
        fn signal_id(&self) -> SignalId {
            self.id
        }

        fn disconnect_all(&self) -> usize {
            self.calls.lock().push("all".into());
            0
        }

        fn disconnect_receiver(&self, receiver: ObjectId) -> usize {
            self.calls.lock().push(format!("receiver {}", receiver.as_raw()));
            0
        }

        fn connection_count(&self) -> usize {
            0
        }
    }

    fn as_link(link: &Arc<RecordingLink>) -> Weak<dyn SignalLink> {
        let link: Arc<dyn SignalLink> = link.clone();
        Arc::downgrade(&link)
    }

    #[test]
    fn test_object_creation() {
        let obj = TestObject::new(42);
        assert!(global_registry().contains(obj.object_id()));
        assert_eq!(obj.base.thread(), std::thread::current().id());
        assert_eq!(obj.base.dispatch_policy(), DispatchPolicy::OwnerThreadOnly);
        assert_eq!(obj.value, 42);
    }

    #[test]
    fn test_object_name() {
        let obj = TestObject::new(1);
        obj.base.set_name("test_object").unwrap();
        assert_eq!(obj.base.name(), "test_object");
        assert_eq!(
            global_registry().with_read(|r| r.type_name(obj.object_id())),
            Ok(std::any::type_name::<TestObject>())
        );
    }

    #[test]
    fn test_drop_destroys() {
        let obj = TestObject::new(1);
        let id = obj.object_id();
        drop(obj);
        assert!(!global_registry().contains(id));
        assert!(WeakObject::new(id).resolve().is_none());
    }

    #[test]
    fn test_weak_resolution_fails_after_destroy_even_when_held() {
        let obj = TestObject::new(1);
        let weak = obj.base.weak();

        let hold = weak.resolve().expect("alive object resolves");
        assert_eq!(hold.thread(), std::thread::current().id());

        obj.base.destroy();
        assert!(obj.base.is_destroyed());
        assert!(weak.resolve().is_none());

        // The entry is pinned by the hold until it is released.
        let pinned = global_registry()
            .with_read(|r| r.snapshot().into_iter().any(|s| s.id == weak.id() && s.destroyed));
        assert!(pinned);

        drop(hold);
        let pinned = global_registry()
            .with_read(|r| r.snapshot().into_iter().any(|s| s.id == weak.id()));
        assert!(!pinned);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let obj = TestObject::new(1);
        let link = RecordingLink::new();
        global_registry()
            .with_write(|r| r.link_incoming(obj.object_id(), link.id, as_link(&link)))
            .unwrap();

        obj.base.destroy();
        obj.base.destroy();
        drop(obj);

        assert_eq!(link.calls.lock().len(), 1);
    }

    #[test]
    fn test_destroy_walks_incoming_and_outgoing() {
        let obj = TestObject::new(1);
        let id = obj.object_id();
        let incoming = RecordingLink::new();
        let outgoing = RecordingLink::new();

        global_registry().with_write(|r| {
            r.link_incoming(id, incoming.id, as_link(&incoming)).unwrap();
            r.register_outgoing(id, outgoing.id, as_link(&outgoing)).unwrap();
        });
        assert_eq!(global_registry().incoming_link_count(id), 1);
        assert_eq!(global_registry().outgoing_signal_count(id), 1);

        drop(obj);

        assert_eq!(*incoming.calls.lock(), vec![format!("receiver {}", id.as_raw())]);
        assert_eq!(*outgoing.calls.lock(), vec!["all".to_string()]);
    }

    #[test]
    fn test_incoming_links_count_per_signal() {
        let mut registry = ObjectRegistry::new();
        let id = registry.register::<ObjectBase>(ThreadAffinity::current(), DispatchPolicy::default());
        let link = RecordingLink::new();

        registry.link_incoming(id, link.id, as_link(&link)).unwrap();
        registry.link_incoming(id, link.id, as_link(&link)).unwrap();
        assert_eq!(registry.incoming_link_count(id), 1);
        assert_eq!(registry.incoming_slot_count(id), 2);

        registry.unlink_incoming(id, link.id);
        assert_eq!(registry.incoming_link_count(id), 1);
        registry.unlink_incoming(id, link.id);
        assert_eq!(registry.incoming_link_count(id), 0);

        // Unlinking an absent link is a no-op.
        registry.unlink_incoming(id, link.id);
        assert_eq!(registry.incoming_slot_count(id), 0);
    }

    #[test]
    fn test_link_to_destroyed_object_fails() {
        let mut registry = ObjectRegistry::new();
        let id = registry.register::<ObjectBase>(ThreadAffinity::current(), DispatchPolicy::default());
        let link = RecordingLink::new();

        assert!(registry.begin_destroy(id).is_some());
        assert!(registry.begin_destroy(id).is_none());
        assert_eq!(
            registry.link_incoming(id, link.id, as_link(&link)),
            Err(ObjectError::InvalidObjectId)
        );
        assert_eq!(registry.object_count(), 0);
    }

    #[test]
    fn test_builder_assigns_thread_and_policy() {
        let worker = std::thread::spawn(|| std::thread::current().id())
            .join()
            .unwrap();
        let base = ObjectBuilder::new()
            .name("remote")
            .thread(worker)
            .dispatch_policy(DispatchPolicy::AlwaysCallerThread)
            .build::<ObjectBase>();

        assert_eq!(base.thread(), worker);
        assert_eq!(base.name(), "remote");
        assert_eq!(global_registry().thread_of(base.id()), Ok(worker));
        assert_eq!(
            global_registry().policy_of(base.id()),
            Ok(DispatchPolicy::AlwaysCallerThread)
        );
    }

    #[test]
    fn test_set_dispatch_policy() {
        let base = ObjectBase::new::<ObjectBase>();
        base.set_dispatch_policy(DispatchPolicy::AlwaysCallerThread).unwrap();
        assert_eq!(base.dispatch_policy(), DispatchPolicy::AlwaysCallerThread);
        let hold = base.weak().resolve().unwrap();
        assert_eq!(hold.policy(), DispatchPolicy::AlwaysCallerThread);
    }

    #[test]
    fn test_setters_on_destroyed_object_fail() {
        let base = ObjectBase::new::<ObjectBase>();
        base.destroy();

        assert_eq!(base.set_name("gone"), Err(ObjectError::InvalidObjectId));
        assert_eq!(
            base.set_dispatch_policy(DispatchPolicy::AlwaysCallerThread),
            Err(ObjectError::InvalidObjectId)
        );
        assert_eq!(base.name(), "");
    }
}
