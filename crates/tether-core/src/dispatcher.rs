//! Per-thread mailboxes for cross-thread slot delivery.
//!
//! When a signal is emitted on one thread and a receiver is owned by another,
//! the slot invocation is wrapped in a [`QueuedInvocation`] and sent to the
//! owning thread's mailbox. The owning thread runs queued work whenever its
//! message loop calls one of the [`Dispatcher`] drain methods.
//!
//! # How It Works
//!
//! 1. Every thread that creates an object (or calls [`Dispatcher::current`])
//!    attaches a mailbox, an unbounded FIFO channel registered under its
//!    [`ThreadId`]. Only the thread itself can attach its mailbox.
//!
//! 2. [`Dispatcher::enqueue_to`] sends invocations into that channel from any
//!    thread. Invocations from one sender arrive in the order they were sent.
//!
//! 3. The owning thread drains the channel with
//!    [`process_messages`](Dispatcher::process_messages),
//!    [`process_batch`](Dispatcher::process_batch) or
//!    [`process_until`](Dispatcher::process_until). Failures and panics of
//!    queued handlers are contained, logged and kept for
//!    [`take_errors`](Dispatcher::take_errors).
//!
//! 4. When the thread exits its mailbox is closed: pending work is dropped and
//!    later deliveries fail with [`DispatchError::MailboxClosed`], as do
//!    deliveries to a thread that never attached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::RwLock;

use crate::error::{DispatchError, HandlerError};
use crate::logging::{PerfSpan, targets};

/// Default number of invocations run by [`Dispatcher::process_batch`].
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Number of handler failures kept per thread until taken.
pub const ERROR_CHANNEL_CAPACITY: usize = 256;

/// A type-erased invocation that runs later on another thread.
///
/// This wraps a closure that captures the slot and its arguments.
pub struct QueuedInvocation {
    invoke: Box<dyn FnOnce() -> Result<(), HandlerError> + Send>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() -> Result<(), HandlerError> + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
        }
    }

    /// Execute the invocation, converting a panic into a [`HandlerError`].
    pub fn execute(self) -> Result<(), HandlerError> {
        let invoke = self.invoke;
        match catch_unwind(AssertUnwindSafe(move || invoke())) {
            Ok(result) => result,
            Err(payload) => Err(HandlerError::from_panic(payload)),
        }
    }
}

impl fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedInvocation").finish_non_exhaustive()
    }
}

struct Mailbox {
    thread: ThreadId,
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
    errors_tx: Sender<HandlerError>,
    errors_rx: Receiver<HandlerError>,
    closed: AtomicBool,
}

impl Mailbox {
    fn new(thread: ThreadId) -> Self {
        let (sender, receiver) = unbounded();
        let (errors_tx, errors_rx) = bounded(ERROR_CHANNEL_CAPACITY);
        Self {
            thread,
            sender,
            receiver,
            errors_tx,
            errors_rx,
            closed: AtomicBool::new(false),
        }
    }

    /// Drop every pending invocation. Only valid once the mailbox is closed.
    fn discard_pending(&self) -> usize {
        let pending: Vec<QueuedInvocation> = self.receiver.try_iter().collect();
        let count = pending.len();
        drop(pending);
        count
    }
}

/// Mailboxes of attached threads that have not exited yet.
type Mailboxes = HashMap<ThreadId, Arc<Mailbox>>;

static MAILBOXES: OnceLock<RwLock<Mailboxes>> = OnceLock::new();

fn mailboxes() -> &'static RwLock<Mailboxes> {
    MAILBOXES.get_or_init(|| RwLock::new(Mailboxes::default()))
}

fn mailbox_for(thread: ThreadId) -> Result<Arc<Mailbox>, DispatchError> {
    mailboxes()
        .read()
        .get(&thread)
        .cloned()
        .ok_or(DispatchError::MailboxClosed(thread))
}

/// Ties a mailbox to the lifetime of its thread.
struct AttachedMailbox(Arc<Mailbox>);

impl Drop for AttachedMailbox {
    fn drop(&mut self) {
        let thread = self.0.thread;
        mailboxes().write().remove(&thread);
        self.0.closed.store(true, Ordering::Release);
        let dropped = self.0.discard_pending();
        if dropped > 0 {
            tracing::debug!(target: targets::DISPATCHER, ?thread, dropped, "thread exited with undelivered invocations");
        }
    }
}

thread_local! {
    static ATTACHED: RefCell<Option<AttachedMailbox>> = const { RefCell::new(None) };
}

fn current_mailbox() -> Option<Arc<Mailbox>> {
    ATTACHED
        .try_with(|attached| {
            let mut attached = attached.borrow_mut();
            if let Some(AttachedMailbox(mailbox)) = attached.as_ref() {
                return Arc::clone(mailbox);
            }
            let thread = std::thread::current().id();
            let mailbox = Arc::clone(
                mailboxes()
                    .write()
                    .entry(thread)
                    .or_insert_with(|| Arc::new(Mailbox::new(thread))),
            );
            *attached = Some(AttachedMailbox(Arc::clone(&mailbox)));
            mailbox
        })
        .ok()
}

/// Make sure the calling thread has a mailbox that closes when it exits.
pub(crate) fn attach_current_thread() {
    let _ = current_mailbox();
}

/// Configuration for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of invocations run by one
    /// [`process_batch`](Dispatcher::process_batch) call.
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Drains the calling thread's mailbox.
///
/// A `Dispatcher` is bound to the thread that created it and cannot be sent
/// to another thread.
///
/// # Example
///
/// ```
/// use tether_core::{Dispatcher, QueuedInvocation};
///
/// let dispatcher = Dispatcher::current();
/// let here = std::thread::current().id();
/// Dispatcher::enqueue_to(here, QueuedInvocation::new(|| Ok(()))).unwrap();
///
/// assert_eq!(dispatcher.pending_count(), 1);
/// assert_eq!(dispatcher.process_messages(), 1);
/// ```
pub struct Dispatcher {
    mailbox: Arc<Mailbox>,
    config: DispatcherConfig,
    _not_send: PhantomData<*const ()>,
}

impl Dispatcher {
    /// The dispatcher of the calling thread, with the default configuration.
    pub fn current() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// The dispatcher of the calling thread, with a custom configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        let mailbox = current_mailbox()
            .unwrap_or_else(|| Arc::new(Mailbox::new(std::thread::current().id())));
        Self {
            mailbox,
            config,
            _not_send: PhantomData,
        }
    }

    /// Queue an invocation onto `thread`'s mailbox.
    ///
    /// Never blocks. Invocations sent from one thread to the same destination
    /// run in the order they were sent.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MailboxClosed`] if `thread` has already exited or
    /// never attached a mailbox.
    pub fn enqueue_to(thread: ThreadId, invocation: QueuedInvocation) -> Result<(), DispatchError> {
        let mailbox = mailbox_for(thread)?;
        if mailbox.closed.load(Ordering::Acquire) {
            return Err(DispatchError::MailboxClosed(thread));
        }
        mailbox
            .sender
            .send(invocation)
            .map_err(|_| DispatchError::MailboxClosed(thread))?;

        // The thread may have exited between the check and the send.
        if mailbox.closed.load(Ordering::Acquire) {
            mailbox.discard_pending();
        }
        Ok(())
    }

    /// The thread whose mailbox this dispatcher drains.
    pub fn thread_id(&self) -> ThreadId {
        self.mailbox.thread
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Set the batch size for [`process_batch`](Self::process_batch).
    pub fn set_batch_size(&mut self, size: usize) {
        self.config.batch_size = size;
    }

    /// Get the number of pending invocations.
    pub fn pending_count(&self) -> usize {
        self.mailbox.receiver.len()
    }

    /// Check if there are any pending invocations.
    pub fn has_pending(&self) -> bool {
        !self.mailbox.receiver.is_empty()
    }

    /// Run every invocation that was pending when the call started.
    ///
    /// Invocations queued while draining are left for the next call.
    /// Returns the number of invocations run.
    pub fn process_messages(&self) -> usize {
        let _span = PerfSpan::new("process_messages");
        self.process_up_to(self.pending_count())
    }

    /// Run up to `batch_size` pending invocations.
    ///
    /// Returns the number of invocations run.
    pub fn process_batch(&self) -> usize {
        self.process_up_to(self.config.batch_size)
    }

    /// Process messages until `done` returns `true` or `timeout` elapses.
    ///
    /// Blocks waiting for new invocations in between. Returns the final
    /// value of `done`.
    pub fn process_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_messages();
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.mailbox.receiver.recv_timeout(remaining) {
                Ok(invocation) => self.run(invocation),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }

    /// Take the failures reported by queued handlers on this thread.
    pub fn take_errors(&self) -> Vec<HandlerError> {
        self.mailbox.errors_rx.try_iter().collect()
    }

    fn process_up_to(&self, limit: usize) -> usize {
        let mut processed = 0;
        while processed < limit {
            let Ok(invocation) = self.mailbox.receiver.try_recv() else {
                break;
            };
            self.run(invocation);
            processed += 1;
        }
        processed
    }

    fn run(&self, invocation: QueuedInvocation) {
        if let Err(err) = invocation.execute() {
            tracing::warn!(target: targets::DISPATCHER, thread = ?self.mailbox.thread, %err, "queued slot handler failed");
            if self.mailbox.errors_tx.try_send(err).is_err() {
                tracing::debug!(target: targets::DISPATCHER, "error channel full, dropping handler error");
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("thread", &self.mailbox.thread)
            .field("pending", &self.pending_count())
            .field("config", &self.config)
            .finish()
    }
}
