//! Error types for Tether.

use std::any::Any;
use std::thread::ThreadId;

use crate::object::ObjectId;

/// A failure raised by user code while a slot handler was running.
///
/// Fallible handlers (see [`Signal::connect_fallible`](crate::Signal::connect_fallible))
/// return this directly. Panics caught at a cross-thread delivery boundary are
/// converted into [`HandlerError::Panicked`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("slot handler failed: {0}")]
    Failed(String),
    /// The handler panicked.
    #[error("slot handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Create a handler failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Build an error from a panic payload returned by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        };
        Self::Panicked(message)
    }

    /// The message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Failed(message) | Self::Panicked(message) => message,
        }
    }

    /// Whether the handler panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// [`disconnect()`](crate::signal::disconnect) was called while no slot
    /// handler was running on this thread.
    #[error("disconnect() called outside of an active slot invocation")]
    NoActiveHandler,
    /// The receiver passed to a connect call has already been destroyed.
    #[error("receiver {0:?} has been destroyed")]
    ReceiverDestroyed(ObjectId),
    /// A same-thread handler failed; the emission was aborted.
    #[error(transparent)]
    HandlerFailed(#[from] HandlerError),
}

/// Errors raised when marshaling an invocation onto another thread.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The destination thread has no open mailbox: it never attached one, or
    /// it has exited.
    #[error("no open mailbox for thread {0:?}")]
    MailboxClosed(ThreadId),
}

/// Result type for signal operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;
