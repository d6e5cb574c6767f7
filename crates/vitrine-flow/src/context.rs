//! Explicit per-session context.
//!
//! Replaces a process-wide "current session" with a value the owner threads
//! through its calls. A refresh that started under one generation is only
//! applied if the session is still active and still in that generation, so
//! a response that lands after logout cannot bring the session back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Generation observed when a refresh began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    active: AtomicBool,
    generation: AtomicU64,
}

/// Whether a session is expected to be active. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// A context with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a new session active (after sign-in).
    pub fn begin(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.active.store(true, Ordering::SeqCst);
    }

    /// Mark the session ended (logout or unrecoverable refresh failure).
    pub fn end(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether a session is expected to be active.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Take a ticket before starting a refresh. `None` when inactive.
    pub fn ticket(&self) -> Option<RefreshTicket> {
        self.is_active().then(|| RefreshTicket {
            generation: self.inner.generation.load(Ordering::SeqCst),
        })
    }

    /// Whether a refresh started with `ticket` may still be applied.
    pub fn accepts(&self, ticket: RefreshTicket) -> bool {
        self.is_active() && self.inner.generation.load(Ordering::SeqCst) == ticket.generation
    }
}
