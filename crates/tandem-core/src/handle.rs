//! Serialized exclusive access to the cryptographic engine.
//!
//! The engine keeps mutable, persisted ratchet and group state. Two
//! concurrent read-modify-write cycles against the same session would
//! desynchronize the ratchet with the remote party, so every engine call goes
//! through [`EngineHandle::perform`].
//!
//! Ordering uses a ticket scheme: a caller draws a ticket when it submits an
//! operation and the operation runs only once every earlier ticket has
//! finished. A plain mutex would guarantee exclusion but not submission order.

#![allow(clippy::disallowed_types, reason = "Blocking exclusive access, no async callers")]

use std::sync::{
    Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

/// Exclusive, FIFO-ordered access to an engine of type `E`.
///
/// Shared between services through `Arc`. `Sync` whenever `E: Send`.
///
/// # Invariants
///
/// - At most one operation observes `&mut E` at any time
/// - Operations run in ticket (submission) order
/// - An operation's side effects on the engine are complete before the next
///   operation starts
/// - A panicking operation still releases its turn
pub struct EngineHandle<E> {
    next_ticket: AtomicU64,
    slot: Mutex<Slot<E>>,
    turn_changed: Condvar,
}

struct Slot<E> {
    engine: E,
    now_serving: u64,
}

impl<E> EngineHandle<E> {
    /// Wrap an engine. The handle becomes its only access path.
    pub fn new(engine: E) -> Self {
        Self {
            next_ticket: AtomicU64::new(0),
            slot: Mutex::new(Slot { engine, now_serving: 0 }),
            turn_changed: Condvar::new(),
        }
    }

    /// Run `operation` with exclusive access to the engine.
    ///
    /// Blocks until every previously submitted operation has completed. The
    /// operation's return value is passed through untouched: no retry, no
    /// rollback of engine-internal persistence.
    pub fn perform<R>(&self, operation: impl FnOnce(&mut E) -> R) -> R {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.slot.lock().unwrap_or_else(recover);
        // A poisoned wait still returns on any wakeup, so recheck the turn
        while guard.now_serving != ticket {
            guard = self.turn_changed.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }

        let mut turn = Turn { guard, turn_changed: &self.turn_changed };
        operation(&mut turn.guard.engine)
    }

    /// Consume the handle and return the engine.
    pub fn into_inner(self) -> E {
        self.slot.into_inner().unwrap_or_else(PoisonError::into_inner).engine
    }
}

/// The slot is only poisoned when an operation panicked. Its turn was still
/// released, so the remaining queue keeps draining against the engine state
/// as that operation left it.
fn recover<G>(poisoned: PoisonError<G>) -> G {
    tracing::warn!("previous engine operation panicked, continuing with current engine state");
    poisoned.into_inner()
}

/// Holds the lock for one operation and hands the turn to the next ticket on
/// drop, including during unwinding.
struct Turn<'a, E> {
    guard: MutexGuard<'a, Slot<E>>,
    turn_changed: &'a Condvar,
}

impl<E> Drop for Turn<'_, E> {
    fn drop(&mut self) {
        self.guard.now_serving = self.guard.now_serving.wrapping_add(1);
        self.turn_changed.notify_all();
    }
}
