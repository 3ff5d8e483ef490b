// src/core/invalidation.rs

//! Engine-wide switch for invalidation propagation.
//!
//! The first detected invalidation cycle turns propagation off: every later
//! `Property::invalidate` becomes a no-op until `reactivate` is called. Properties are
//! `Rc`-based and never leave the thread that built them, so the switch is per thread.

use std::cell::Cell;

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(true) };
}

/// Whether invalidations are currently propagated.
pub fn is_active() -> bool {
    ACTIVE.with(Cell::get)
}

/// Turns invalidation off for the rest of the engine's life.
pub(crate) fn deactivate() {
    log::error!("Invalidation cycle detected. Invalidation is now deactivated.");
    ACTIVE.with(|active| active.set(false));
}

/// Turns invalidation back on after a cycle has been fixed.
pub fn reactivate() {
    log::warn!("Invalidation reactivated.");
    ACTIVE.with(|active| active.set(true));
}
