//! # Per-bus mutual exclusion
//!
//! The CLK/DIO lines are physically shared by every chip on a bus, so two
//! transactions must never interleave their clock pulses — not even
//! transactions addressed to different chips. Each [`Bus`](crate::Bus) owns
//! one [`BusMutex`] and holds it for the whole duration of every transaction
//! (the scoped closure releases it on every exit path). Independent buses
//! use independent locks and can run concurrently.
//!
//! Pick the implementation that matches your execution model:
//!
//! - [`NullMutex`]: single execution context, no real locking (a `RefCell`).
//! - `std::sync::Mutex`: hosted targets and the test suite (`std` feature).
//! - [`CriticalSectionMutex`]: bare-metal targets with interrupts or
//!   preemptive tasks (`critical-section` feature).

use core::cell::RefCell;

/// A mutex owning the bus state it protects.
///
/// Same shape as the bus-sharing mutexes used by the shared-bus family of
/// crates: the value lives inside the lock and is only reachable through
/// [`lock`](BusMutex::lock).
pub trait BusMutex {
    /// The protected value.
    type Bus;

    /// Wrap `v` in a fresh, unlocked mutex.
    fn create(v: Self::Bus) -> Self;

    /// Run `f` with exclusive access to the protected value.
    ///
    /// Blocks (or spins, depending on the implementation) until the lock is
    /// available; there is no timeout anywhere in this driver.
    fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(&self, f: F) -> R;

    /// Consume the mutex and return the protected value.
    fn into_inner(self) -> Self::Bus;
}

/// No-op mutex for single-context use.
///
/// Not `Sync`; the borrow checker keeps it inside one execution context,
/// which is exactly the situation where no locking is required.
#[derive(Debug)]
pub struct NullMutex<T> {
    cell: RefCell<T>,
}

impl<T> BusMutex for NullMutex<T> {
    type Bus = T;

    fn create(v: T) -> Self {
        NullMutex {
            cell: RefCell::new(v),
        }
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        f(&mut self.cell.borrow_mut())
    }

    fn into_inner(self) -> T {
        self.cell.into_inner()
    }
}

#[cfg(feature = "std")]
impl<T> BusMutex for std::sync::Mutex<T> {
    type Bus = T;

    fn create(v: T) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut guard = self.lock().unwrap();
        f(&mut guard)
    }

    fn into_inner(self) -> T {
        std::sync::Mutex::into_inner(self).unwrap()
    }
}

/// Mutex that disables interrupts for the duration of the lock, via the
/// `critical-section` crate.
///
/// The transaction keeps running to completion inside the critical section
/// using only busy-wait microsecond delays; the protocol's timing budget is
/// too tight for scheduler latency.
#[cfg(feature = "critical-section")]
pub struct CriticalSectionMutex<T> {
    cell: critical_section::Mutex<RefCell<T>>,
}

#[cfg(feature = "critical-section")]
impl<T> BusMutex for CriticalSectionMutex<T> {
    type Bus = T;

    fn create(v: T) -> Self {
        CriticalSectionMutex {
            cell: critical_section::Mutex::new(RefCell::new(v)),
        }
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| f(&mut self.cell.borrow_ref_mut(cs)))
    }

    fn into_inner(self) -> T {
        self.cell.into_inner().into_inner()
    }
}
