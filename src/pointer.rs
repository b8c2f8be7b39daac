//! The pointer-indirection lazy signal variant.
//!
//! [`PointerLazySignal`] has the same state machine and the same guarantees
//! as [`LazySignal`](crate::LazySignal), but its cell stores a pointer to a
//! heap box containing the handle rather than the handle's own
//! representation. That costs one extra allocation and indirection per
//! lazily created handle and assumes nothing about the handle's layout,
//! which makes it the portable default of the two variants.

use core::fmt;
use core::ptr;
use std::sync::Arc;

use crate::cell::HandleCell;
use crate::event::{closed_event, Event};

/// A lazily initialized, single-shot completion signal storing its handle
/// behind a pointer.
///
/// Behaviorally identical to [`LazySignal`](crate::LazySignal): same states,
/// same idempotent [`close`](Self::close), same no-stranded-waiter guarantee
/// from [`done`](Self::done). Like its sibling it is neither `Clone` nor
/// `Copy`; duplicating a shared signal is a compile-time error.
///
/// # Examples
///
/// ```rust
/// use lazy_signal::PointerLazySignal;
///
/// let signal = PointerLazySignal::new();
/// assert!(!signal.closed());
///
/// signal.close();
/// assert!(signal.closed());
/// assert!(signal.done().is_set());
/// ```
pub struct PointerLazySignal {
   cell: HandleCell<Box<Arc<Event>>>,
}

impl PointerLazySignal {
   /// Creates a new, open signal. Allocates nothing.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         cell: HandleCell::new(),
      }
   }

   /// Completes the signal, waking every waiter.
   ///
   /// Idempotent under arbitrary repetition and concurrency. Each call
   /// installs a fresh box around the shared sentinel event, so sentinel
   /// identity is judged by the event's address, not the box's.
   pub fn close(&self) {
      let sentinel = closed_event();
      if let Some(prev) = self.cell.swap(Box::new(Arc::clone(sentinel))) {
         if !ptr::eq(Arc::as_ptr(prev), Arc::as_ptr(sentinel)) {
            prev.notify();
         }
      }
   }

   /// Returns the waitable handle, allocating it on first use.
   ///
   /// Same guarantee as [`LazySignal::done`](crate::LazySignal::done): a
   /// losing install race falls through to the value actually in the cell,
   /// never to the discarded candidate.
   pub fn done(&self) -> Arc<Event> {
      if let Some(boxed) = self.cell.load() {
         return *boxed;
      }

      let fresh = Arc::new(Event::new());
      match self
         .cell
         .compare_and_swap(ptr::null(), Box::new(Arc::clone(&fresh)))
      {
         Ok(()) => fresh,
         Err(_discarded) => match self.cell.load() {
            Some(boxed) => *boxed,
            None => unreachable!("cell regressed to empty after a lost install race"),
         },
      }
   }

   /// Returns `true` if the signal has been completed.
   ///
   /// Never blocks; monotonic.
   #[inline]
   pub fn closed(&self) -> bool {
      match self.cell.get() {
         Some(event) => event.is_set(),
         None => false,
      }
   }
}

impl Default for PointerLazySignal {
   /// Creates a new, open signal.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Display for PointerLazySignal {
   /// Renders `"pending"` while open and `"done"` once closed.
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(if self.closed() { "done" } else { "pending" })
   }
}

impl fmt::Debug for PointerLazySignal {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("PointerLazySignal")
         .field(&format_args!("{self}"))
         .finish()
   }
}
