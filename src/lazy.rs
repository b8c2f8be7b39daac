//! The word-punned lazy signal variant.
//!
//! [`LazySignal`] stores its handle, an `Arc<Event>`, by punning the `Arc`'s
//! own representation (a single pointer) directly into the atomic word of a
//! [`HandleCell`]. Creating a signal allocates nothing; the event is
//! allocated by whichever call first needs it.
//!
//! See [`PointerLazySignal`](crate::PointerLazySignal) for the
//! representation-agnostic variant with an identical contract.

use core::fmt;
use core::ptr;
use std::sync::Arc;

use crate::cell::HandleCell;
use crate::event::{closed_event, Event};

/// A lazily initialized, single-shot completion signal.
///
/// The signal moves through three states: *unborn* (nothing allocated),
/// *pending* (a live, unsignaled event installed by the first
/// [`done`](Self::done)) and *closed* (terminal; never left). A fresh
/// `LazySignal` is free to construct and valid to use immediately.
///
/// Producers call [`close`](Self::close) when the result the signal guards
/// is ready; any number of consumers call [`done`](Self::done) and block on
/// the returned [`Event`], or poll [`closed`](Self::closed).
///
/// A `LazySignal` must not be duplicated once shared: it is deliberately
/// neither `Clone` nor `Copy`, since a copy would split observers across two
/// independent cells.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
///
/// use lazy_signal::LazySignal;
///
/// let signal = Arc::new(LazySignal::new());
/// assert_eq!(signal.to_string(), "pending");
///
/// let producer = Arc::clone(&signal);
/// thread::spawn(move || producer.close());
///
/// signal.done().wait();
/// assert_eq!(signal.to_string(), "done");
/// ```
pub struct LazySignal {
   cell: HandleCell<Arc<Event>>,
}

impl LazySignal {
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
   /// Idempotent: calling `close` any number of times, sequentially or
   /// concurrently, signals the event exactly once and never faults.
   pub fn close(&self) {
      let sentinel = closed_event();
      if let Some(prev) = self.cell.swap(Arc::clone(sentinel)) {
         // Only the call that displaced the live handle signals it; later
         // calls displace another sentinel clone and do nothing.
         if !ptr::eq(prev, Arc::as_ptr(sentinel)) {
            prev.notify();
         }
      }
   }

   /// Returns the waitable handle, allocating it on first use.
   ///
   /// Every caller, regardless of how it interleaves with
   /// [`close`](Self::close), receives a handle that is or will become
   /// signaled by the unique closing call. Performs at most one allocation
   /// and one fallback load.
   pub fn done(&self) -> Arc<Event> {
      if let Some(event) = self.cell.load() {
         return event;
      }

      let fresh = Arc::new(Event::new());
      match self.cell.compare_and_swap(ptr::null(), Arc::clone(&fresh)) {
         Ok(()) => fresh,
         // Lost the install race: either another `done` installed a live
         // event or a concurrent `close` installed the sentinel. The losing
         // candidate is discarded, never returned; handing it out would
         // strand its holder on an event nobody will ever signal.
         Err(_discarded) => match self.cell.load() {
            Some(event) => event,
            None => unreachable!("cell regressed to empty after a lost install race"),
         },
      }
   }

   /// Returns `true` if the signal has been completed.
   ///
   /// This method never blocks and is monotonic: once it returns `true` it
   /// returns `true` forever.
   #[inline]
   pub fn closed(&self) -> bool {
      match self.cell.get() {
         Some(event) => event.is_set(),
         None => false,
      }
   }
}

impl Default for LazySignal {
   /// Creates a new, open signal.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Display for LazySignal {
   /// Renders `"pending"` while open and `"done"` once closed.
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(if self.closed() { "done" } else { "pending" })
   }
}

impl fmt::Debug for LazySignal {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("LazySignal")
         .field(&format_args!("{self}"))
         .finish()
   }
}
