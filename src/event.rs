//! The waitable handle distributed by the lazy signals.
//!
//! An [`Event`] is a one-shot waitable flag: it starts unset, is set at most
//! logically once, and never reverts. Any number of threads may block on it
//! concurrently. The implementation packs the whole state into a single
//! `AtomicU8` and uses `parking_lot_core`'s futex-style parking for the
//! blocking path, so an uncontended check is a single atomic load.
//!
//! The state layout:
//! - Bit 0: SET - The event has been signaled.
//! - Bit 1: PARKED - At least one thread is parked waiting for the signal.
//!
//! Setting the event swaps the state to `SET` unconditionally, which makes
//! signaling idempotent: only the first swap observes the state without `SET`
//! and only it wakes parked threads.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// A one-shot waitable flag.
///
/// Events are handed out by [`LazySignal::done`](crate::LazySignal::done) and
/// [`PointerLazySignal::done`](crate::PointerLazySignal::done) as
/// `Arc<Event>`, so an observer may keep waiting on a handle even after the
/// signal that produced it has been dropped.
///
/// Consumers can only observe an event ([`wait`](Self::wait),
/// [`is_set`](Self::is_set)); signaling it is reserved to the owning signal's
/// `close`.
pub struct Event {
   state: AtomicU8,
}

impl Event {
   /// Bit flag: The event has been signaled.
   const SET: u8 = 1;
   /// Bit flag: At least one thread is parked on this event.
   const PARKED: u8 = 2;

   /// Creates a new, unset event.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         state: AtomicU8::new(0),
      }
   }

   /// Creates an event that is already signaled.
   #[inline]
   pub(crate) const fn with_set() -> Self {
      Self {
         state: AtomicU8::new(Self::SET),
      }
   }

   /// Signals the event, waking every parked waiter.
   ///
   /// Idempotent: the state never leaves `SET`, and only the call that
   /// performed the unset-to-set transition wakes anyone.
   #[inline]
   pub(crate) fn notify(&self) {
      // Release ordering ensures that writes made before signaling
      // happen-before any waiter that observes the set state.
      let prev = self.state.swap(Self::SET, Ordering::Release);

      if prev & Self::PARKED != 0 {
         // SAFETY: The address passed to unpark must match the address used
         // for park. We consistently use the address of the AtomicU8.
         unsafe {
            parking_lot_core::unpark_all(self.state.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
         }
      }
   }

   /// Returns `true` if the event has been signaled.
   ///
   /// This method never blocks. Once it returns `true` it returns `true`
   /// forever.
   #[inline]
   pub fn is_set(&self) -> bool {
      self.state.load(Ordering::Acquire) & Self::SET != 0
   }

   /// Blocks the calling thread until the event is signaled.
   ///
   /// Returns immediately if the event is already set.
   pub fn wait(&self) {
      loop {
         let state = self.state.load(Ordering::Acquire);
         if state & Self::SET != 0 {
            return;
         }

         // Make sure the PARKED flag is up before sleeping, so that notify
         // knows someone needs waking.
         if state & Self::PARKED == 0 {
            match self.state.compare_exchange_weak(
               state,
               state | Self::PARKED,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => {}
               Err(_) => {
                  // State changed under us; maybe it just got set.
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // SAFETY: See safety comment in `notify`.
         unsafe {
            // park() re-checks the condition closure before sleeping and only
            // sleeps while the state is still "parked waiters, not set".
            let _ = parking_lot_core::park(
               self.state.as_ptr() as usize,
               || self.state.load(Ordering::Acquire) == Self::PARKED,
               || {},
               |_, _| {},
               DEFAULT_PARK_TOKEN,
               None,
            );
         }
         // Wake-ups may be spurious; the loop re-checks the state.
      }
   }

   /// Waits for the event to be signaled without blocking the async runtime.
   ///
   /// Tries spinning/yielding first, then falls back to `block_in_place`.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn wait_async(&self) {
      #[allow(clippy::never_loop)]
      loop {
         // Spin/yield loop
         for _ in 0..16 {
            if self.is_set() {
               return;
            }
            for _ in 0..32 {
               // Yield to allow other tasks to run, hoping the closer gets
               // scheduled.
               tokio::task::yield_now().await;
               if self.is_set() {
                  return;
               }
            }
         }

         // Fallback to a blocking wait if spin/yield didn't work
         #[cfg(feature = "async-tokio-mt")]
         {
            return tokio::task::block_in_place(|| self.wait());
         }
      }
   }
}

impl fmt::Debug for Event {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Event")
         .field(&format_args!(
            "{}",
            if self.is_set() { "set" } else { "unset" }
         ))
         .finish()
   }
}

/// Returns the process-wide, permanently signaled terminal event.
///
/// Constructed at most once, on first need, and shared by every signal
/// instance as the "already closed" marker. Compared only by address, never
/// mutated after construction.
pub(crate) fn closed_event() -> &'static Arc<Event> {
   static CLOSED: OnceLock<Arc<Event>> = OnceLock::new();
   CLOSED.get_or_init(|| Arc::new(Event::with_set()))
}
