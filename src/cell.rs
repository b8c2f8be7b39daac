//! A linearizable atomic slot holding a single owned handle.
//!
//! [`HandleCell`] is the storage primitive underneath both signal variants:
//! an atomically accessed reference slot whose value is either *empty* or one
//! owned handle. All operations (load, get, store, swap, compare-and-swap)
//! are single atomic instructions on the underlying pointer and linearize
//! with respect to each other.
//!
//! The cell is generic over the handle's storage representation through the
//! [`Handle`] trait: `Arc<T>` stores the handle's own bits directly in the
//! atomic word, while `Box<Arc<T>>` stores a pointer to a heap box, at the
//! cost of an allocation and an indirection per stored handle.
//!
//! # Reclamation
//!
//! A value displaced from the cell is not freed immediately: a concurrent
//! `load` may already have read its raw pointer and be about to clone it.
//! Instead, displaced values are pushed onto an internal retire list and only
//! released when the cell itself is dropped. Every pointer ever installed in
//! the cell therefore stays valid for the cell's whole lifetime, which is
//! what makes `load`'s clone-from-raw and the borrows returned by `get` and
//! `swap` sound.
//!
//! In the intended single-shot-signal protocol the retire list stays tiny: at
//! most one live handle is ever displaced per cell, plus one short-lived
//! sentinel clone per redundant close.

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Conversion between an owned handle and the raw pointer stored in a
/// [`HandleCell`].
///
/// # Safety
///
/// Implementors must guarantee:
/// - `into_raw` relinquishes ownership of exactly one handle and returns a
///   non-null pointer whose pointee stays at a stable address for as long as
///   that ownership is not reclaimed through `from_raw`.
/// - `from_raw` reclaims the ownership given up by exactly one prior
///   `into_raw` of the same pointer.
/// - `clone_raw` mints a new, independently owned handle from a pointer
///   produced by `into_raw` whose ownership has not yet been reclaimed, and
///   is safe to call from any thread racing with other `clone_raw` calls.
pub unsafe trait Handle: Sized {
   /// The pointee the raw representation points at.
   type Pointee;

   /// Consumes the handle, returning its raw pointer.
   fn into_raw(self) -> *mut Self::Pointee;

   /// Reclaims a handle previously given up via [`into_raw`](Self::into_raw).
   ///
   /// # Safety
   ///
   /// `raw` must come from `into_raw` and its ownership must not have been
   /// reclaimed already.
   unsafe fn from_raw(raw: *mut Self::Pointee) -> Self;

   /// Creates an additional owned handle from a raw pointer, leaving the
   /// original ownership in place.
   ///
   /// # Safety
   ///
   /// `raw` must come from `into_raw` and the original ownership must remain
   /// live for the duration of the call.
   unsafe fn clone_raw(raw: *mut Self::Pointee) -> Self;
}

// SAFETY: `Arc::into_raw`/`Arc::from_raw` transfer one strong count, and
// `clone_raw` mints a new strong count with the original still held by the
// caller's contract. The strong count is itself atomic, so racing clones are
// fine.
unsafe impl<T: Send + Sync> Handle for Arc<T> {
   type Pointee = T;

   #[inline]
   fn into_raw(self) -> *mut T {
      Arc::into_raw(self).cast_mut()
   }

   #[inline]
   unsafe fn from_raw(raw: *mut T) -> Self {
      // SAFETY: Forwarded from the caller.
      unsafe { Arc::from_raw(raw) }
   }

   #[inline]
   unsafe fn clone_raw(raw: *mut T) -> Self {
      // SAFETY: The caller guarantees `raw` is a live Arc allocation, so its
      // strong count is at least one for the duration of this call.
      unsafe {
         Arc::increment_strong_count(raw);
         Arc::from_raw(raw)
      }
   }
}

// SAFETY: `Box::into_raw`/`Box::from_raw` transfer the unique ownership of
// the heap box. `clone_raw` never touches the box's ownership; it reads
// through the pointer and clones the inner Arc into a fresh box.
unsafe impl<T: Send + Sync> Handle for Box<Arc<T>> {
   type Pointee = Arc<T>;

   #[inline]
   fn into_raw(self) -> *mut Arc<T> {
      Box::into_raw(self)
   }

   #[inline]
   unsafe fn from_raw(raw: *mut Arc<T>) -> Self {
      // SAFETY: Forwarded from the caller.
      unsafe { Box::from_raw(raw) }
   }

   #[inline]
   unsafe fn clone_raw(raw: *mut Arc<T>) -> Self {
      // SAFETY: The caller guarantees the box is still owned elsewhere, so
      // reading through the pointer is valid. Cloning the inner Arc is an
      // atomic refcount increment.
      Box::new(Arc::clone(unsafe { &*raw }))
   }
}

/// Node of the intrusive retire list holding displaced values until the cell
/// is dropped.
struct Retired<P> {
   value: *mut P,
   next: *mut Retired<P>,
}

/// An atomic slot holding one owned handle, or nothing.
///
/// The empty state is represented by a null pointer, so a `HandleCell` is a
/// single machine word (plus the retire list head). The cell is deliberately
/// neither `Clone` nor `Copy`: duplicating it would split observers across
/// two independent slots, so duplication is a compile-time error.
pub struct HandleCell<H: Handle> {
   ptr: AtomicPtr<H::Pointee>,
   retired: AtomicPtr<Retired<H::Pointee>>,
   _own: PhantomData<H>,
}

// SAFETY: The cell owns its handles; moving it between threads moves that
// ownership, which is sound exactly when the handle itself may change
// threads.
unsafe impl<H: Handle + Send> Send for HandleCell<H> {}
// SAFETY: Shared access hands out owned clones (`load`) and shared borrows
// (`get`, `swap`) across threads, so the handle must be both transferable
// and shareable.
unsafe impl<H: Handle + Send + Sync> Sync for HandleCell<H> {}

impl<H: Handle> HandleCell<H> {
   /// Creates a new, empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         ptr: AtomicPtr::new(ptr::null_mut()),
         retired: AtomicPtr::new(ptr::null_mut()),
         _own: PhantomData,
      }
   }

   /// Atomically loads the current handle, returning an owned clone of it.
   ///
   /// Returns `None` if the cell is empty. This method never blocks.
   #[inline]
   pub fn load(&self) -> Option<H> {
      let raw = self.ptr.load(Ordering::Acquire);
      if raw.is_null() {
         None
      } else {
         // SAFETY: `raw` was installed via `into_raw` and, per the retire
         // discipline, its ownership is held by the cell (or its retire
         // list) until the cell is dropped. Holding `&self` keeps the cell
         // alive across the clone.
         Some(unsafe { H::clone_raw(raw) })
      }
   }

   /// Returns a borrow of the current handle's pointee without cloning.
   ///
   /// Returns `None` if the cell is empty. This method never blocks.
   #[inline]
   pub fn get(&self) -> Option<&H::Pointee> {
      let raw = self.ptr.load(Ordering::Acquire);
      if raw.is_null() {
         None
      } else {
         // SAFETY: Everything ever installed stays alive until the cell is
         // dropped, and dropping requires exclusive access, which the
         // returned borrow forbids.
         Some(unsafe { &*raw })
      }
   }

   /// Atomically replaces the cell's content with `new`, discarding the
   /// previous handle.
   ///
   /// The displaced value, if any, is retained until the cell is dropped.
   #[inline]
   pub fn store(&self, new: H) {
      let _ = self.swap(new);
   }

   /// Atomically replaces the cell's content with `new`, returning a borrow
   /// of the displaced pointee.
   ///
   /// The displaced value stays alive until the cell is dropped, so the
   /// returned borrow is valid for as long as the cell is.
   pub fn swap(&self, new: H) -> Option<&H::Pointee> {
      let prev = self.ptr.swap(H::into_raw(new), Ordering::AcqRel);
      if prev.is_null() {
         return None;
      }
      self.retire(prev);
      // SAFETY: `prev` was just moved onto the retire list, which keeps it
      // alive until the cell is dropped.
      Some(unsafe { &*prev })
   }

   /// Atomically installs `new` if the cell currently holds exactly
   /// `current` (compared by address; use a null `current` for the empty
   /// state).
   ///
   /// On success the replaced value, if any, is retained until the cell is
   /// dropped. On failure ownership of the untouched candidate is handed
   /// back to the caller.
   pub fn compare_and_swap(&self, current: *const H::Pointee, new: H) -> Result<(), H> {
      let fresh = H::into_raw(new);
      match self
         .ptr
         .compare_exchange(current.cast_mut(), fresh, Ordering::AcqRel, Ordering::Relaxed)
      {
         Ok(prev) => {
            if !prev.is_null() {
               self.retire(prev);
            }
            Ok(())
         }
         // SAFETY: The exchange failed, so `fresh` was never published and
         // we still hold the ownership given up by `into_raw` above.
         Err(_) => Err(unsafe { H::from_raw(fresh) }),
      }
   }

   /// Pushes a displaced value onto the retire list.
   fn retire(&self, value: *mut H::Pointee) {
      let node = Box::into_raw(Box::new(Retired {
         value,
         next: ptr::null_mut(),
      }));
      let mut head = self.retired.load(Ordering::Relaxed);
      loop {
         // SAFETY: `node` is not published until the exchange below
         // succeeds, so we have exclusive access to it.
         unsafe { (*node).next = head };
         match self
            .retired
            .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
         {
            Ok(_) => return,
            Err(current) => head = current,
         }
      }
   }
}

impl<H: Handle> Default for HandleCell<H> {
   /// Creates a new, empty cell.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<H: Handle> fmt::Debug for HandleCell<H> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("HandleCell")
         .field(&format_args!(
            "{}",
            if self.get().is_some() { "occupied" } else { "empty" }
         ))
         .finish()
   }
}

impl<H: Handle> Drop for HandleCell<H> {
   fn drop(&mut self) {
      // Exclusive access: no loads or swaps can race with us anymore.
      let current = mem::replace(self.ptr.get_mut(), ptr::null_mut());
      if !current.is_null() {
         // SAFETY: The cell held this value's ownership.
         drop(unsafe { H::from_raw(current) });
      }

      let mut node = mem::replace(self.retired.get_mut(), ptr::null_mut());
      while !node.is_null() {
         // SAFETY: Retire list nodes are uniquely owned by the cell, and
         // each holds the ownership of one displaced value.
         let boxed = unsafe { Box::from_raw(node) };
         drop(unsafe { H::from_raw(boxed.value) });
         node = boxed.next;
      }
   }
}
