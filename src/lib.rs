//! Lazily initialized, lock-free, single-shot completion signals.
//!
//! This crate provides two behaviorally identical signal types:
//!
//! - [`LazySignal`]: stores its waitable handle's representation directly in
//!   an atomic word.
//! - [`PointerLazySignal`]: stores a pointer to a heap-resident handle,
//!   assuming nothing about the handle's layout.
//!
//! Both let an unbounded number of concurrent observers wait for a one-time
//! event while allocating the waitable resource only if and when it is first
//! needed. Completing a signal ([`close`](LazySignal::close)) and fetching
//! its handle ([`done`](LazySignal::done)) may race arbitrarily without
//! losing or duplicating the signal, and closing is idempotent even under
//! concurrent repetition.
//!
//! # Features
//!
//! - **Zero-cost start**: a fresh signal is a null word; nothing is allocated
//!   until the first `done` or `close`.
//! - **Lock-free operations**: `close`, `done` and `closed` complete in a
//!   bounded number of steps; blocking happens only on the returned
//!   [`Event`], via `parking_lot`'s futex-based parking.
//! - **Idempotent completion**: any number of `close` calls, from any number
//!   of threads, signal exactly once and never fault.
//! - **Async support**: waiters can await the handle on a tokio runtime.
//! - **Reusable storage cell**: the generic atomic slot underneath the
//!   signals is exported as [`HandleCell`].
//!
//! # Examples
//!
//! ## Embedding a signal in a result type
//!
//! A surrounding type embeds the signal to mean "ready once this is closed";
//! the producer closes it exactly once when the payload is in place.
//!
//! ```rust
//! use std::sync::{Arc, OnceLock};
//! use std::thread;
//!
//! use lazy_signal::PointerLazySignal;
//!
//! #[derive(Default)]
//! struct Report {
//!    ready: PointerLazySignal,
//!    value: OnceLock<u64>,
//! }
//!
//! let report = Arc::new(Report::default());
//! assert_eq!(report.ready.to_string(), "pending");
//!
//! let producer = Arc::clone(&report);
//! thread::spawn(move || {
//!    producer.value.set(42).ok();
//!    producer.ready.close(); // The result is ready.
//! });
//!
//! report.ready.done().wait(); // Wait for the result.
//! assert_eq!(report.ready.to_string(), "done");
//! assert_eq!(report.value.get(), Some(&42));
//! ```
//!
//! ## Polling without blocking
//!
//! ```rust
//! use lazy_signal::LazySignal;
//!
//! let signal = LazySignal::new();
//! assert!(!signal.closed());
//!
//! signal.close();
//! assert!(signal.closed());
//! signal.close(); // Closing again is safe.
//! assert!(signal.closed());
//! ```

/// Generic atomic storage slot for owned handles.
mod cell;

/// The waitable handle and the shared closed sentinel.
mod event;

/// Word-punned signal variant.
mod lazy;

/// Pointer-indirection signal variant.
mod pointer;

pub use cell::{Handle, HandleCell};
pub use event::Event;
pub use lazy::LazySignal;
pub use pointer::PointerLazySignal;
