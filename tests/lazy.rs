use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lazy_signal::LazySignal;

#[test]
fn test_fresh_signal_is_pending() {
   let signal = LazySignal::new();
   assert!(!signal.closed());
   assert_eq!(signal.to_string(), "pending");

   // Fetching the handle must not complete the signal.
   let handle = signal.done();
   assert!(!handle.is_set());
   assert!(!signal.closed());
   assert_eq!(signal.to_string(), "pending");

   signal.close();
   assert!(signal.closed());
   assert!(handle.is_set());
   assert_eq!(signal.to_string(), "done");
}

#[test]
fn test_done_returns_one_handle() {
   let signal = LazySignal::new();
   let first = signal.done();
   let second = signal.done();
   assert!(ptr::eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));
}

#[test]
fn test_waiters_unblock_on_close() {
   let signal = Arc::new(LazySignal::new());
   let released = Arc::new(AtomicUsize::new(0));

   let waiters: Vec<_> = (0..1_000)
      .map(|_| {
         let signal = Arc::clone(&signal);
         let released = Arc::clone(&released);
         thread::spawn(move || {
            signal.done().wait();
            released.fetch_add(1, Ordering::SeqCst);
         })
      })
      .collect();

   signal.close();
   for waiter in waiters {
      waiter.join().unwrap();
   }
   assert_eq!(released.load(Ordering::SeqCst), 1_000);
}

#[test]
fn test_close_is_idempotent() {
   let signal = LazySignal::new();
   let handle = signal.done();

   for _ in 0..10 {
      signal.close();
      assert!(signal.closed());
   }
   assert!(handle.is_set());

   // A handle fetched after closing is already signaled.
   let late = signal.done();
   assert!(late.is_set());
   late.wait();
}

#[test]
fn test_concurrent_close() {
   for _ in 0..100 {
      let signal = Arc::new(LazySignal::new());
      let handle = signal.done();

      let closers: Vec<_> = (0..8)
         .map(|_| {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.close())
         })
         .collect();

      for closer in closers {
         closer.join().unwrap();
      }
      assert!(signal.closed());
      assert!(handle.is_set());
   }
}

#[test]
fn test_close_before_done() {
   let signal = LazySignal::new();
   signal.close();
   assert!(signal.closed());

   let handle = signal.done();
   assert!(handle.is_set());
   handle.wait(); // Returns immediately.
}

#[test]
fn test_no_lost_wakeup() {
   // Race done() against close(); whichever way it goes, the returned handle
   // must eventually report signaled.
   for _ in 0..200 {
      let signal = Arc::new(LazySignal::new());

      let racer = {
         let signal = Arc::clone(&signal);
         thread::spawn(move || signal.done())
      };
      signal.close();

      let handle = racer.join().unwrap();
      handle.wait();
      assert!(handle.is_set());
      assert!(signal.done().is_set());
   }
}

#[test]
fn test_closed_is_monotonic() {
   let signal = Arc::new(LazySignal::new());

   let observer = {
      let signal = Arc::clone(&signal);
      thread::spawn(move || {
         while !signal.closed() {
            std::hint::spin_loop();
         }
         // Once observed closed, it must never flap back.
         for _ in 0..10_000 {
            assert!(signal.closed());
         }
      })
   };

   thread::sleep(Duration::from_millis(10));
   signal.close();
   observer.join().unwrap();
}

#[test]
fn test_closed_concurrency() {
   // One waiter, one spin-poller, one closer per instance; everything must
   // terminate. The poller deliberately hammers the signaled-handle branch.
   let mut workers = Vec::new();
   for _ in 0..100 {
      let signal = Arc::new(LazySignal::new());

      workers.push({
         let signal = Arc::clone(&signal);
         thread::spawn(move || signal.done().wait())
      });
      workers.push({
         let signal = Arc::clone(&signal);
         thread::spawn(move || {
            while !signal.closed() {
               std::hint::spin_loop();
            }
         })
      });
      workers.push({
         let signal = Arc::clone(&signal);
         thread::spawn(move || signal.close())
      });
   }

   for worker in workers {
      worker.join().unwrap();
   }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wait_async() {
   let signal = Arc::new(LazySignal::new());
   let handle = signal.done();

   let closer = {
      let signal = Arc::clone(&signal);
      tokio::task::spawn_blocking(move || {
         thread::sleep(Duration::from_millis(50));
         signal.close();
      })
   };

   handle.wait_async().await;
   assert!(signal.closed());
   closer.await.unwrap();

   // Awaiting an already-signaled handle returns immediately.
   signal.done().wait_async().await;
}
