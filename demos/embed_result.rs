use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lazy_signal::PointerLazySignal;

#[derive(Default)]
struct Report {
   ready: PointerLazySignal,
   value: AtomicU64,
}

fn main() {
   let report = Arc::new(Report::default());

   let producer = Arc::clone(&report);
   thread::spawn(move || {
      thread::sleep(Duration::from_millis(100));
      producer.value.store(42, Ordering::Release);
      producer.ready.close(); // The result is ready.
   });

   println!("report: {}", report.ready);

   if report.ready.closed() {
      println!("already done");
   } else {
      println!("still processing...");
   }

   report.ready.done().wait(); // Wait for the result.
   println!("report: {}", report.ready);
   println!("value: {}", report.value.load(Ordering::Acquire));
}
