use std::sync::Arc;
use std::time::Duration;

use lazy_signal::LazySignal;

#[tokio::main]
async fn main() {
   let signal = Arc::new(LazySignal::new());

   let closer = Arc::clone(&signal);
   tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      closer.close();
   });

   let handle = signal.done();
   println!("signal: {signal}");

   handle.wait_async().await;
   println!("signal: {signal}");
   assert!(signal.closed());
}
