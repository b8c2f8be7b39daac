use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use lazy_signal::HandleCell;

#[test]
fn test_empty_cell() {
   let cell: HandleCell<Arc<i32>> = HandleCell::new();
   assert!(cell.load().is_none());
   assert!(cell.get().is_none());

   let cell: HandleCell<Arc<i32>> = HandleCell::default();
   assert!(cell.load().is_none());
}

#[test]
fn test_store_and_load() {
   let cell: HandleCell<Arc<String>> = HandleCell::new();
   let value = Arc::new(String::from("first"));
   cell.store(Arc::clone(&value));

   assert_eq!(cell.load().as_deref(), Some(&String::from("first")));
   assert_eq!(cell.get(), Some(&String::from("first")));

   // load hands out the same allocation, not a copy
   let loaded = cell.load().unwrap();
   assert!(ptr::eq(Arc::as_ptr(&loaded), Arc::as_ptr(&value)));
}

#[test]
fn test_swap_returns_previous() {
   let cell: HandleCell<Arc<i32>> = HandleCell::new();
   assert!(cell.swap(Arc::new(1)).is_none());
   assert_eq!(cell.swap(Arc::new(2)), Some(&1));
   assert_eq!(cell.swap(Arc::new(3)), Some(&2));
   assert_eq!(cell.load().as_deref(), Some(&3));
}

#[test]
fn test_compare_and_swap() {
   let cell: HandleCell<Arc<i32>> = HandleCell::new();
   let first = Arc::new(1);

   // Installing over the empty state succeeds
   assert!(cell
      .compare_and_swap(ptr::null(), Arc::clone(&first))
      .is_ok());
   assert_eq!(cell.load().as_deref(), Some(&1));

   // An expected-empty exchange now fails and hands the candidate back
   let candidate = cell
      .compare_and_swap(ptr::null(), Arc::new(2))
      .unwrap_err();
   assert_eq!(*candidate, 2);
   assert_eq!(cell.load().as_deref(), Some(&1));

   // Exchanging against the current value replaces it
   assert!(cell
      .compare_and_swap(Arc::as_ptr(&first), candidate)
      .is_ok());
   assert_eq!(cell.load().as_deref(), Some(&2));
}

#[test]
fn test_displaced_values_live_until_drop() {
   let first = Arc::new(1);
   let weak = Arc::downgrade(&first);

   let cell: HandleCell<Arc<i32>> = HandleCell::new();
   cell.store(first);

   // The displaced value is still reachable through the returned borrow and
   // still alive as far as the refcount is concerned.
   let displaced = cell.swap(Arc::new(2)).unwrap();
   assert_eq!(*displaced, 1);
   assert!(
      weak.upgrade().is_some(),
      "displaced value freed while the cell is alive"
   );

   drop(cell);
   assert!(
      weak.upgrade().is_none(),
      "dropping the cell must release retired values"
   );
}

#[test]
fn test_boxed_handles() {
   let cell: HandleCell<Box<Arc<i32>>> = HandleCell::new();
   assert!(cell.load().is_none());

   cell.store(Box::new(Arc::new(7)));
   let loaded = cell.load().unwrap();
   assert_eq!(**loaded, 7);

   let displaced = cell.swap(Box::new(Arc::new(8))).unwrap();
   assert_eq!(**displaced, 7);
   assert_eq!(cell.get().map(|inner| **inner), Some(8));

   let candidate = cell
      .compare_and_swap(ptr::null(), Box::new(Arc::new(9)))
      .unwrap_err();
   assert_eq!(**candidate, 9);
}

#[test]
fn test_install_race_has_single_winner() {
   for _ in 0..100 {
      let cell = Arc::new(HandleCell::<Arc<usize>>::new());
      let wins = Arc::new(AtomicUsize::new(0));

      let racers: Vec<_> = (0..16)
         .map(|i| {
            let cell = Arc::clone(&cell);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
               if cell.compare_and_swap(ptr::null(), Arc::new(i)).is_ok() {
                  wins.fetch_add(1, Ordering::SeqCst);
               }
            })
         })
         .collect();

      for racer in racers {
         racer.join().unwrap();
      }

      assert_eq!(wins.load(Ordering::SeqCst), 1);
      assert!(cell.load().is_some());
   }
}
