//! Access racing with thread-local teardown.
//!
//! These accesses run from thread-local destructors. Thread-local
//! destructors run in reverse order of first access, so whether the cell's
//! storage is still alive depends on which slot the thread touched first.
//! Either way the access returns normally: the real value when the slot
//! still exists, the default otherwise.

use crate::*;
use std::cell::RefCell;
use std::sync::{mpsc, Mutex};
use std::thread;

/// Touches a cell from its destructor
struct LateAccess {
    cell: Arc<ContextLocalCell<u32>>,
    report: mpsc::Sender<(u32, u32)>,
}

impl Drop for LateAccess {
    fn drop(&mut self) {
        let before = self.cell.get();
        self.cell.set(before + 1);
        let _ = self.report.send((before, self.cell.get()));
    }
}

thread_local! {
    static LATE: RefCell<Option<LateAccess>> = const { RefCell::new(None) };
}

/// Park a `LateAccess` in this thread's `LATE` slot
fn install_late_access(cell: Arc<ContextLocalCell<u32>>, report: mpsc::Sender<(u32, u32)>) {
    LATE.with(|slot| *slot.borrow_mut() = Some(LateAccess { cell, report }));
}

#[test]
fn test_late_access_after_storage_teardown_degrades() {
    let cell = Arc::new(ContextLocalCell::<u32>::new());
    let (tx, rx) = mpsc::channel();

    let remote = Arc::clone(&cell);
    thread::spawn(move || {
        // LATE first: the cell's storage is destroyed before LATE's destructor runs.
        LATE.with(|_| {});
        remote.set(5);
        assert_eq!(remote.get(), 5);
        install_late_access(remote, tx);
    })
    .join()
    .expect("late access must not panic");

    let report = rx.recv().expect("destructor ran");
    assert_eq!(report, (0, 0));
}

#[test]
fn test_late_access_before_storage_teardown_sees_value() {
    let cell = Arc::new(ContextLocalCell::<u32>::new());
    let (tx, rx) = mpsc::channel();

    let remote = Arc::clone(&cell);
    thread::spawn(move || {
        remote.set(5);
        install_late_access(remote, tx);
    })
    .join()
    .expect("late access must not panic");

    let report = rx.recv().expect("destructor ran");
    assert_eq!(report, (5, 6));
}

/// Value whose destructor writes to another cell
#[derive(Default, Clone)]
struct Sentinel(Option<Arc<DropHook>>);

struct DropHook {
    target: Arc<ContextLocalCell<u32>>,
    report: Mutex<mpsc::Sender<u32>>,
}

impl Drop for DropHook {
    fn drop(&mut self) {
        self.target.set(99);
        let seen = self.target.get();
        if let Ok(report) = self.report.lock() {
            let _ = report.send(seen);
        }
    }
}

#[test]
fn test_value_destructor_may_touch_cells() {
    let target = Arc::new(ContextLocalCell::<u32>::new());
    let (tx, rx) = mpsc::channel();

    let holder = Arc::new(ContextLocalCell::<Sentinel>::new());
    let remote_holder = Arc::clone(&holder);
    let remote_target = Arc::clone(&target);
    thread::spawn(move || {
        remote_target.set(1);
        remote_holder.set(Sentinel(Some(Arc::new(DropHook {
            target: remote_target,
            report: Mutex::new(tx),
        }))));
    })
    .join()
    .expect("thread exit must not panic");

    drop(holder);
    let seen = rx.recv().expect("hook ran");

    // Thread-affine values drop while the thread's slots are torn down.
    #[cfg(feature = "thread-affine")]
    assert_eq!(seen, 0);
    // Propagating values drop with the holder, on this thread.
    #[cfg(not(feature = "thread-affine"))]
    assert_eq!(seen, 99);
}

#[test]
fn test_many_threads_exit_while_reading() {
    let cell = Arc::new(ContextLocalCell::<u32>::with_initial(|| 3));
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cell = Arc::clone(&cell);
            let tx = tx.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    LATE.with(|_| {});
                }
                assert_eq!(cell.get(), 3);
                install_late_access(cell, tx);
                i
            })
        })
        .collect();
    drop(tx);

    for h in handles {
        h.join().expect("late access must not panic");
    }
    let mut reports: Vec<_> = rx.iter().collect();
    reports.sort();
    // Even threads touched LATE first and saw torn-down storage.
    assert_eq!(reports, [vec![(0, 0); 4], vec![(3, 4); 4]].concat());
}
