//! Engine handle serialization under concurrent submitters.
//!
//! These tests verify critical invariants:
//! - Operations never overlap
//! - Operations from one submitter run in submission order
//! - Operations queued behind a busy engine run in submission order
//! - Submission order survives an operation that panicked

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use tandem_core::EngineHandle;

/// INVARIANT: No two operations observe the engine at the same time, and
/// each thread's operations apply in the order it submitted them.
#[test]
fn concurrent_operations_are_serialized() {
    const THREADS: usize = 8;
    const OPS: usize = 50;

    let handle = Arc::new(EngineHandle::new(Vec::<(usize, usize)>::new()));
    let busy = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let handle = Arc::clone(&handle);
            let busy = Arc::clone(&busy);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for op in 0..OPS {
                    handle.perform(|log| {
                        assert!(!busy.swap(true, Ordering::SeqCst), "operations overlapped");
                        log.push((thread_id, op));
                        thread::yield_now();
                        busy.store(false, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let log = Arc::try_unwrap(handle).ok().unwrap().into_inner();
    assert_eq!(log.len(), THREADS * OPS);

    for thread_id in 0..THREADS {
        let ops: Vec<usize> =
            log.iter().filter(|(t, _)| *t == thread_id).map(|(_, op)| *op).collect();
        assert_eq!(ops, (0..OPS).collect::<Vec<_>>(), "thread {thread_id} ran out of order");
    }
}

/// INVARIANT: Operations submitted while the engine is busy run in the order
/// they were submitted.
#[test]
fn queued_operations_run_in_submission_order() {
    let handle = Arc::new(EngineHandle::new(Vec::<&'static str>::new()));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    let first = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            handle.perform(|log| {
                log.push("first");
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
        })
    };
    started_rx.recv().unwrap();

    let mut queued = Vec::new();
    for name in ["second", "third", "fourth"] {
        let handle = Arc::clone(&handle);
        queued.push(thread::spawn(move || handle.perform(|log| log.push(name))));
        // Give the submitter time to draw its ticket before the next one
        thread::sleep(Duration::from_millis(50));
    }

    release_tx.send(()).unwrap();
    first.join().unwrap();
    for submitter in queued {
        submitter.join().unwrap();
    }

    let log = handle.perform(|log| log.clone());
    assert_eq!(log, vec!["first", "second", "third", "fourth"]);
}

/// INVARIANT: After an operation panics, operations queued behind a busy
/// engine still run in the order they were submitted.
#[test]
fn queued_operations_keep_order_after_panic() {
    let handle = Arc::new(EngineHandle::new(Vec::<&'static str>::new()));

    let panicked = catch_unwind(AssertUnwindSafe(|| {
        handle.perform(|log| {
            log.push("panicked");
            if !log.is_empty() {
                panic!("operation blew up");
            }
        });
    }));
    assert!(panicked.is_err());

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let first = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            handle.perform(|log| {
                log.push("first");
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
        })
    };
    started_rx.recv().unwrap();

    let mut queued = Vec::new();
    for name in ["second", "third", "fourth", "fifth"] {
        let handle = Arc::clone(&handle);
        queued.push(thread::spawn(move || handle.perform(|log| log.push(name))));
        thread::sleep(Duration::from_millis(50));
    }

    release_tx.send(()).unwrap();
    first.join().unwrap();
    for submitter in queued {
        submitter.join().unwrap();
    }

    let log = handle.perform(|log| log.clone());
    assert_eq!(log, vec!["panicked", "first", "second", "third", "fourth", "fifth"]);
}
