use std::sync::Arc;

use report_runner::factory::ProcessFactory;
use report_runner::pool::{DuplicatePolicy, ProcessPool};
use report_runner::process::{ProcessId, ProcessOptions, ProcessState};

#[test]
fn test_pool_cancel_reaches_process_handle() {
    let factory = ProcessFactory::default();
    let process = factory.make(ProcessOptions::new("echo"), None).unwrap();
    let handle = process.handle();

    assert!(factory.pool().cancel(process.id()));
    assert!(handle.is_cancelled());
}

#[test]
fn test_replaced_process_closing_keeps_new_entry() {
    let pool = ProcessPool::with_policy(DuplicatePolicy::Replace);
    let factory = ProcessFactory::new(pool.clone(), Default::default());

    let mut old = factory
        .make(ProcessOptions::new("echo old"), Some(ProcessId::new("job")))
        .unwrap();
    let new = factory
        .make(ProcessOptions::new("echo new"), Some(ProcessId::new("job")))
        .unwrap();

    old.close(0).unwrap();
    assert_eq!(pool.get(new.id()).unwrap().command(), "echo new");

    drop(new);
    assert!(pool.is_empty());
}

#[test]
fn test_pool_handle_tracks_state() {
    let factory = ProcessFactory::default();
    let mut process = factory.make(ProcessOptions::new("echo"), None).unwrap();
    let pooled = factory.pool().get(process.id()).unwrap();

    process.mark_running(None);
    assert_eq!(pooled.state(), ProcessState::Running);

    process.close(0).unwrap();
    assert_eq!(pooled.state(), ProcessState::Closed);
    assert!(factory.pool().is_empty());
}

#[test]
fn test_concurrent_factories_on_one_pool() {
    let pool = ProcessPool::new();
    let factory = Arc::new(ProcessFactory::new(pool.clone(), Default::default()));

    let threads: Vec<_> = (0..8u64)
        .map(|i| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || {
                factory
                    .make(ProcessOptions::new("echo"), Some(ProcessId::from(i)))
                    .unwrap()
            })
        })
        .collect();

    let processes: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    assert_eq!(pool.len(), 8);

    drop(processes);
    assert!(pool.is_empty());
}
