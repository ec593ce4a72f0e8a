//! Jobs stop newest first, observed through completion callbacks and the
//! `terminated` semaphores.

use jobs::{JobHandle, JobRegistry, JobSpec, JobState, Signal};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn idle(job: JobHandle) {
    while !job.exit_requested() {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn jobs_terminate_in_reverse_creation_order() {
    crate::init_logging();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut registry = JobRegistry::new();

    let handles: Vec<JobHandle> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let order = Arc::clone(&order);
            let spec = JobSpec::new(name).on_complete(move |job| {
                order.lock().push(job.name().to_owned());
            });
            registry.create_job(spec, idle).expect("spawn")
        })
        .collect();

    registry.terminate_all();
    assert_eq!(*order.lock(), ["C", "B", "A"]);
    assert_eq!(registry.live_count(), 0);
    assert!(handles
        .iter()
        .all(|handle| handle.state() == JobState::Terminated));
}

fn wait_for(mut done: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Polling shutdown where each job may only finish after it was asked to, and
/// a watcher records the order in which `terminated` semaphores fire.
#[test]
fn terminated_semaphores_fire_newest_first() {
    crate::init_logging();
    let mut registry = JobRegistry::new();
    let mut gates = Vec::new();
    let mut handles = Vec::new();

    for name in ["A", "B", "C"] {
        let gate = Arc::new(Mutex::new(false));
        let job_gate = Arc::clone(&gate);
        let handle = registry
            .create_job(JobSpec::new(name), move |job| {
                while !(job.exit_requested() && *job_gate.lock()) {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("spawn");
        gates.push(gate);
        handles.push(handle);
    }

    let fired = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let fired = Arc::clone(&fired);
        let mut pending = handles.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !pending.is_empty() && Instant::now() < deadline {
                pending.retain(|handle| {
                    if !handle.wait_timeout(Signal::Terminated, Duration::from_millis(1)) {
                        return true;
                    }
                    // Hand the permit on to the registry before reporting.
                    handle.post(Signal::Terminated);
                    fired.lock().push(handle.name().to_owned());
                    false
                });
            }
        })
    };

    for step in 1..=handles.len() {
        assert!(!registry.try_terminate_all(), "nothing may finish ungated");
        let exit_requested = |handle: &JobHandle| handle.state() == JobState::ExitRequested;
        wait_for(|| handles.iter().any(exit_requested), "an exit request");
        let asked = handles
            .iter()
            .position(exit_requested)
            .expect("job asked to exit");
        *gates[asked].lock() = true;
        wait_for(|| fired.lock().len() == step, "terminated to fire");
    }
    assert!(registry.try_terminate_all());
    watcher.join().expect("watcher");

    assert_eq!(*fired.lock(), ["C", "B", "A"]);
    assert_eq!(registry.live_count(), 0);
    for handle in &handles {
        assert_eq!(handle.state(), JobState::Terminated);
    }
}
