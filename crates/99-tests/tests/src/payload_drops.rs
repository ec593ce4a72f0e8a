//! Owned payloads travel with their record and are dropped exactly once.

use dispatch::{spawn_dispatcher, DispatchConfig, Executor, Flow};
use jobs::{JobRegistry, JobSpec};
use std::sync::Arc;
use std::thread;
use transport::CmdRing;

struct Payload {
    name: String,
    token: Arc<()>,
}

struct Discard;

impl Executor for Discard {
    type Cmd = Payload;

    fn execute(&mut self, cmd: Payload) -> Flow {
        assert!(cmd.name.starts_with("asset-"));
        drop(cmd.token);
        Flow::Continue
    }
}

fn payload(i: usize, token: &Arc<()>) -> Payload {
    Payload {
        name: format!("asset-{i}.bin"),
        token: Arc::clone(token),
    }
}

#[test]
fn executed_payloads_are_released() {
    crate::init_logging();
    let token = Arc::new(());
    let mut registry = JobRegistry::new();
    let mut queue = spawn_dispatcher(
        &mut registry,
        JobSpec::new("payloads"),
        8,
        DispatchConfig::default(),
        |_job| Discard,
    )
    .expect("spawn dispatcher");

    for i in 0..100 {
        queue.submit(payload(i, &token));
    }
    queue.kick();
    while queue.pending() > 0 {
        thread::yield_now();
    }
    registry.terminate_all();
    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn undelivered_payloads_drop_with_the_ring() {
    let token = Arc::new(());
    let (mut producer, mut consumer) = CmdRing::with_capacity(16).expect("ring").split();
    for i in 0..10 {
        producer.put(payload(i, &token));
    }
    let first = consumer.get().expect("first record");
    assert_eq!(first.name, "asset-0.bin");
    drop(first);
    assert_eq!(Arc::strong_count(&token), 10);

    drop(producer);
    assert_eq!(Arc::strong_count(&token), 10, "consumer still owns the ring");
    drop(consumer);
    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn records_left_at_shutdown_are_dropped() {
    crate::init_logging();
    let token = Arc::new(());
    let mut registry = JobRegistry::new();
    let mut queue = spawn_dispatcher(
        &mut registry,
        JobSpec::new("parked"),
        32,
        DispatchConfig::default(),
        |_job| Discard,
    )
    .expect("spawn dispatcher");

    // Never kicked, so the job exits with every record still queued.
    for i in 0..20 {
        queue.submit(payload(i, &token));
    }
    registry.terminate_all();
    drop(queue);
    assert_eq!(Arc::strong_count(&token), 1);
}
