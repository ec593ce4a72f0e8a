//! Two-thread stress over the SPSC ring and the blocking command queue.

use dispatch::{spawn_dispatcher, DispatchConfig, Executor, Flow};
use jobs::{JobRegistry, JobSpec};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use transport::{CmdRing, RingPush};

const RECORDS: u64 = 10_000;

#[test]
fn interleaved_put_get_keeps_fifo_order() {
    crate::init_logging();
    let (mut producer, mut consumer) = CmdRing::<u64>::with_capacity(64).expect("ring").split();

    let writer = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut next = 0;
        while next < RECORDS {
            match producer.try_put(next) {
                RingPush::Ok => next += 1,
                RingPush::WouldBlock(_) => thread::yield_now(),
            }
            if rng.gen_ratio(1, 16) {
                thread::yield_now();
            }
        }
    });

    let mut rng = StdRng::seed_from_u64(0xfeed);
    let mut expected = 0;
    while expected < RECORDS {
        match consumer.get() {
            Some(value) => {
                assert_eq!(value, expected, "record lost, duplicated or reordered");
                expected += 1;
            }
            None => thread::yield_now(),
        }
        if rng.gen_ratio(1, 32) {
            thread::yield_now();
        }
    }
    writer.join().expect("writer thread");
    assert_eq!(consumer.get(), None);
}

struct Collect(Arc<Mutex<Vec<u64>>>);

impl Executor for Collect {
    type Cmd = u64;

    fn execute(&mut self, cmd: u64) -> Flow {
        self.0.lock().push(cmd);
        Flow::Continue
    }
}

#[test]
fn blocking_submit_through_small_ring_delivers_everything() {
    crate::init_logging();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = JobRegistry::new();
    let sink = Arc::clone(&seen);
    let mut queue = spawn_dispatcher(
        &mut registry,
        JobSpec::new("collector"),
        64,
        DispatchConfig::default(),
        move |_job| Collect(sink),
    )
    .expect("spawn dispatcher");

    for value in 0..RECORDS {
        queue.submit(value);
    }
    queue.kick();
    while queue.pending() > 0 {
        thread::yield_now();
    }
    registry.terminate_all();

    let seen = seen.lock();
    assert_eq!(seen.len() as u64, RECORDS);
    assert!(seen.iter().copied().eq(0..RECORDS));
    assert!(queue.stalls() > 0, "a 64-record ring must stall 10k submits");
}
