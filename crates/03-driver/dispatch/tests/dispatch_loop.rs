use dispatch::{
    spawn_dispatcher, CommandQueue, ContinuePolicy, DispatchConfig, DispatchState, Dispatcher,
    Executor, Flow,
};
use jobs::{JobHandle, JobRegistry, JobSpec, Signal, SingleThreadUpdates};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use transport::CmdRing;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug)]
enum TestCmd {
    Push(u32),
    Label(String),
    EndFrame,
}

#[derive(Default)]
struct Journal {
    executed: Vec<String>,
    updates: usize,
    shut_down: bool,
}

struct Recorder {
    journal: Arc<Mutex<Journal>>,
}

impl Executor for Recorder {
    type Cmd = TestCmd;

    fn execute(&mut self, cmd: TestCmd) -> Flow {
        let mut journal = self.journal.lock();
        match cmd {
            TestCmd::Push(value) => journal.executed.push(value.to_string()),
            TestCmd::Label(label) => journal.executed.push(label),
            TestCmd::EndFrame => {
                journal.executed.push("end".into());
                return Flow::EndBatch;
            }
        }
        Flow::Continue
    }

    fn update(&mut self) {
        self.journal.lock().updates += 1;
    }

    fn shutdown(&mut self) {
        self.journal.lock().shut_down = true;
    }
}

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn threaded_dispatch_executes_in_fifo_order_and_shuts_down() {
    init_logging();
    let journal = Arc::new(Mutex::new(Journal::default()));
    let mut registry = JobRegistry::new();
    let mut queue = {
        let journal = Arc::clone(&journal);
        spawn_dispatcher(
            &mut registry,
            JobSpec::new("recorder"),
            4,
            DispatchConfig::default(),
            move |_job: &JobHandle| Recorder { journal },
        )
        .expect("spawn dispatcher")
    };

    // More records than the ring holds: submit blocks and kicks the consumer.
    for value in 0..10 {
        queue.submit(TestCmd::Push(value));
    }
    queue.submit(TestCmd::Label("tail".into()));
    queue.kick();

    wait_until(|| journal.lock().executed.len() == 11);
    registry.terminate_all();

    let journal = journal.lock();
    let expected: Vec<String> = (0..10)
        .map(|v| v.to_string())
        .chain(std::iter::once("tail".to_string()))
        .collect();
    assert_eq!(journal.executed, expected);
    assert!(journal.updates >= 1);
    assert!(journal.shut_down);
}

#[test]
fn after_batch_policy_gates_producer_per_frame() {
    init_logging();
    let journal = Arc::new(Mutex::new(Journal::default()));
    let mut registry = JobRegistry::new();
    let config = DispatchConfig {
        continue_policy: ContinuePolicy::AfterBatch,
        ..DispatchConfig::default()
    };
    let mut queue = {
        let journal = Arc::clone(&journal);
        spawn_dispatcher(&mut registry, JobSpec::new("frames"), 16, config, move |_| {
            Recorder { journal }
        })
        .expect("spawn dispatcher")
    };

    for frame in 0..3u32 {
        queue.submit(TestCmd::Push(frame));
        queue.submit(TestCmd::EndFrame);
        queue.kick_and_wait();
        // The consumer only posts continue once the frame has ended.
        let executed = journal.lock().executed.len();
        assert_eq!(executed, (frame as usize + 1) * 2);
    }
    registry.terminate_all();
}

/// Executes nothing of interest; its update hook parks on `gate`.
struct Gated {
    gate: Arc<Mutex<()>>,
}

impl Executor for Gated {
    type Cmd = TestCmd;

    fn execute(&mut self, _cmd: TestCmd) -> Flow {
        Flow::Continue
    }

    fn update(&mut self) {
        drop(self.gate.lock());
    }
}

#[test]
fn on_consume_stall_does_not_leave_a_stale_continue() {
    init_logging();
    let gate = Arc::new(Mutex::new(()));
    let held = gate.lock();
    let mut registry = JobRegistry::new();
    let config = DispatchConfig {
        continue_policy: ContinuePolicy::OnConsume,
        ..DispatchConfig::default()
    };
    let mut queue = {
        let gate = Arc::clone(&gate);
        spawn_dispatcher(&mut registry, JobSpec::new("gated"), 2, config, move |_| {
            Gated { gate }
        })
        .expect("spawn dispatcher")
    };

    // The third record stalls; the consumer picks the batch up and then
    // parks in its update hook.
    for value in 0..3 {
        queue.submit(TestCmd::Push(value));
    }
    assert_eq!(queue.stalls(), 1);
    assert_eq!(queue.job().semaphore(Signal::Continue).available(), 0);

    let returned = AtomicBool::new(false);
    thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            queue.kick_and_wait();
            returned.store(true, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(50));
        assert!(
            !returned.load(Ordering::SeqCst),
            "kick_and_wait returned while the consumer was parked"
        );
        drop(held);
        waiter.join().expect("waiter");
    });
    assert!(returned.load(Ordering::SeqCst));

    registry.terminate_all();
}

#[test]
fn on_consume_wait_discards_permit_left_by_plain_kick() {
    let (producer, _consumer) = CmdRing::<TestCmd>::with_capacity(4).expect("ring").split();
    let job = JobHandle::new("audio-like");
    let queue = CommandQueue::new(producer, job.clone())
        .with_continue_policy(ContinuePolicy::OnConsume);

    // A consumer answered an earlier unwaited kick.
    job.post(Signal::Continue);

    let (answered, woke) = thread::scope(|scope| {
        let consumer = scope.spawn(|| {
            while !job.try_wait(Signal::Consume) {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(20));
            let answered = Instant::now();
            job.post(Signal::Continue);
            answered
        });
        queue.kick_and_wait();
        let woke = Instant::now();
        (consumer.join().expect("consumer"), woke)
    });
    assert!(woke >= answered, "woke on the stale permit");
}

#[test]
fn end_batch_leaves_remaining_records_for_next_iteration() {
    let journal = Arc::new(Mutex::new(Journal::default()));
    let (mut producer, consumer) = CmdRing::with_capacity(8).expect("ring").split();
    let mut dispatcher = Dispatcher::new(
        consumer,
        Recorder {
            journal: Arc::clone(&journal),
        },
        DispatchConfig {
            idle_sleep: Duration::ZERO,
            ..DispatchConfig::default()
        },
    );
    let job = JobHandle::new("inline");

    for cmd in [
        TestCmd::Push(1),
        TestCmd::EndFrame,
        TestCmd::Push(2),
        TestCmd::EndFrame,
    ] {
        producer.put(cmd);
    }

    job.post(Signal::Consume);
    assert!(dispatcher.iterate(&job));
    assert_eq!(journal.lock().executed, vec!["1", "end"]);

    // No new consume signal, but the cut batch is still drained.
    assert!(dispatcher.iterate(&job));
    assert_eq!(journal.lock().executed, vec!["1", "end", "2", "end"]);

    job.post(Signal::Exit);
    assert!(!dispatcher.iterate(&job));
    assert_eq!(dispatcher.state(), DispatchState::Done);
    assert!(!dispatcher.iterate(&job));
    assert_eq!(dispatcher.stats().executed, 4);
}

#[test]
fn dispatcher_runs_as_single_threaded_update() {
    let journal = Arc::new(Mutex::new(Journal::default()));
    let (mut producer, consumer) = CmdRing::with_capacity(8).expect("ring").split();
    let dispatcher = Dispatcher::new(
        consumer,
        Recorder {
            journal: Arc::clone(&journal),
        },
        DispatchConfig::default(),
    );
    let mut updates = SingleThreadUpdates::new();
    updates.register(dispatcher);

    producer.put(TestCmd::Label("inline".into()));
    assert_eq!(updates.run_tick(), 1);
    assert_eq!(updates.run_tick(), 0);
    assert_eq!(journal.lock().executed, vec!["inline"]);
    assert_eq!(journal.lock().updates, 2);
}
