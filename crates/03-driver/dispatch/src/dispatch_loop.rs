//! Consumer-side loop: wait for `consume`, drain, execute, update, repeat.

use jobs::{JobHandle, Signal, UpdateJob};
use std::time::Duration;
use transport::RingConsumer;

/// Whether the drain loop should keep pulling records after one executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop this batch; remaining records are drained on the next iteration.
    EndBatch,
}

/// Subsystem executor driven by a [`Dispatcher`].
///
/// Implementations own the backend and its resource pools and see every
/// record exactly once, on the consumer thread, in submission order.
pub trait Executor {
    type Cmd: Send + 'static;

    /// Executes one record. Owned payloads are dropped when `cmd` goes out of
    /// scope here.
    fn execute(&mut self, cmd: Self::Cmd) -> Flow;

    /// Called after every drained batch.
    fn update(&mut self) {}

    /// Called once when the job observes its exit request.
    fn shutdown(&mut self) {}
}

/// When the consumer posts `continue` back to its producer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContinuePolicy {
    /// Never; producers do not wait on `continue`.
    #[default]
    Never,
    /// As soon as `consume` is observed, before draining.
    OnConsume,
    /// After a batch ends with [`Flow::EndBatch`].
    AfterBatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Sleep taken when an iteration finds no `consume` signal.
    pub idle_sleep: Duration,
    pub continue_policy: ContinuePolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            idle_sleep: Duration::from_millis(1),
            continue_policy: ContinuePolicy::Never,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Draining,
    Executing,
    ShuttingDown,
    Done,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub iterations: u64,
    pub batches: u64,
    pub executed: u64,
    pub idle_sleeps: u64,
}

/// Owns the consumer end of a command ring and the executor it feeds.
pub struct Dispatcher<E: Executor> {
    source: RingConsumer<E::Cmd>,
    executor: E,
    config: DispatchConfig,
    state: DispatchState,
    stats: DispatchStats,
    batch_cut: bool,
    last_flow: Flow,
}

impl<E: Executor> Dispatcher<E> {
    pub fn new(source: RingConsumer<E::Cmd>, executor: E, config: DispatchConfig) -> Self {
        Self {
            source,
            executor,
            config,
            state: DispatchState::Idle,
            stats: DispatchStats::default(),
            batch_cut: false,
            last_flow: Flow::Continue,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Drains pending records until the ring is empty or the executor ends
    /// the batch, then runs the update hook. Returns the records executed.
    pub fn drain(&mut self) -> usize {
        self.state = DispatchState::Draining;
        let mut executed = 0;
        let mut flow = Flow::Continue;
        while let Some(cmd) = self.source.get() {
            self.state = DispatchState::Executing;
            flow = self.executor.execute(cmd);
            executed += 1;
            self.state = DispatchState::Draining;
            if flow == Flow::EndBatch {
                break;
            }
        }
        self.batch_cut = flow == Flow::EndBatch && !self.source.is_empty();
        self.last_flow = flow;
        self.executor.update();
        self.stats.batches += 1;
        self.stats.executed += executed as u64;
        self.state = DispatchState::Idle;
        log::trace!("dispatch batch executed {executed} records");
        executed
    }

    /// Runs one loop iteration. Returns `false` once the job has shut down.
    pub fn iterate(&mut self, job: &JobHandle) -> bool {
        if self.state == DispatchState::Done {
            return false;
        }
        self.stats.iterations += 1;

        let signalled = job.try_wait(Signal::Consume);
        if signalled || self.batch_cut {
            if signalled && self.config.continue_policy == ContinuePolicy::OnConsume {
                job.post(Signal::Continue);
            }
            self.drain();
            if self.last_flow == Flow::EndBatch
                && self.config.continue_policy == ContinuePolicy::AfterBatch
            {
                job.post(Signal::Continue);
            }
        } else {
            self.stats.idle_sleeps += 1;
            std::thread::sleep(self.config.idle_sleep);
        }

        if job.exit_requested() {
            self.state = DispatchState::ShuttingDown;
            let dropped = self.source.len();
            if dropped > 0 {
                log::warn!(
                    "job `{}` shutting down with {dropped} undrained commands",
                    job.name()
                );
            }
            self.executor.shutdown();
            self.state = DispatchState::Done;
            log::debug!("dispatch loop for `{}` done: {:?}", job.name(), self.stats);
            return false;
        }
        true
    }

    /// Runs the loop until the job is asked to exit and hands back the
    /// executor together with the final statistics.
    pub fn run(mut self, job: &JobHandle) -> (E, DispatchStats) {
        log::debug!("dispatch loop for `{}` started", job.name());
        while self.iterate(job) {}
        (self.executor, self.stats)
    }
}

impl<E: Executor> UpdateJob for Dispatcher<E> {
    fn update(&mut self) -> usize {
        self.drain()
    }

    fn name(&self) -> &str {
        "dispatch"
    }
}
