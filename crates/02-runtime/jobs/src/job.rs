//! Per-job handshake state shared between the orchestrator and the job thread.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transport::Semaphore;

/// The four handshake semaphores every job owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Startup acknowledgement, and producer back-pressure afterwards.
    Continue,
    /// A producer has queued commands for the job to drain.
    Consume,
    /// The orchestrator asks the job to leave its loop.
    Exit,
    /// The job has finished shutting down.
    Terminated,
}

impl Signal {
    const fn index(self) -> usize {
        match self {
            Signal::Continue => 0,
            Signal::Consume => 1,
            Signal::Exit => 2,
            Signal::Terminated => 3,
        }
    }
}

/// Lifecycle of a job thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Created = 0,
    Running = 1,
    ExitRequested = 2,
    Terminated = 3,
}

impl JobState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobState::Created,
            1 => JobState::Running,
            2 => JobState::ExitRequested,
            _ => JobState::Terminated,
        }
    }
}

/// Callback invoked on the job thread after its body returns.
pub type CompletionFn = Box<dyn FnOnce(&JobHandle) + Send + 'static>;

struct JobShared {
    name: String,
    signals: [Semaphore; 4],
    state: AtomicU8,
}

/// Cloneable handle onto a job's semaphores and lifecycle state.
///
/// The job body receives one, producers keep one to post [`Signal::Consume`],
/// and the registry keeps one to drive shutdown.
#[derive(Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
}

impl JobHandle {
    /// Creates a handle that is not yet bound to a thread.
    ///
    /// [`JobRegistry`](crate::JobRegistry) uses this for every job it spawns;
    /// single-threaded pumps use it directly so producers keep the same API.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(JobShared {
                name: name.into(),
                signals: std::array::from_fn(|_| Semaphore::binary()),
                state: AtomicU8::new(JobState::Created as u8),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    /// Direct access to one of the handshake semaphores.
    pub fn semaphore(&self, signal: Signal) -> &Semaphore {
        &self.shared.signals[signal.index()]
    }

    /// Posts `signal`; returns `false` when it was already pending.
    pub fn post(&self, signal: Signal) -> bool {
        self.semaphore(signal).post()
    }

    pub fn try_wait(&self, signal: Signal) -> bool {
        self.semaphore(signal).try_wait()
    }

    pub fn wait(&self, signal: Signal) {
        self.semaphore(signal).wait()
    }

    pub fn wait_timeout(&self, signal: Signal, timeout: Duration) -> bool {
        self.semaphore(signal).wait_timeout(timeout)
    }

    /// Polls the exit semaphore once, latching the request into the job state.
    ///
    /// Job loops call this once per iteration.
    pub fn exit_requested(&self) -> bool {
        if self.state() == JobState::ExitRequested {
            return true;
        }
        if self.try_wait(Signal::Exit) {
            self.set_state(JobState::ExitRequested);
            log::debug!("job `{}` observed exit request", self.name());
            return true;
        }
        false
    }

    /// Returns `true` when both handles refer to the same job.
    pub fn same_job(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Thread configuration for a job.
pub struct JobSpec {
    pub(crate) name: String,
    pub(crate) stack_size: Option<usize>,
    pub(crate) on_complete: Option<CompletionFn>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: None,
            on_complete: None,
        }
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Registers a callback run on the job thread once its body has returned,
    /// before `terminated` is posted.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&JobHandle) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_are_independent() {
        let job = JobHandle::new("worker");
        assert!(job.post(Signal::Consume));
        assert!(!job.try_wait(Signal::Exit));
        assert!(job.try_wait(Signal::Consume));
        assert!(!job.try_wait(Signal::Consume));
    }

    #[test]
    fn exit_request_latches() {
        let job = JobHandle::new("worker");
        assert!(!job.exit_requested());
        job.post(Signal::Exit);
        assert!(job.exit_requested());
        assert_eq!(job.state(), JobState::ExitRequested);
        // The permit was consumed but the state keeps the request visible.
        assert!(job.exit_requested());
    }

    #[test]
    fn clones_share_state() {
        let job = JobHandle::new("worker");
        let other = job.clone();
        other.set_state(JobState::Running);
        assert_eq!(job.state(), JobState::Running);
        assert!(job.same_job(&other));
        assert!(!job.same_job(&JobHandle::new("worker")));
    }
}
