//! Orchestrator-side job table: creation handshake and ordered shutdown.

use crate::error::{JobError, JobResult};
use crate::job::{JobHandle, JobSpec, JobState, Signal};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on concurrently registered jobs.
pub const MAX_JOBS: usize = 32;

struct JobEntry {
    handle: JobHandle,
    thread: Option<JoinHandle<()>>,
}

impl JobEntry {
    fn finished(&self) -> bool {
        self.thread.is_none()
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!(
                    "job `{}` thread panicked after posting terminated",
                    self.handle.name()
                );
            }
        }
    }
}

/// Owns every job thread and drives the start/stop protocol.
///
/// Jobs are stopped in reverse creation order so a job may depend on any job
/// created before it.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Vec<JobEntry>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a job thread and blocks until it has taken its startup state.
    ///
    /// The thread marks itself running and posts `continue` before entering
    /// `body`; `create_job` returns only after observing that post. `body`
    /// is expected to poll [`JobHandle::exit_requested`] and return once it
    /// reports `true`. After `body` returns the completion callback runs and
    /// `terminated` is posted, even if `body` panicked.
    pub fn create_job<F>(&mut self, spec: JobSpec, body: F) -> JobResult<JobHandle>
    where
        F: FnOnce(JobHandle) + Send + 'static,
    {
        if self.live_count() >= MAX_JOBS {
            return Err(JobError::TooManyJobs { max: MAX_JOBS });
        }

        let JobSpec {
            name,
            stack_size,
            on_complete,
        } = spec;
        let handle = JobHandle::new(name.clone());
        let thread_handle = handle.clone();

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(bytes) = stack_size {
            builder = builder.stack_size(bytes);
        }

        let thread = builder
            .spawn(move || {
                let job = thread_handle;
                job.set_state(JobState::Running);
                job.post(Signal::Continue);

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(job.clone())));
                if outcome.is_err() {
                    log::error!("job `{}` panicked; terminating", job.name());
                }
                if let Some(callback) = on_complete {
                    callback(&job);
                }
                job.set_state(JobState::Terminated);
                job.post(Signal::Terminated);
                log::debug!("job `{}` terminated", job.name());
            })
            .map_err(|source| JobError::Spawn {
                name: name.clone(),
                source,
            })?;

        handle.wait(Signal::Continue);
        log::debug!("job `{name}` running");

        self.jobs.push(JobEntry {
            handle: handle.clone(),
            thread: Some(thread),
        });
        Ok(handle)
    }

    /// Handles of every job ever created, in creation order.
    pub fn handles(&self) -> impl Iterator<Item = &JobHandle> {
        self.jobs.iter().map(|entry| &entry.handle)
    }

    /// Jobs whose threads have not been joined or detached yet.
    pub fn live_count(&self) -> usize {
        self.jobs.iter().filter(|entry| !entry.finished()).count()
    }

    /// Stops every job, newest first, waiting indefinitely on each.
    pub fn terminate_all(&mut self) {
        for entry in self.jobs.iter_mut().rev() {
            if entry.finished() {
                continue;
            }
            log::debug!("requesting exit from job `{}`", entry.handle.name());
            entry.handle.post(Signal::Exit);
            entry.handle.wait(Signal::Terminated);
            entry.join();
        }
    }

    /// Non-blocking shutdown step for callers polling once per frame.
    ///
    /// Posts `exit` to the newest live job and returns `false` while it has
    /// not terminated. Jobs that have terminated are joined and the walk moves
    /// on to the previous one. Returns `true` once every job is gone.
    pub fn try_terminate_all(&mut self) -> bool {
        for entry in self.jobs.iter_mut().rev() {
            if entry.finished() {
                continue;
            }
            if entry.handle.state() != JobState::ExitRequested {
                entry.handle.post(Signal::Exit);
            }
            if !entry.handle.try_wait(Signal::Terminated) {
                return false;
            }
            entry.join();
        }
        true
    }

    /// Like [`terminate_all`](Self::terminate_all) but waits at most
    /// `per_job` on each job.
    ///
    /// A job that misses its deadline is detached; shutdown continues with the
    /// remaining jobs and the detached names are reported in
    /// [`JobError::Leaked`].
    pub fn terminate_all_timeout(&mut self, per_job: Duration) -> JobResult<()> {
        let mut leaked = Vec::new();
        for entry in self.jobs.iter_mut().rev() {
            if entry.finished() {
                continue;
            }
            entry.handle.post(Signal::Exit);
            if entry.handle.wait_timeout(Signal::Terminated, per_job) {
                entry.join();
            } else {
                log::warn!(
                    "job `{}` did not terminate within {per_job:?}; detaching",
                    entry.handle.name()
                );
                entry.thread.take();
                leaked.push(entry.handle.name().to_owned());
            }
        }
        if leaked.is_empty() {
            Ok(())
        } else {
            Err(JobError::Leaked { names: leaked })
        }
    }
}

impl Drop for JobRegistry {
    fn drop(&mut self) {
        if self.live_count() > 0 {
            log::warn!(
                "job registry dropped with {} live jobs; terminating",
                self.live_count()
            );
            self.terminate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn idle_loop(job: JobHandle) {
        while !job.exit_requested() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn create_job_returns_after_startup_handshake() {
        init_logging();
        let mut registry = JobRegistry::new();
        let handle = registry
            .create_job(JobSpec::new("worker").stack_size(256 * 1024), idle_loop)
            .expect("spawn");
        assert_ne!(handle.state(), JobState::Created);
        assert_eq!(handle.name(), "worker");

        registry.terminate_all();
        assert_eq!(handle.state(), JobState::Terminated);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn completion_callback_runs_before_terminated() {
        init_logging();
        let seen = Arc::new(Mutex::new(None));
        let spec = {
            let seen = Arc::clone(&seen);
            JobSpec::new("callback").on_complete(move |job| {
                *seen.lock() = Some(job.state());
            })
        };
        let mut registry = JobRegistry::new();
        registry.create_job(spec, idle_loop).expect("spawn");
        registry.terminate_all();
        assert_eq!(*seen.lock(), Some(JobState::ExitRequested));
    }

    #[test]
    fn panicking_body_still_posts_terminated() {
        init_logging();
        let mut registry = JobRegistry::new();
        let handle = registry
            .create_job(JobSpec::new("panics"), |_job| panic!("boom"))
            .expect("spawn");
        registry.terminate_all();
        assert_eq!(handle.state(), JobState::Terminated);
        assert_eq!(registry.handles().count(), 1);
    }

    #[test]
    fn registry_is_bounded() {
        let mut registry = JobRegistry::new();
        for index in 0..MAX_JOBS {
            registry
                .create_job(JobSpec::new(format!("job-{index}")), idle_loop)
                .expect("spawn");
        }
        let err = registry
            .create_job(JobSpec::new("overflow"), idle_loop)
            .unwrap_err();
        assert!(matches!(err, JobError::TooManyJobs { max: MAX_JOBS }));
        registry.terminate_all();
    }

    #[test]
    fn try_terminate_all_polls_until_done() {
        init_logging();
        let mut registry = JobRegistry::new();
        for name in ["a", "b"] {
            registry.create_job(JobSpec::new(name), idle_loop).expect("spawn");
        }
        let mut polls = 0;
        while !registry.try_terminate_all() {
            polls += 1;
            assert!(polls < 10_000, "jobs never terminated");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(registry.live_count(), 0);
        assert!(registry.try_terminate_all());
    }

    #[test]
    fn timeout_detaches_stuck_job() {
        init_logging();
        let release = Arc::new(transport::Semaphore::binary());
        let mut registry = JobRegistry::new();
        registry.create_job(JobSpec::new("healthy"), idle_loop).expect("spawn");
        {
            let release = Arc::clone(&release);
            registry
                .create_job(JobSpec::new("stuck"), move |_job| release.wait())
                .expect("spawn");
        }

        let err = registry
            .terminate_all_timeout(Duration::from_millis(20))
            .unwrap_err();
        match err {
            JobError::Leaked { names } => assert_eq!(names, vec!["stuck".to_string()]),
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(registry.live_count(), 0);
        release.post();
    }
}
