//! Command dispatch between a producer thread and a subsystem job.
//!
//! [`CommandQueue`] is the producer end: it pushes typed records into a
//! [`transport::CmdRing`] and posts the job's `consume` semaphore.
//! [`Dispatcher`] is the consumer end running on the job thread: each
//! iteration try-waits `consume`, drains the ring through an [`Executor`],
//! runs the executor's update hook and polls `exit`.

mod dispatch_loop;
mod error;
mod query;
mod queue;

pub use dispatch_loop::{
    ContinuePolicy, DispatchConfig, DispatchState, DispatchStats, Dispatcher, Executor, Flow,
};
pub use error::{DispatchError, DispatchResult};
pub use query::{QueryError, QueryResult, Status};
pub use queue::CommandQueue;

use jobs::{JobHandle, JobRegistry, JobSpec};
use transport::CmdRing;

/// Spawns a job running a [`Dispatcher`] and returns the producer queue
/// feeding it.
///
/// `make_executor` runs on the new thread, so the executor (and the backend
/// inside it) never has to be `Send`.
pub fn spawn_dispatcher<E, F>(
    registry: &mut JobRegistry,
    spec: JobSpec,
    ring_capacity: usize,
    config: DispatchConfig,
    make_executor: F,
) -> DispatchResult<CommandQueue<E::Cmd>>
where
    E: Executor + 'static,
    F: FnOnce(&JobHandle) -> E + Send + 'static,
{
    let (producer, consumer) = CmdRing::with_capacity(ring_capacity)?.split();
    let policy = config.continue_policy;
    let job = registry.create_job(spec, move |job| {
        let executor = make_executor(&job);
        Dispatcher::new(consumer, executor, config).run(&job);
    })?;
    Ok(CommandQueue::new(producer, job).with_continue_policy(policy))
}
