//! Dedicated subsystem threads and their four-semaphore handshake.
//!
//! Every job is one OS thread plus `continue`, `consume`, `exit` and
//! `terminated` semaphores. [`JobRegistry`] creates jobs (blocking until the
//! thread acknowledges startup) and tears them down newest first.
//! [`SingleThreadUpdates`] runs the same subsystem ticks inline where threads
//! are unavailable.

mod error;
mod job;
mod registry;
mod single_thread;

pub use error::{JobError, JobResult};
pub use job::{CompletionFn, JobHandle, JobSpec, JobState, Signal};
pub use registry::{JobRegistry, MAX_JOBS};
pub use single_thread::{SingleThreadUpdates, UpdateJob};
