use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to spawn job thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("job registry is full ({max} jobs)")]
    TooManyJobs { max: usize },

    #[error("jobs did not terminate in time and were detached: {names:?}")]
    Leaked { names: Vec<String> },
}
