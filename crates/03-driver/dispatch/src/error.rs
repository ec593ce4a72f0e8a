use jobs::JobError;
use thiserror::Error;
use transport::TransportError;

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("job error: {0}")]
    Job(#[from] JobError),
}
