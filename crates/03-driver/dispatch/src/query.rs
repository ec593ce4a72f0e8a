use thiserror::Error;

/// Why a state query produced no value.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The consumer has not published this resource yet; poll again next tick.
    #[error("resource state not published yet")]
    NotReady,
    /// The slot holds a different kind of resource, or creation failed.
    #[error("resource query failed")]
    Failed,
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Flat result code for callers that only need the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotReady,
    Failed,
}

impl<T> From<&QueryResult<T>> for Status {
    fn from(result: &QueryResult<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(QueryError::NotReady) => Status::NotReady,
            Err(QueryError::Failed) => Status::Failed,
        }
    }
}
