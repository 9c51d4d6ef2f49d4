use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    /// The container could not be started or inspected.
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    /// The server never accepted a connection within the retry budget.
    #[error("mysql not reachable after {attempts} attempts: {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
