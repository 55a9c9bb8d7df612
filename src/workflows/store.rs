//! Error surface shared by the job and dispute stores.

/// Failure modes common to every repository implementation. `VersionConflict`
/// is the optimistic-concurrency signal: the caller read a record, someone
/// else committed first, and the conditional write was refused.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record version is stale")]
    VersionConflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
