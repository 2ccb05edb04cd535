//! Store adapter contract consumed by the repositories.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::query::{Filter, ProjectionResult, Query, QueryError, QueryResult};
use crate::domain::types::Entity;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("store timeout")]
    Timeout,
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// CRUD and query access to durable storage for one entity type.
///
/// Reads report a missing record as `Ok(None)`; `update` and `delete` of a
/// missing id fail with [`StoreError::NotFound`]. Implementations own any
/// retry or timeout policy.
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<E>, StoreError>;

    async fn insert(&self, record: E) -> Result<String, StoreError>;

    async fn update(&self, id: &str, record: &E) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Counts records matching `filter`, or all records when `None`.
    async fn count(&self, filter: Option<&Filter<E::Field>>) -> Result<u64, StoreError>;

    async fn run_query(&self, query: &Query<E::Field>) -> Result<QueryResult<E>, StoreError>;

    /// Runs `query` returning only the columns in its projection list.
    async fn run_projection(
        &self,
        query: &Query<E::Field>,
    ) -> Result<ProjectionResult<E::Field>, StoreError>;
}
