//! In-process store that evaluates queries over a sorted map.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::application::query::{
    Filter, Pagination, ProjectionResult, Query, QueryResult, compare_by,
};
use crate::application::repos::{Store, StoreError};
use crate::domain::types::{Entity, ProjectedRow};

/// Volatile [`Store`] for any entity, keyed by record id.
pub struct MemoryStore<E> {
    records: RwLock<BTreeMap<String, E>>,
    queries_served: AtomicUsize,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            queries_served: AtomicUsize::new(0),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id().to_string(), record))
            .collect();
        Self {
            records: RwLock::new(records),
            queries_served: AtomicUsize::new(0),
        }
    }

    /// Number of `run_query`/`run_projection` calls answered so far.
    pub fn queries_served(&self) -> usize {
        self.queries_served.load(Ordering::SeqCst)
    }

    async fn select(&self, query: &Query<E::Field>) -> (Vec<E>, Pagination) {
        self.queries_served.fetch_add(1, Ordering::SeqCst);

        let mut matched: Vec<E> = {
            let records = self.records.read().await;
            records
                .values()
                .filter(|record| query.matches(*record))
                .cloned()
                .collect()
        };
        matched.sort_by(|left, right| compare_by(query.sorts(), left, right));

        let pagination = match query.page_count() {
            Some(hint) => Pagination::hinted(hint),
            None => Pagination::counted(matched.len() as u64, query.page_size()),
        };

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let rows: Vec<E> = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size() as usize)
            .collect();
        trace!(
            rows = rows.len(),
            page = query.current_page(),
            "memory store answered query"
        );
        (rows, pagination)
    }
}

#[async_trait]
impl<E: Entity> Store<E> for MemoryStore<E> {
    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn insert(&self, record: E) -> Result<String, StoreError> {
        let id = record.id().to_string();
        if id.is_empty() {
            return Err(StoreError::InvalidInput {
                message: "record id must not be empty".to_string(),
            });
        }
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(StoreError::Duplicate {
                constraint: "primary_key".to_string(),
            });
        }
        records.insert(id.clone(), record);
        Ok(id)
    }

    async fn update(&self, id: &str, record: &E) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records.get_mut(id).ok_or(StoreError::NotFound)?;
        *slot = record.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self, filter: Option<&Filter<E::Field>>) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        let count = match filter {
            Some(filter) => records
                .values()
                .filter(|record| filter.matches(*record))
                .count(),
            None => records.len(),
        };
        Ok(count as u64)
    }

    async fn run_query(&self, query: &Query<E::Field>) -> Result<QueryResult<E>, StoreError> {
        let (rows, pagination) = self.select(query).await;
        Ok(QueryResult::new(rows, pagination))
    }

    async fn run_projection(
        &self,
        query: &Query<E::Field>,
    ) -> Result<ProjectionResult<E::Field>, StoreError> {
        let (rows, pagination) = self.select(query).await;
        let fields = if query.projection().is_empty() {
            E::fields()
        } else {
            query.projection()
        };
        let rows = rows
            .iter()
            .map(|record| ProjectedRow::from_entity(record, fields))
            .collect();
        Ok(QueryResult::new(rows, pagination))
    }
}
