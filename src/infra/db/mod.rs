//! Postgres-backed store implementations.

mod articles;
mod sql;
mod tag_articles;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    FromRow, Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions, PgRow},
    query,
};
use tracing::debug;

use crate::application::query::{
    Filter, Pagination, ProjectionResult, Query, QueryResult,
};
use crate::application::repos::{Store, StoreError};
use crate::domain::types::{Entity, FieldName, ProjectedRow, Value};

/// Table mapping for an entity persisted in Postgres.
pub trait PgEntity: Entity {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<Self>;

    const TABLE: &'static str;

    fn decode_column(row: &PgRow, field: Self::Field) -> Result<Value, sqlx::Error>;
}

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    async fn count_where<E: PgEntity>(
        &self,
        filter: Option<&Filter<E::Field>>,
    ) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(E::TABLE);
        sql::push_where(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn pagination_for<E: PgEntity>(
        &self,
        query: &Query<E::Field>,
    ) -> Result<Pagination, StoreError> {
        match query.page_count() {
            Some(hint) => Ok(Pagination::hinted(hint)),
            None => {
                let total = self.count_where::<E>(query.filter()).await?;
                Ok(Pagination::counted(total, query.page_size()))
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, StoreError> {
        value
            .try_into()
            .map_err(|_| StoreError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl<E: PgEntity> Store<E> for PostgresRepositories {
    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        sql::push_columns(&mut qb, E::fields());
        qb.push(" FROM ");
        qb.push(E::TABLE);
        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());

        let row = qb
            .build_query_as::<E::Row>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn insert(&self, record: E) -> Result<String, StoreError> {
        let columns = E::fields();
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(E::TABLE);
        qb.push(" (");
        sql::push_columns(&mut qb, columns);
        qb.push(") VALUES (");
        for (position, field) in columns.iter().enumerate() {
            if position > 0 {
                qb.push(", ");
            }
            sql::push_value(&mut qb, &record.value(*field));
        }
        qb.push(")");

        qb.build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(record.id().to_string())
    }

    async fn update(&self, id: &str, record: &E) -> Result<(), StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(E::TABLE);
        qb.push(" SET ");
        for (position, field) in E::fields().iter().skip(1).enumerate() {
            if position > 0 {
                qb.push(", ");
            }
            qb.push(field.column());
            qb.push(" = ");
            sql::push_value(&mut qb, &record.value(*field));
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(E::TABLE);
        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count(&self, filter: Option<&Filter<E::Field>>) -> Result<u64, StoreError> {
        self.count_where::<E>(filter).await
    }

    async fn run_query(&self, query: &Query<E::Field>) -> Result<QueryResult<E>, StoreError> {
        let mut qb = sql::select(E::TABLE, E::fields(), query);
        debug!(table = E::TABLE, sql = qb.sql(), "running query");

        let rows = qb
            .build_query_as::<E::Row>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let pagination = self.pagination_for::<E>(query).await?;

        Ok(QueryResult::new(
            rows.into_iter().map(Into::into).collect(),
            pagination,
        ))
    }

    async fn run_projection(
        &self,
        query: &Query<E::Field>,
    ) -> Result<ProjectionResult<E::Field>, StoreError> {
        let fields = if query.projection().is_empty() {
            E::fields()
        } else {
            query.projection()
        };
        let mut qb = sql::select(E::TABLE, fields, query);
        debug!(table = E::TABLE, sql = qb.sql(), "running projection");

        let rows = qb
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut projected = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let value = E::decode_column(row, *field).map_err(map_sqlx_error)?;
                values.push((*field, value));
            }
            projected.push(ProjectedRow::new(values));
        }
        let pagination = self.pagination_for::<E>(query).await?;

        Ok(QueryResult::new(projected, pagination))
    }
}
