//! Composable predicates, multi-key sorts and page-based query requests.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::domain::types::{Entity, FieldName, ProjectedRow, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("page number must be at least 1")]
    ZeroPage,
    #[error("page size must be at least 1")]
    ZeroPageSize,
    #[error("page count hint must be at least 1")]
    ZeroPageCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::NotEqual => ordering != Ordering::Equal,
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Predicate tree over the fields of one entity type.
///
/// An empty `And` matches every row and an empty `Or` matches none.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<F> {
    Property { field: F, op: Operator, value: Value },
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
}

impl<F: FieldName> Filter<F> {
    pub fn property(field: F, op: Operator, value: impl Into<Value>) -> Self {
        Filter::Property {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn equal(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::Equal, value)
    }

    pub fn not_equal(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::NotEqual, value)
    }

    pub fn less_than(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::LessThan, value)
    }

    pub fn less_or_equal(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::LessThanOrEqual, value)
    }

    pub fn greater_than(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::GreaterThan, value)
    }

    pub fn greater_or_equal(field: F, value: impl Into<Value>) -> Self {
        Self::property(field, Operator::GreaterThanOrEqual, value)
    }

    pub fn and(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Evaluates the predicate against a record. Incomparable kinds never
    /// match, including under `NotEqual`.
    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        match self {
            Filter::Property { field, op, value } => entity
                .value(*field)
                .compare(value)
                .is_some_and(|ordering| op.accepts(ordering)),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(entity)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(entity)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: Direction,
}

/// Orders two records by a sort list, earlier keys first.
pub fn compare_by<E>(sorts: &[Sort<E::Field>], left: &E, right: &E) -> Ordering
where
    E: Entity,
{
    for sort in sorts {
        let ordering = left
            .value(sort.field)
            .compare(&right.value(sort.field))
            .unwrap_or(Ordering::Equal);
        let ordering = match sort.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// An immutable request handed to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<F> {
    filter: Option<Filter<F>>,
    sorts: Vec<Sort<F>>,
    current_page: u32,
    page_size: u32,
    page_count: Option<u32>,
    projection: Vec<F>,
}

impl<F: FieldName> Query<F> {
    pub fn builder() -> QueryBuilder<F> {
        QueryBuilder::default()
    }

    pub fn filter(&self) -> Option<&Filter<F>> {
        self.filter.as_ref()
    }

    pub fn sorts(&self) -> &[Sort<F>] {
        &self.sorts
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Caller-supplied page count. When present, stores skip counting.
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn projection(&self) -> &[F] {
        &self.projection
    }

    /// Number of matching rows to skip before the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.page_size)
    }

    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        self.filter
            .as_ref()
            .is_none_or(|filter| filter.matches(entity))
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder<F> {
    filter: Option<Filter<F>>,
    sorts: Vec<Sort<F>>,
    current_page: u32,
    page_size: u32,
    page_count: Option<u32>,
    projection: Vec<F>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;

impl<F> Default for QueryBuilder<F> {
    fn default() -> Self {
        Self {
            filter: None,
            sorts: Vec::new(),
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            page_count: None,
            projection: Vec::new(),
        }
    }
}

impl<F: FieldName> QueryBuilder<F> {
    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, field: F, direction: Direction) -> Self {
        self.sorts.push(Sort { field, direction });
        self
    }

    pub fn current_page(mut self, page: u32) -> Self {
        self.current_page = page;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    pub fn page_count(mut self, count: u32) -> Self {
        self.page_count = Some(count);
        self
    }

    pub fn project(mut self, field: F) -> Self {
        if !self.projection.contains(&field) {
            self.projection.push(field);
        }
        self
    }

    pub fn build(self) -> Result<Query<F>, QueryError> {
        if self.current_page == 0 {
            return Err(QueryError::ZeroPage);
        }
        if self.page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        if self.page_count == Some(0) {
            return Err(QueryError::ZeroPageCount);
        }
        Ok(Query {
            filter: self.filter,
            sorts: self.sorts,
            current_page: self.current_page,
            page_size: self.page_size,
            page_count: self.page_count,
            projection: self.projection,
        })
    }
}

/// Page metadata returned with every query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page_count: u32,
    /// Total matches; only present when the store was asked to count.
    pub record_count: Option<u64>,
}

impl Pagination {
    /// Echoes a caller-supplied page count without counting.
    pub fn hinted(page_count: u32) -> Self {
        Self {
            page_count,
            record_count: None,
        }
    }

    pub fn counted(record_count: u64, page_size: u32) -> Self {
        let pages = record_count.div_ceil(u64::from(page_size.max(1)));
        Self {
            page_count: u32::try_from(pages).unwrap_or(u32::MAX),
            record_count: Some(record_count),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult<T> {
    pub rows: Vec<T>,
    pub pagination: Pagination,
}

impl<T> QueryResult<T> {
    pub fn new(rows: Vec<T>, pagination: Pagination) -> Self {
        Self { rows, pagination }
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

pub type ProjectionResult<F> = QueryResult<ProjectedRow<F>>;
