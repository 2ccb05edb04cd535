//! Translation of the query model into parameterised SQL fragments.

use sqlx::{Postgres, QueryBuilder};

use crate::application::query::{Filter, Query, Sort};
use crate::domain::types::{FieldName, Value};

pub(super) fn push_columns<F: FieldName>(qb: &mut QueryBuilder<'_, Postgres>, fields: &[F]) {
    for (position, field) in fields.iter().enumerate() {
        if position > 0 {
            qb.push(", ");
        }
        qb.push(field.column());
    }
}

pub(super) fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Bool(value) => qb.push_bind(*value),
        Value::Int(value) => qb.push_bind(*value),
        Value::Float(value) => qb.push_bind(*value),
        Value::Text(value) => qb.push_bind(value.clone()),
    };
}

pub(super) fn push_filter<F: FieldName>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter<F>) {
    match filter {
        Filter::Property { field, op, value } => {
            qb.push(field.column());
            qb.push(" ");
            qb.push(op.as_sql());
            qb.push(" ");
            push_value(qb, value);
        }
        Filter::And(filters) => push_composite(qb, filters, " AND ", "TRUE"),
        Filter::Or(filters) => push_composite(qb, filters, " OR ", "FALSE"),
    }
}

fn push_composite<F: FieldName>(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &[Filter<F>],
    joiner: &str,
    identity: &str,
) {
    if filters.is_empty() {
        qb.push(identity);
        return;
    }
    qb.push("(");
    for (position, filter) in filters.iter().enumerate() {
        if position > 0 {
            qb.push(joiner);
        }
        push_filter(qb, filter);
    }
    qb.push(")");
}

pub(super) fn push_where<F: FieldName>(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: Option<&Filter<F>>,
) {
    if let Some(filter) = filter {
        qb.push(" WHERE ");
        push_filter(qb, filter);
    }
}

fn push_order<F: FieldName>(qb: &mut QueryBuilder<'_, Postgres>, sorts: &[Sort<F>]) {
    for (position, sort) in sorts.iter().enumerate() {
        qb.push(if position == 0 { " ORDER BY " } else { ", " });
        qb.push(sort.field.column());
        qb.push(" ");
        qb.push(sort.direction.as_sql());
    }
}

/// Builds `SELECT <columns> FROM <table> [WHERE] [ORDER BY] LIMIT OFFSET`.
pub(super) fn select<'q, F: FieldName>(
    table: &str,
    columns: &[F],
    query: &Query<F>,
) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    push_columns(&mut qb, columns);
    qb.push(" FROM ");
    qb.push(table);
    push_where(&mut qb, query.filter());
    push_order(&mut qb, query.sorts());
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(query.page_size()));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
    qb
}
