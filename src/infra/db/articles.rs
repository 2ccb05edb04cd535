use sqlx::{Row, postgres::PgRow};

use crate::domain::entities::ArticleRecord;
use crate::domain::fields::ArticleField;
use crate::domain::types::{FieldName, Value};

use super::PgEntity;

#[derive(sqlx::FromRow)]
pub struct ArticleRow {
    pub(crate) id: String,
    pub(crate) permalink: String,
    pub(crate) title: String,
    pub(crate) excerpt: String,
    pub(crate) content: String,
    pub(crate) author_id: String,
    pub(crate) published: bool,
    pub(crate) put_top: bool,
    pub(crate) created: i64,
    pub(crate) updated: i64,
    pub(crate) random_double: f64,
    pub(crate) view_count: i64,
    pub(crate) comment_count: i64,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            permalink: row.permalink,
            title: row.title,
            excerpt: row.excerpt,
            content: row.content,
            author_id: row.author_id,
            published: row.published,
            put_top: row.put_top,
            created: row.created,
            updated: row.updated,
            random_double: row.random_double,
            view_count: row.view_count,
            comment_count: row.comment_count,
        }
    }
}

impl PgEntity for ArticleRecord {
    type Row = ArticleRow;

    const TABLE: &'static str = "articles";

    fn decode_column(row: &PgRow, field: ArticleField) -> Result<Value, sqlx::Error> {
        let column = field.column();
        let value = match field {
            ArticleField::Published | ArticleField::PutTop => Value::Bool(row.try_get(column)?),
            ArticleField::Created
            | ArticleField::Updated
            | ArticleField::ViewCount
            | ArticleField::CommentCount => Value::Int(row.try_get(column)?),
            ArticleField::RandomDouble => Value::Float(row.try_get(column)?),
            ArticleField::Id
            | ArticleField::Permalink
            | ArticleField::Title
            | ArticleField::Excerpt
            | ArticleField::Content
            | ArticleField::AuthorId => Value::Text(row.try_get(column)?),
        };
        Ok(value)
    }
}
