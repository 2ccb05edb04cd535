use sqlx::{Row, postgres::PgRow};

use crate::domain::entities::TagArticleRecord;
use crate::domain::fields::TagArticleField;
use crate::domain::types::{FieldName, Value};

use super::PgEntity;

#[derive(sqlx::FromRow)]
pub struct TagArticleRow {
    pub(crate) id: String,
    pub(crate) tag_id: String,
    pub(crate) article_id: String,
}

impl From<TagArticleRow> for TagArticleRecord {
    fn from(row: TagArticleRow) -> Self {
        Self {
            id: row.id,
            tag_id: row.tag_id,
            article_id: row.article_id,
        }
    }
}

impl PgEntity for TagArticleRecord {
    type Row = TagArticleRow;

    const TABLE: &'static str = "tag_articles";

    fn decode_column(row: &PgRow, field: TagArticleField) -> Result<Value, sqlx::Error> {
        Ok(Value::Text(row.try_get(field.column())?))
    }
}
