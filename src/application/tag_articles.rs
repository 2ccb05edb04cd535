//! Tag to article relation lookups.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::query::{Direction, Filter, Query, QueryResult};
use crate::application::repos::{Store, StoreError};
use crate::domain::entities::TagArticleRecord;
use crate::domain::fields::TagArticleField;

pub struct TagArticleRepository {
    store: Arc<dyn Store<TagArticleRecord>>,
}

impl TagArticleRepository {
    pub fn new(store: Arc<dyn Store<TagArticleRecord>>) -> Self {
        Self { store }
    }

    /// Every relation of one article, in a single page.
    pub async fn get_by_article_id(
        &self,
        article_id: &str,
    ) -> Result<Vec<TagArticleRecord>, StoreError> {
        let query = Query::builder()
            .filter(Filter::equal(TagArticleField::ArticleId, article_id))
            .page_size(u32::MAX)
            .page_count(1)
            .build()?;
        Ok(self.store.run_query(&query).await?.into_rows())
    }

    /// One page of a tag's relations, newest article ids first, with the total
    /// page count computed by the store.
    pub async fn get_by_tag_id(
        &self,
        tag_id: &str,
        current_page: u32,
        page_size: u32,
    ) -> Result<QueryResult<TagArticleRecord>, StoreError> {
        let query = Query::builder()
            .filter(Filter::equal(TagArticleField::TagId, tag_id))
            .sort(TagArticleField::ArticleId, Direction::Descending)
            .current_page(current_page)
            .page_size(page_size)
            .build()?;
        self.store.run_query(&query).await
    }

    pub async fn add(&self, tag_id: &str, article_id: &str) -> Result<String, StoreError> {
        let record = TagArticleRecord {
            id: Uuid::new_v4().to_string(),
            tag_id: tag_id.to_string(),
            article_id: article_id.to_string(),
        };
        let id = self.store.insert(record).await?;
        debug!(id = %id, tag_id, article_id, "tag relation added");
        Ok(id)
    }

    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await
    }
}
