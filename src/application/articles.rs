//! Article repository: read-through/write-through over a [`Store`] and the
//! [`ArticleCache`], plus the listing and sampling queries built on top.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::OffsetDateTime;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::application::query::{Direction, Filter, Operator, Query, QueryResult};
use crate::application::repos::{Store, StoreError};
use crate::cache::ArticleCache;
use crate::domain::entities::{ArticleNeighbor, ArticleRecord, NewArticle};
use crate::domain::fields::ArticleField;
use crate::domain::types::ProjectedRow;

/// Added to the uniform draw so the pivot never sits at the bottom of `[0,1)`.
pub const DEFAULT_PIVOT_OFFSET: f64 = 0.1;

pub struct ArticleRepository {
    store: Arc<dyn Store<ArticleRecord>>,
    cache: Arc<ArticleCache>,
    rng: Mutex<StdRng>,
    pivot_offset: f64,
}

impl ArticleRepository {
    pub fn new(store: Arc<dyn Store<ArticleRecord>>, cache: Arc<ArticleCache>) -> Self {
        Self::with_rng(store, cache, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn Store<ArticleRecord>>,
        cache: Arc<ArticleCache>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            cache,
            rng: Mutex::new(rng),
            pivot_offset: DEFAULT_PIVOT_OFFSET,
        }
    }

    /// Offsets outside `(0, 1)`, NaN included, keep the default.
    pub fn with_pivot_offset(mut self, offset: f64) -> Self {
        if offset > 0.0 && offset < 1.0 {
            self.pivot_offset = offset;
        } else {
            warn!(offset, "ignoring invalid pivot offset");
        }
        self
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }

    /// Point lookup by id; every single-article resolution goes through here.
    pub async fn get(&self, id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        if let Some(article) = self.cache.get(id) {
            debug!(id, "article cache hit");
            return Ok(Some(article));
        }
        debug!(id, "article cache miss");

        let observed = self.cache.epoch();
        let found = self.store.get(id).await?;
        if let Some(article) = &found {
            self.cache.fill(article.clone(), observed);
        }
        Ok(found)
    }

    /// Inserts a new article with a fresh id and sampling coordinate.
    ///
    /// The cache is left alone; the first lookup populates it.
    pub async fn add(&self, article: NewArticle) -> Result<String, StoreError> {
        let now = now_millis();
        let record = ArticleRecord {
            id: Uuid::new_v4().to_string(),
            permalink: article.permalink,
            title: article.title,
            excerpt: article.excerpt,
            content: article.content,
            author_id: article.author_id,
            published: article.published,
            put_top: article.put_top,
            created: now,
            updated: now,
            random_double: self.draw_coordinate(),
            view_count: 0,
            comment_count: 0,
        };
        let id = self.store.insert(record).await?;
        debug!(id = %id, "article added");
        Ok(id)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(None).await
    }

    /// Writes the store first; the cache only sees the article once the
    /// store acknowledged it.
    pub async fn update(&self, id: &str, mut article: ArticleRecord) -> Result<(), StoreError> {
        article.id = id.to_string();
        self.store.update(id, &article).await?;
        self.cache.put(article);
        debug!(id, "article updated");
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await?;
        self.cache.remove(id);
        debug!(id, "article removed");
        Ok(())
    }

    /// Misses are not cached, so a later publish under the same permalink is
    /// picked up on the next lookup. A published row wins over a draft that
    /// shares its permalink.
    pub async fn get_by_permalink(
        &self,
        permalink: &str,
    ) -> Result<Option<ArticleRecord>, StoreError> {
        if let Some(article) = self.cache.get_by_permalink(permalink) {
            debug!(permalink, "article cache hit");
            return Ok(Some(article));
        }
        debug!(permalink, "article cache miss");

        let observed = self.cache.epoch();
        let query = Query::builder()
            .filter(Filter::equal(ArticleField::Permalink, permalink))
            .sort(ArticleField::Published, Direction::Descending)
            .page_size(1)
            .page_count(1)
            .build()?;
        let found = self.store.run_query(&query).await?.into_rows().into_iter().next();
        if let Some(article) = &found {
            self.cache.fill(article.clone(), observed);
        }
        Ok(found)
    }

    /// Published articles by one author, pinned ones first within the same
    /// update time.
    pub async fn get_by_author_id(
        &self,
        author_id: &str,
        current_page: u32,
        page_size: u32,
    ) -> Result<QueryResult<ArticleRecord>, StoreError> {
        let query = Query::builder()
            .filter(Filter::and([
                Filter::equal(ArticleField::AuthorId, author_id),
                published(),
            ]))
            .sort(ArticleField::Updated, Direction::Descending)
            .sort(ArticleField::PutTop, Direction::Descending)
            .current_page(current_page)
            .page_size(page_size)
            .page_count(1)
            .build()?;
        self.store.run_query(&query).await
    }

    pub async fn get_recent_articles(&self, n: u32) -> Result<Vec<ArticleRecord>, StoreError> {
        self.top_published(ArticleField::Updated, n).await
    }

    pub async fn get_most_comment_articles(
        &self,
        n: u32,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        self.top_published(ArticleField::CommentCount, n).await
    }

    pub async fn get_most_view_count_articles(
        &self,
        n: u32,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        self.top_published(ArticleField::ViewCount, n).await
    }

    /// The published article created right before `id`.
    pub async fn get_previous_article(
        &self,
        id: &str,
    ) -> Result<Option<ArticleNeighbor>, StoreError> {
        self.neighbor(id, Operator::LessThan, Direction::Descending)
            .await
    }

    /// The published article created right after `id`.
    pub async fn get_next_article(&self, id: &str) -> Result<Option<ArticleNeighbor>, StoreError> {
        self.neighbor(id, Operator::GreaterThan, Direction::Ascending)
            .await
    }

    /// Absent and unpublished articles both report `false`.
    pub async fn is_published(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .get(id)
            .await?
            .is_some_and(|article| article.published))
    }

    /// Up to `n` published articles picked around a random pivot.
    ///
    /// Scans `[pivot, 1)` first, then wraps to `[0, pivot]` for whatever is
    /// still missing. An article sitting exactly on the pivot can come back
    /// twice.
    pub async fn get_randomly(&self, n: u32) -> Result<Vec<ArticleRecord>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let available = self.store.count(Some(&published())).await?;
        if available == 0 {
            debug!("no published articles to sample");
            return Ok(Vec::new());
        }

        let pivot = self.draw_coordinate() + self.pivot_offset;
        trace!(pivot, requested = n, available, "sampling articles");

        let upper = Query::builder()
            .filter(Filter::and([
                Filter::greater_or_equal(ArticleField::RandomDouble, pivot),
                published(),
            ]))
            .sort(ArticleField::RandomDouble, Direction::Ascending)
            .page_size(n)
            .page_count(1)
            .build()?;
        let mut sampled = self.store.run_query(&upper).await?.into_rows();

        let fetched = u32::try_from(sampled.len()).unwrap_or(u32::MAX);
        if fetched < n {
            let lower = Query::builder()
                .filter(Filter::and([
                    Filter::greater_or_equal(ArticleField::RandomDouble, 0.0),
                    Filter::less_or_equal(ArticleField::RandomDouble, pivot),
                    published(),
                ]))
                .sort(ArticleField::RandomDouble, Direction::Ascending)
                .page_size(n - fetched)
                .page_count(1)
                .build()?;
            sampled.extend(self.store.run_query(&lower).await?.into_rows());
        }
        trace!(returned = sampled.len(), "sampled articles");
        Ok(sampled)
    }

    async fn top_published(
        &self,
        metric: ArticleField,
        n: u32,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut builder = Query::builder()
            .filter(published())
            .sort(metric, Direction::Descending);
        if metric != ArticleField::Updated {
            builder = builder.sort(ArticleField::Updated, Direction::Descending);
        }
        let query = builder.page_size(n).page_count(1).build()?;
        Ok(self.store.run_query(&query).await?.into_rows())
    }

    async fn neighbor(
        &self,
        id: &str,
        op: Operator,
        direction: Direction,
    ) -> Result<Option<ArticleNeighbor>, StoreError> {
        let Some(current) = self.get(id).await? else {
            return Ok(None);
        };

        let mut builder = Query::builder()
            .filter(Filter::and([
                Filter::property(ArticleField::Created, op, current.created),
                published(),
            ]))
            .sort(ArticleField::Created, direction)
            .page_size(1)
            .page_count(1);
        for field in ArticleNeighbor::FIELDS {
            builder = builder.project(field);
        }
        let query = builder.build()?;

        self.store
            .run_projection(&query)
            .await?
            .into_rows()
            .first()
            .map(neighbor_from_row)
            .transpose()
    }

    fn draw_coordinate(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..1.0)
    }
}

fn published() -> Filter<ArticleField> {
    Filter::equal(ArticleField::Published, true)
}

fn now_millis() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

fn neighbor_from_row(row: &ProjectedRow<ArticleField>) -> Result<ArticleNeighbor, StoreError> {
    let text = |field: ArticleField| {
        row.text(field).map(str::to_string).ok_or_else(|| {
            StoreError::integrity(format!(
                "neighbor projection v{} is missing text column `{field:?}`",
                ArticleNeighbor::PROJECTION_VERSION
            ))
        })
    };
    Ok(ArticleNeighbor {
        title: text(ArticleField::Title)?,
        permalink: text(ArticleField::Permalink)?,
        excerpt: text(ArticleField::Excerpt)?,
    })
}
