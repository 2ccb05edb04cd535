//! Dual-indexed article cache.

use std::collections::HashMap;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use crate::domain::entities::ArticleRecord;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_ARTICLE_CACHE_HIT: &str = "lectern_article_cache_hit_total";
pub const METRIC_ARTICLE_CACHE_MISS: &str = "lectern_article_cache_miss_total";
pub const METRIC_ARTICLE_CACHE_EVICT: &str = "lectern_article_cache_evict_total";

/// Monotonic count of write-through mutations.
pub type Epoch = u64;

const INDEX_ID: &str = "id";
const INDEX_PERMALINK: &str = "permalink";

/// Both indices live behind one lock.
///
/// Invariant: every `by_permalink` entry points at an id present in `by_id`
/// whose cached article carries that permalink.
struct CacheIndex {
    by_id: LruCache<String, ArticleRecord>,
    by_permalink: HashMap<String, String>,
    epoch: Epoch,
}

impl CacheIndex {
    /// Returns how many other articles were evicted to make room.
    fn insert(&mut self, article: ArticleRecord) -> u64 {
        let mut evictions = 0;

        let stale = self
            .by_id
            .peek(&article.id)
            .filter(|previous| previous.permalink != article.permalink)
            .map(|previous| previous.permalink.clone());
        if let Some(stale) = stale {
            self.forget_permalink(&stale, &article.id);
        }

        let displaced = self
            .by_permalink
            .get(&article.permalink)
            .filter(|owner| **owner != article.id)
            .cloned();
        let mut claims_permalink = true;
        if let Some(owner) = displaced {
            let owner_published = self.by_id.peek(&owner).is_some_and(|cached| cached.published);
            if owner_published && !article.published {
                // A draft never shadows the published owner of a permalink.
                claims_permalink = false;
            } else {
                self.by_id.pop(&owner);
                evictions += 1;
            }
        }

        let id = article.id.clone();
        if claims_permalink {
            self.by_permalink
                .insert(article.permalink.clone(), id.clone());
        }
        if let Some((evicted_id, evicted)) = self.by_id.push(id.clone(), article) {
            if evicted_id != id {
                self.forget_permalink(&evicted.permalink, &evicted_id);
                evictions += 1;
            }
        }
        evictions
    }

    fn forget_permalink(&mut self, permalink: &str, id: &str) {
        if self
            .by_permalink
            .get(permalink)
            .is_some_and(|owner| owner == id)
        {
            self.by_permalink.remove(permalink);
        }
    }
}

/// Article cache keyed by id, with a permalink → id secondary index.
///
/// Lookups never touch the store and never fail; a miss is `None`.
pub struct ArticleCache {
    index: RwLock<CacheIndex>,
}

impl ArticleCache {
    pub fn new(config: &CacheConfig) -> Self {
        let by_id = match config.article_limit_non_zero() {
            Some(limit) => LruCache::new(limit),
            None => LruCache::unbounded(),
        };
        Self {
            index: RwLock::new(CacheIndex {
                by_id,
                by_permalink: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<ArticleRecord> {
        let found = rw_write(&self.index, SOURCE, "get")
            .by_id
            .get(id)
            .cloned();
        record_lookup(INDEX_ID, found.is_some());
        found
    }

    pub fn get_by_permalink(&self, permalink: &str) -> Option<ArticleRecord> {
        let found = {
            let mut guard = rw_write(&self.index, SOURCE, "get_by_permalink");
            let index = &mut *guard;
            match index.by_permalink.get(permalink) {
                Some(id) => index.by_id.get(id).cloned(),
                None => None,
            }
        };
        record_lookup(INDEX_PERMALINK, found.is_some());
        found
    }

    /// Inserts or overwrites the article under its current id and permalink.
    ///
    /// A permalink the same id was cached under before is dropped, and any
    /// other cached article still claiming the incoming permalink is evicted,
    /// unless the incoming article is a draft and the owner is published; the
    /// draft is then cached by id only.
    /// Used after a successful store write; advances the write epoch.
    pub fn put(&self, article: ArticleRecord) {
        let evictions = {
            let mut index = rw_write(&self.index, SOURCE, "put");
            index.epoch += 1;
            index.insert(article)
        };
        record_evictions(evictions);
    }

    /// Read-through population: inserts only if no write went through the
    /// cache since `observed` was taken, so a fetch that raced an update or
    /// delete cannot resurrect the older row. Returns whether it inserted.
    ///
    /// The epoch is global: a write to any id skips every fill started
    /// before it. A skipped fill only costs a later miss.
    pub fn fill(&self, article: ArticleRecord, observed: Epoch) -> bool {
        let evictions = {
            let mut index = rw_write(&self.index, SOURCE, "fill");
            if index.epoch != observed {
                return false;
            }
            index.insert(article)
        };
        record_evictions(evictions);
        true
    }

    /// Current write epoch; take it before a read-through fetch.
    pub fn epoch(&self) -> Epoch {
        rw_read(&self.index, SOURCE, "epoch").epoch
    }

    /// Evicts the article and its permalink mapping, returning what was cached.
    pub fn remove(&self, id: &str) -> Option<ArticleRecord> {
        let mut guard = rw_write(&self.index, SOURCE, "remove");
        let index = &mut *guard;
        index.epoch += 1;
        let removed = index.by_id.pop(id);
        if let Some(article) = removed.as_ref() {
            index.forget_permalink(&article.permalink, id);
        }
        removed
    }

    pub fn clear(&self) {
        let mut index = rw_write(&self.index, SOURCE, "clear");
        index.epoch += 1;
        index.by_id.clear();
        index.by_permalink.clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.index, SOURCE, "len").by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn record_evictions(evictions: u64) {
    if evictions > 0 {
        counter!(METRIC_ARTICLE_CACHE_EVICT).increment(evictions);
    }
}

fn record_lookup(index: &'static str, hit: bool) {
    if hit {
        counter!(METRIC_ARTICLE_CACHE_HIT, "index" => index).increment(1);
    } else {
        counter!(METRIC_ARTICLE_CACHE_MISS, "index" => index).increment(1);
    }
}
