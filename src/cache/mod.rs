//! In-memory article cache.
//!
//! Articles are indexed by id and by permalink under a single lock so the
//! two indices never disagree. Capacity is controlled via `lectern.toml`:
//!
//! ```toml
//! [cache]
//! article_limit = 1024 # 0 keeps every article
//! ```

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub use store::{
    ArticleCache, Epoch, METRIC_ARTICLE_CACHE_EVICT, METRIC_ARTICLE_CACHE_HIT,
    METRIC_ARTICLE_CACHE_MISS,
};
