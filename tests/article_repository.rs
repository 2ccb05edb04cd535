use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lectern::application::articles::ArticleRepository;
use lectern::application::query::{Filter, ProjectionResult, Query, QueryResult};
use lectern::application::repos::{Store, StoreError};
use lectern::cache::{ArticleCache, CacheConfig};
use lectern::domain::entities::{ArticleRecord, NewArticle};
use lectern::domain::fields::ArticleField;
use lectern::infra::memory::MemoryStore;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn article(id: &str, permalink: &str, created: i64, random_double: f64) -> ArticleRecord {
    ArticleRecord {
        id: id.to_string(),
        permalink: permalink.to_string(),
        title: format!("Title {id}"),
        excerpt: format!("Excerpt {id}"),
        content: format!("Body of {id}"),
        author_id: "author-1".to_string(),
        published: true,
        put_top: false,
        created,
        updated: created,
        random_double,
        view_count: 0,
        comment_count: 0,
    }
}

fn unpublished(mut record: ArticleRecord) -> ArticleRecord {
    record.published = false;
    record
}

fn repository(
    store: Arc<dyn Store<ArticleRecord>>,
    seed: u64,
) -> (ArticleRepository, Arc<ArticleCache>) {
    let cache = Arc::new(ArticleCache::new(&CacheConfig::default()));
    let repo = ArticleRepository::with_rng(store, cache.clone(), StdRng::seed_from_u64(seed));
    (repo, cache)
}

/// Ten published articles spread evenly over the sampling range plus
/// unpublished noise.
fn sampling_fixture() -> Vec<ArticleRecord> {
    let mut records: Vec<ArticleRecord> = (0..10)
        .map(|i| {
            article(
                &format!("p{i}"),
                &format!("/p{i}"),
                i64::from(i) * 100,
                f64::from(i) / 10.0 + 0.05,
            )
        })
        .collect();
    records.push(unpublished(article("draft-low", "/draft-low", 5, 0.01)));
    records.push(unpublished(article("draft-high", "/draft-high", 6, 0.99)));
    records
}

/// Delegates to a [`MemoryStore`] and fails writes on demand.
struct FlakyStore {
    inner: MemoryStore<ArticleRecord>,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new(records: Vec<ArticleRecord>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::from_persistence("write rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl Store<ArticleRecord> for FlakyStore {
    async fn get(&self, id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn insert(&self, record: ArticleRecord) -> Result<String, StoreError> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn update(&self, id: &str, record: &ArticleRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update(id, record).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn count(&self, filter: Option<&Filter<ArticleField>>) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }

    async fn run_query(
        &self,
        query: &Query<ArticleField>,
    ) -> Result<QueryResult<ArticleRecord>, StoreError> {
        self.inner.run_query(query).await
    }

    async fn run_projection(
        &self,
        query: &Query<ArticleField>,
    ) -> Result<ProjectionResult<ArticleField>, StoreError> {
        self.inner.run_projection(query).await
    }
}

/// Simulates a writer that removes the article from the cache while a
/// reader's store fetch is in flight.
struct RacingStore {
    inner: MemoryStore<ArticleRecord>,
    cache: Arc<ArticleCache>,
}

#[async_trait]
impl Store<ArticleRecord> for RacingStore {
    async fn get(&self, id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        let found = self.inner.get(id).await;
        self.cache.remove(id);
        found
    }

    async fn insert(&self, record: ArticleRecord) -> Result<String, StoreError> {
        self.inner.insert(record).await
    }

    async fn update(&self, id: &str, record: &ArticleRecord) -> Result<(), StoreError> {
        self.inner.update(id, record).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn count(&self, filter: Option<&Filter<ArticleField>>) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }

    async fn run_query(
        &self,
        query: &Query<ArticleField>,
    ) -> Result<QueryResult<ArticleRecord>, StoreError> {
        self.inner.run_query(query).await
    }

    async fn run_projection(
        &self,
        query: &Query<ArticleField>,
    ) -> Result<ProjectionResult<ArticleField>, StoreError> {
        self.inner.run_projection(query).await
    }
}

#[tokio::test]
async fn get_reads_through_and_populates_cache() {
    let store = Arc::new(MemoryStore::with_records([article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store.clone(), 1);
    assert!(cache.get("a1").is_none());

    let fetched = repo.get("a1").await.expect("get").expect("article");

    let direct = store.get("a1").await.expect("store get").expect("stored");
    assert_eq!(fetched, direct);
    assert_eq!(cache.get("a1"), Some(direct.clone()));
    assert_eq!(cache.get_by_permalink("/a1"), Some(direct));
}

#[tokio::test]
async fn get_of_missing_article_is_absent_and_not_cached() {
    let store = Arc::new(MemoryStore::<ArticleRecord>::new());
    let (repo, cache) = repository(store, 1);

    assert!(repo.get("ghost").await.expect("get").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn read_through_does_not_resurrect_a_concurrently_evicted_article() {
    let cache = Arc::new(ArticleCache::new(&CacheConfig::default()));
    let store = Arc::new(RacingStore {
        inner: MemoryStore::with_records([article("a1", "/a1", 1, 0.3)]),
        cache: cache.clone(),
    });
    let repo = ArticleRepository::with_rng(store, cache.clone(), StdRng::seed_from_u64(3));

    assert!(repo.get("a1").await.expect("get").is_some());
    assert!(cache.get("a1").is_none());
    assert!(cache.get_by_permalink("/a1").is_none());
}

#[tokio::test]
async fn update_writes_store_before_cache() {
    let store = Arc::new(MemoryStore::with_records([article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store.clone(), 1);
    let mut current = repo.get("a1").await.expect("get").expect("article");

    current.title = "Revised".to_string();
    repo.update("a1", current.clone()).await.expect("update");

    let stored = store.get("a1").await.expect("store get").expect("stored");
    assert_eq!(stored.title, "Revised");
    assert_eq!(cache.get("a1").map(|a| a.title), Some("Revised".to_string()));
}

#[tokio::test]
async fn update_forces_the_id_it_was_given() {
    let store = Arc::new(MemoryStore::with_records([article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store, 1);

    let mut replacement = article("other", "/a1", 1, 0.3);
    replacement.title = "Replaced".to_string();
    repo.update("a1", replacement).await.expect("update");

    let cached = cache.get("a1").expect("cached");
    assert_eq!(cached.id, "a1");
    assert!(cache.get("other").is_none());
}

#[tokio::test]
async fn failed_update_leaves_cache_untouched() {
    let store = Arc::new(FlakyStore::new(vec![article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store.clone(), 1);
    let mut current = repo.get("a1").await.expect("get").expect("article");
    store.fail_writes();

    current.title = "Never stored".to_string();
    let err = repo.update("a1", current).await.expect_err("update fails");

    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(cache.get("a1").map(|a| a.title), Some("Title a1".to_string()));
}

#[tokio::test]
async fn update_of_missing_article_fails_without_caching() {
    let store = Arc::new(MemoryStore::<ArticleRecord>::new());
    let (repo, cache) = repository(store, 1);

    let err = repo
        .update("ghost", article("ghost", "/ghost", 1, 0.3))
        .await
        .expect_err("missing");
    assert!(matches!(err, StoreError::NotFound));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn remove_evicts_both_indexes() {
    let store = Arc::new(MemoryStore::with_records([article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store, 1);
    assert!(repo.get_by_permalink("/a1").await.expect("lookup").is_some());
    assert_eq!(cache.len(), 1);

    repo.remove("a1").await.expect("remove");

    assert!(repo.get("a1").await.expect("get").is_none());
    assert!(repo.get_by_permalink("/a1").await.expect("lookup").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn failed_remove_keeps_cached_article() {
    let store = Arc::new(FlakyStore::new(vec![article("a1", "/a1", 1, 0.3)]));
    let (repo, cache) = repository(store.clone(), 1);
    repo.get("a1").await.expect("get");
    store.fail_writes();

    assert!(repo.remove("a1").await.is_err());
    assert!(cache.get("a1").is_some());
    assert!(cache.get_by_permalink("/a1").is_some());
}

#[tokio::test]
async fn permalink_change_drops_old_lookup() {
    let store = Arc::new(MemoryStore::with_records([article("a1", "a", 1, 0.3)]));
    let (repo, cache) = repository(store, 1);
    let mut current = repo
        .get_by_permalink("a")
        .await
        .expect("lookup")
        .expect("article");

    current.permalink = "b".to_string();
    repo.update("a1", current).await.expect("update");

    assert!(repo.get_by_permalink("a").await.expect("lookup").is_none());
    let moved = repo
        .get_by_permalink("b")
        .await
        .expect("lookup")
        .expect("article");
    assert_eq!(moved.id, "a1");
    assert!(cache.get_by_permalink("a").is_none());
}

#[tokio::test]
async fn permalink_miss_is_not_negatively_cached() {
    let store = Arc::new(MemoryStore::<ArticleRecord>::new());
    let (repo, _cache) = repository(store.clone(), 1);

    assert!(repo.get_by_permalink("/later").await.expect("lookup").is_none());
    store
        .insert(article("a1", "/later", 1, 0.3))
        .await
        .expect("insert");

    let found = repo
        .get_by_permalink("/later")
        .await
        .expect("lookup")
        .expect("article");
    assert_eq!(found.id, "a1");
}

#[tokio::test]
async fn cached_articles_agree_across_indexes() {
    let store = Arc::new(MemoryStore::with_records(sampling_fixture()));
    let (repo, cache) = repository(store, 1);

    for i in 0..10 {
        repo.get(&format!("p{i}")).await.expect("get");
    }
    for i in (0..10).step_by(2) {
        repo.get_by_permalink(&format!("/p{i}"))
            .await
            .expect("lookup");
    }

    for i in 0..10 {
        let by_id = cache.get(&format!("p{i}")).expect("cached by id");
        let by_permalink = cache
            .get_by_permalink(&by_id.permalink)
            .expect("cached by permalink");
        assert_eq!(by_permalink.id, by_id.id);
    }
}

#[tokio::test]
async fn add_assigns_identity_and_sampling_coordinate() {
    let store = Arc::new(MemoryStore::<ArticleRecord>::new());
    let (repo, cache) = repository(store.clone(), 9);

    let id = repo
        .add(NewArticle {
            permalink: "/fresh".to_string(),
            title: "Fresh".to_string(),
            excerpt: "short".to_string(),
            content: "long".to_string(),
            author_id: "author-1".to_string(),
            published: true,
            put_top: false,
        })
        .await
        .expect("add");

    assert!(!id.is_empty());
    assert_eq!(repo.count().await.expect("count"), 1);
    assert!(cache.is_empty());

    let stored = store.get(&id).await.expect("store get").expect("stored");
    assert!((0.0..1.0).contains(&stored.random_double));
    assert_eq!(stored.created, stored.updated);
    assert_eq!(stored.view_count, 0);
}

#[tokio::test]
async fn author_listing_orders_by_update_then_pinned() {
    let mut older = article("older", "/older", 1, 0.1);
    older.updated = 10;
    let mut newest = article("newest", "/newest", 2, 0.2);
    newest.updated = 30;
    let mut tied = article("tied", "/tied", 3, 0.3);
    tied.updated = 20;
    let mut pinned = article("pinned", "/pinned", 4, 0.4);
    pinned.updated = 20;
    pinned.put_top = true;
    let draft = unpublished(article("draft", "/draft", 5, 0.5));
    let mut foreign = article("foreign", "/foreign", 6, 0.6);
    foreign.author_id = "author-2".to_string();

    let store = Arc::new(MemoryStore::with_records([
        older, newest, tied, pinned, draft, foreign,
    ]));
    let (repo, _cache) = repository(store, 1);

    let page = repo
        .get_by_author_id("author-1", 1, 10)
        .await
        .expect("listing");
    let ids: Vec<_> = page.rows.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["newest", "pinned", "tied", "older"]);
    assert_eq!(page.pagination.page_count, 1);
    assert!(page.pagination.record_count.is_none());

    let second = repo
        .get_by_author_id("author-1", 2, 3)
        .await
        .expect("listing");
    let ids: Vec<_> = second.rows.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["older"]);
}

#[tokio::test]
async fn top_lists_sort_by_metric_with_update_tiebreak() {
    let mut a = article("a", "/a", 1, 0.1);
    a.updated = 1;
    a.comment_count = 5;
    a.view_count = 100;
    let mut b = article("b", "/b", 2, 0.2);
    b.updated = 3;
    b.comment_count = 5;
    b.view_count = 10;
    let mut c = article("c", "/c", 3, 0.3);
    c.updated = 2;
    c.comment_count = 9;
    c.view_count = 50;
    let mut draft = unpublished(article("draft", "/draft", 4, 0.4));
    draft.updated = 99;
    draft.comment_count = 99;
    draft.view_count = 999;

    let store = Arc::new(MemoryStore::with_records([a, b, c, draft]));
    let (repo, _cache) = repository(store, 1);

    let ids = |rows: Vec<ArticleRecord>| rows.into_iter().map(|a| a.id).collect::<Vec<_>>();

    assert_eq!(
        ids(repo.get_recent_articles(2).await.expect("recent")),
        ["b", "c"]
    );
    assert_eq!(
        ids(repo.get_most_comment_articles(3).await.expect("comments")),
        ["c", "b", "a"]
    );
    assert_eq!(
        ids(repo.get_most_view_count_articles(1).await.expect("views")),
        ["a"]
    );
    assert!(repo.get_recent_articles(0).await.expect("recent").is_empty());
}

#[tokio::test]
async fn neighbors_skip_drafts_and_stop_at_boundaries() {
    let store = Arc::new(MemoryStore::with_records([
        article("first", "/first", 100, 0.1),
        unpublished(article("draft", "/draft", 150, 0.2)),
        article("middle", "/middle", 200, 0.3),
        article("last", "/last", 300, 0.4),
    ]));
    let (repo, _cache) = repository(store, 1);

    assert!(
        repo.get_previous_article("first")
            .await
            .expect("previous")
            .is_none()
    );
    assert!(repo.get_next_article("last").await.expect("next").is_none());

    let previous = repo
        .get_previous_article("middle")
        .await
        .expect("previous")
        .expect("neighbor");
    assert_eq!(previous.permalink, "/first");
    assert_eq!(previous.title, "Title first");
    assert_eq!(previous.excerpt, "Excerpt first");

    let next = repo
        .get_next_article("first")
        .await
        .expect("next")
        .expect("neighbor");
    assert_eq!(next.permalink, "/middle");
}

#[tokio::test]
async fn neighbors_of_unknown_article_are_absent() {
    let store = Arc::new(MemoryStore::with_records([article("a", "/a", 1, 0.1)]));
    let (repo, _cache) = repository(store.clone(), 1);

    assert!(
        repo.get_previous_article("ghost")
            .await
            .expect("previous")
            .is_none()
    );
    assert!(repo.get_next_article("ghost").await.expect("next").is_none());
    assert_eq!(store.queries_served(), 0);
}

#[tokio::test]
async fn is_published_conflates_absent_and_draft() {
    let store = Arc::new(MemoryStore::with_records([
        article("live", "/live", 1, 0.1),
        unpublished(article("draft", "/draft", 2, 0.2)),
    ]));
    let (repo, _cache) = repository(store, 1);

    assert!(repo.is_published("live").await.expect("live"));
    assert!(!repo.is_published("draft").await.expect("draft"));
    assert!(!repo.is_published("ghost").await.expect("ghost"));
}

#[tokio::test]
async fn permalink_shared_with_a_draft_resolves_to_published_article() {
    let store = Arc::new(MemoryStore::with_records([
        unpublished(article("draft", "/shared", 2, 0.2)),
        article("live", "/shared", 1, 0.1),
    ]));
    let (repo, cache) = repository(store, 1);

    let found = repo
        .get_by_permalink("/shared")
        .await
        .expect("lookup")
        .expect("article");
    assert_eq!(found.id, "live");

    assert!(!repo.is_published("draft").await.expect("draft"));
    assert!(cache.get("live").is_some());
    let cached = repo
        .get_by_permalink("/shared")
        .await
        .expect("lookup")
        .expect("article");
    assert_eq!(cached.id, "live");
}

#[tokio::test]
async fn random_on_empty_published_set_issues_no_query() {
    let store = Arc::new(MemoryStore::with_records([unpublished(article(
        "draft", "/draft", 1, 0.5,
    ))]));
    let (repo, _cache) = repository(store.clone(), 1);

    assert!(repo.get_randomly(5).await.expect("random").is_empty());
    assert_eq!(store.queries_served(), 0);

    let empty = Arc::new(MemoryStore::<ArticleRecord>::new());
    let (repo, _cache) = repository(empty.clone(), 1);
    assert!(repo.get_randomly(5).await.expect("random").is_empty());
    assert_eq!(empty.queries_served(), 0);
}

#[tokio::test]
async fn random_returns_between_min_n_published_and_n() {
    let store = Arc::new(MemoryStore::with_records(sampling_fixture()));

    for seed in 0..50 {
        let (repo, _cache) = repository(store.clone(), seed);

        let sample = repo.get_randomly(4).await.expect("random");
        assert_eq!(sample.len(), 4, "seed {seed}");
        assert!(sample.iter().all(|a| a.published));

        let everything = repo.get_randomly(20).await.expect("random");
        assert_eq!(everything.len(), 10, "seed {seed}");
        let distinct: HashSet<_> = everything.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(distinct.len(), 10, "seed {seed}");
    }

    let (repo, _cache) = repository(store, 0);
    assert!(repo.get_randomly(0).await.expect("random").is_empty());
}

#[tokio::test]
async fn random_sampling_reaches_every_published_article() {
    let store = Arc::new(MemoryStore::with_records(sampling_fixture()));
    let (repo, _cache) = repository(store, 7);

    let mut seen = HashSet::new();
    for _ in 0..400 {
        for picked in repo.get_randomly(1).await.expect("random") {
            assert!(picked.published);
            seen.insert(picked.id);
        }
    }

    for i in 0..10 {
        assert!(seen.contains(&format!("p{i}")), "p{i} never sampled");
    }
}

#[tokio::test]
async fn random_segments_keep_ascending_order_within_each_range() {
    let store = Arc::new(MemoryStore::with_records(sampling_fixture()));
    let (repo, _cache) = repository(store, 11);

    let sample = repo.get_randomly(10).await.expect("random");
    let coordinates: Vec<f64> = sample.iter().map(|a| a.random_double).collect();
    let descents = coordinates
        .windows(2)
        .filter(|pair| pair[1] < pair[0])
        .count();
    assert!(descents <= 1, "more than one wraparound in {coordinates:?}");
}

#[tokio::test]
async fn store_failures_propagate_unchanged() {
    let store = Arc::new(FlakyStore::new(Vec::new()));
    let (repo, _cache) = repository(store.clone(), 1);
    store.fail_writes();

    let err = repo
        .add(NewArticle {
            permalink: "/x".to_string(),
            title: "X".to_string(),
            excerpt: String::new(),
            content: String::new(),
            author_id: "author-1".to_string(),
            published: true,
            put_top: false,
        })
        .await
        .expect_err("insert fails");
    assert!(matches!(err, StoreError::Persistence(message) if message == "write rejected"));
}
