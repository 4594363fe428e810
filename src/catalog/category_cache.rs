use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::{clock::Clock, content::Category, error::Result, storage::ContentStore};

/// 默认缓存有效期：5 分钟
pub const DEFAULT_CATEGORY_TTL: Duration = Duration::minutes(5);

/// 缓存条目
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    timestamp: DateTime<Utc>,
}

impl<T: Clone> CacheEntry<T> {
    /// `now - timestamp < ttl` 时命中
    fn fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<T> {
        (now - self.timestamp < ttl).then(|| self.data.clone())
    }
}

#[derive(Default)]
struct Entries {
    all: Option<CacheEntry<Arc<Vec<Category>>>>,
    by_slug: HashMap<String, CacheEntry<Category>>,
    /// 每次失效加一；回源前后不一致时结果不回填
    generation: u64,
}

/// 分类读穿缓存
///
/// 读取时若条目未过期直接返回，否则回源到 [`ContentStore`] 并回填。
/// 任何分类写操作都会调用 [`CategoryCache::invalidate`] 清空整个缓存；
/// 回源期间发生过失效的读取结果照常返回，但不回填。
///
/// 回源失败时返回 [`crate::error::Error::StoreUnavailable`]，已有条目保持不变，
/// 过期条目仍可通过 [`CategoryCache::stale_categories`] 取得。
/// 不存在的 slug 不缓存。
pub struct CategoryCache<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<Entries>,
}

impl<S: ContentStore> CategoryCache<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// 全部分类
    pub async fn get_categories(&self) -> Result<Arc<Vec<Category>>> {
        let now = self.clock.now();

        let generation = {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.all.as_ref().and_then(|e| e.fresh(now, self.ttl)) {
                tracing::debug!("category cache hit: all");
                return Ok(hit);
            }
            entries.generation
        };

        tracing::debug!("category cache miss: all");
        let data = Arc::new(self.store.categories().await?);

        let mut entries = self.entries.write().await;
        if entries.generation == generation {
            entries.all = Some(CacheEntry {
                data: Arc::clone(&data),
                timestamp: now,
            });
        } else {
            tracing::debug!("category cache invalidated during fetch, not storing: all");
        }
        Ok(data)
    }

    /// 按 slug 查询分类
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let now = self.clock.now();

        let generation = {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.by_slug.get(slug).and_then(|e| e.fresh(now, self.ttl)) {
                tracing::debug!(slug, "category cache hit");
                return Ok(Some(hit));
            }
            entries.generation
        };

        tracing::debug!(slug, "category cache miss");
        let category = self.store.category_by_slug(slug).await?;

        if let Some(category) = &category {
            let mut entries = self.entries.write().await;
            if entries.generation == generation {
                entries.by_slug.insert(
                    slug.to_string(),
                    CacheEntry {
                        data: category.clone(),
                        timestamp: now,
                    },
                );
            } else {
                tracing::debug!(slug, "category cache invalidated during fetch, not storing");
            }
        }
        Ok(category)
    }

    /// 按 id 从缓存的分类列表中查找
    pub async fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let categories = self.get_categories().await?;
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    /// 最近一次成功读取的分类列表，不论是否过期
    pub async fn stale_categories(&self) -> Option<Arc<Vec<Category>>> {
        self.entries
            .read()
            .await
            .all
            .as_ref()
            .map(|e| Arc::clone(&e.data))
    }

    /// 清空整个缓存
    pub async fn invalidate(&self) {
        let mut entries = self.entries.write().await;
        entries.all = None;
        entries.by_slug.clear();
        entries.generation += 1;
        tracing::debug!("category cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::{
        clock::ManualClock,
        content::{Article, ArticleInput, CategoryInput},
        storage::{ArticleFilter, ArticleQuery, MemoryStore, StoreResult},
    };

    /// 分类读取完成后停住，直到 `resume` 被通知
    #[derive(Default)]
    struct PausingStore {
        inner: MemoryStore,
        armed: AtomicBool,
        fetched: Notify,
        resume: Notify,
    }

    impl PausingStore {
        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        async fn pause(&self) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.fetched.notify_one();
                self.resume.notified().await;
            }
        }
    }

    impl ContentStore for PausingStore {
        async fn categories(&self) -> StoreResult<Vec<Category>> {
            let categories = self.inner.categories().await?;
            self.pause().await;
            Ok(categories)
        }

        async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
            let category = self.inner.category_by_slug(slug).await?;
            self.pause().await;
            Ok(category)
        }

        async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
            self.inner.category_by_id(id).await
        }

        async fn insert_category(
            &self,
            input: &CategoryInput,
            now: DateTime<Utc>,
        ) -> StoreResult<Category> {
            self.inner.insert_category(input, now).await
        }

        async fn update_category(
            &self,
            id: i64,
            input: &CategoryInput,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<Category>> {
            self.inner.update_category(id, input, now).await
        }

        async fn delete_category(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_category(id).await
        }

        async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<i64> {
            self.inner.count_articles(filter).await
        }

        async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
            self.inner.list_articles(query).await
        }

        async fn article_by_slug(&self, slug: &str) -> StoreResult<Option<Article>> {
            self.inner.article_by_slug(slug).await
        }

        async fn article_by_id(&self, id: i64) -> StoreResult<Option<Article>> {
            self.inner.article_by_id(id).await
        }

        async fn articles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Article>> {
            self.inner.articles_by_ids(ids).await
        }

        async fn search_articles(&self, term: &str, limit: i64) -> StoreResult<Vec<Article>> {
            self.inner.search_articles(term, limit).await
        }

        async fn insert_article(
            &self,
            input: &ArticleInput,
            now: DateTime<Utc>,
        ) -> StoreResult<Article> {
            self.inner.insert_article(input, now).await
        }

        async fn update_article(
            &self,
            id: i64,
            input: &ArticleInput,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<Article>> {
            self.inner.update_article(id, input, now).await
        }

        async fn set_published(
            &self,
            id: i64,
            published: bool,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<Article>> {
            self.inner.set_published(id, published, now).await
        }

        async fn delete_article(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_article(id).await
        }
    }

    fn news(name_en: &str) -> CategoryInput {
        CategoryInput {
            slug: "news".into(),
            name_en: name_en.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_racing_invalidate_is_not_stored() {
        let store = Arc::new(PausingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(CategoryCache::new(
            store.clone(),
            clock.clone(),
            DEFAULT_CATEGORY_TTL,
        ));

        store.arm();
        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_categories().await }
        });
        store.fetched.notified().await;

        // 读取拿到空表后，写入并失效
        store.inner.insert_category(&news("News"), clock.now()).await.unwrap();
        cache.invalidate().await;
        store.resume.notify_one();

        let stale = reader.await.unwrap().unwrap();
        assert!(stale.is_empty());

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slug_fetch_racing_invalidate_is_not_stored() {
        let store = Arc::new(PausingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let id = store
            .inner
            .insert_category(&news("News"), clock.now())
            .await
            .unwrap()
            .id;
        let cache = Arc::new(CategoryCache::new(
            store.clone(),
            clock.clone(),
            DEFAULT_CATEGORY_TTL,
        ));

        store.arm();
        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_category_by_slug("news").await }
        });
        store.fetched.notified().await;

        store
            .inner
            .update_category(id, &news("Breaking"), clock.now())
            .await
            .unwrap();
        cache.invalidate().await;
        store.resume.notify_one();

        let stale = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(stale.name.en, "News");

        clock.advance(Duration::minutes(1));
        let fresh = cache.get_category_by_slug("news").await.unwrap().unwrap();
        assert_eq!(fresh.name.en, "Breaking");
    }

    #[test]
    fn test_entry_fresh_boundary() {
        let now = Utc::now();
        let entry = CacheEntry {
            data: 1,
            timestamp: now,
        };
        let ttl = Duration::minutes(5);

        assert_eq!(entry.fresh(now + Duration::minutes(4), ttl), Some(1));
        assert_eq!(entry.fresh(now + ttl - Duration::microseconds(1), ttl), Some(1));
        assert_eq!(entry.fresh(now + ttl, ttl), None);
    }

    #[tokio::test]
    async fn test_slug_lookup_is_cached() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        store
            .insert_category(
                &CategoryInput {
                    slug: "news".into(),
                    name_en: "News".into(),
                    ..Default::default()
                },
                clock.now(),
            )
            .await
            .unwrap();

        let cache = CategoryCache::new(store.clone(), clock.clone(), DEFAULT_CATEGORY_TTL);
        assert!(cache.get_category_by_slug("news").await.unwrap().is_some());
        assert!(cache.get_category_by_slug("news").await.unwrap().is_some());
        assert_eq!(store.category_fetches(), 1);

        // 不存在的 slug 每次都回源
        assert!(cache.get_category_by_slug("none").await.unwrap().is_none());
        assert!(cache.get_category_by_slug("none").await.unwrap().is_none());
        assert_eq!(store.category_fetches(), 3);
    }
}
