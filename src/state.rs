use std::sync::Arc;

use crate::{
    analytics::{Analytics, BehaviorTracker},
    catalog::Catalog,
    clock::Clock,
    config::Config,
    storage::ContentStore,
};

/// 应用程序上下文
///
/// [`AppState`] 持有文章目录服务与行为统计服务，二者共享同一个存储和时钟。
pub struct AppState<S> {
    catalog: Arc<Catalog<S>>,
    analytics: Arc<Analytics<S>>,
}

// 手动实现，避免要求 `S: Clone`
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            analytics: Arc::clone(&self.analytics),
        }
    }
}

impl<S: ContentStore> AppState<S> {
    /// 按配置组装全部服务
    pub fn new(store: S, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let store = Arc::new(store);
        let tracker = Arc::new(BehaviorTracker::new(
            Arc::clone(&clock),
            config.event_retention,
        ));

        Self {
            catalog: Arc::new(Catalog::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                config.category_cache_ttl,
                config.max_page_size,
            )),
            analytics: Arc::new(Analytics::new(store, tracker, clock)),
        }
    }

    /// 文章与分类服务
    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    /// 行为统计与推荐服务
    pub fn analytics(&self) -> &Analytics<S> {
        &self.analytics
    }
}
