//! 用户行为统计与个性化推荐
//!
//! [`BehaviorTracker`] 保存事件日志并同步维护每篇文章的表现聚合；
//! [`Analytics`] 在其之上结合文章存储提供推荐和 session 概览。

mod events;
mod insights;
mod performance;
mod recommend;
mod tracker;

use std::sync::Arc;

use serde::Serialize;

pub use self::{
    events::{BehaviorAction, BehaviorEvent, TrackEvent},
    insights::UserInsights,
    performance::{ContentPerformance, engagement_score, is_trending, trending_window},
    recommend::{
        CANDIDATE_POOL_SIZE, Candidate, RECOMMENDATION_LIMIT, RULES, Rule, SessionContext,
        category_affinity, engagement, rank, reading_time_similarity, recency, weighted_score,
    },
    tracker::{BehaviorTracker, SweepReport, default_retention},
};
use crate::{clock::Clock, storage::ContentStore};

/// 默认热门条数
pub const DEFAULT_TRENDING_LIMIT: usize = 10;

/// 文章表现查询结果
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PerformanceReport {
    /// 单篇文章，从未被记录过时为 `None`
    Article(Option<ContentPerformance>),
    /// 全部文章，按得分降序
    All(Vec<ContentPerformance>),
}

pub struct Analytics<S> {
    store: Arc<S>,
    tracker: Arc<BehaviorTracker>,
    clock: Arc<dyn Clock>,
}

impl<S: ContentStore> Analytics<S> {
    pub fn new(store: Arc<S>, tracker: Arc<BehaviorTracker>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            tracker,
            clock,
        }
    }

    pub fn tracker(&self) -> &Arc<BehaviorTracker> {
        &self.tracker
    }

    /// 记录行为，见 [`BehaviorTracker::track_behavior`]
    pub async fn track_behavior(&self, event: TrackEvent) {
        self.tracker.track_behavior(event).await
    }

    /// 指定文章的表现；不指定时返回全部，按得分降序
    pub async fn get_content_performance(&self, article_id: Option<i64>) -> PerformanceReport {
        match article_id {
            Some(id) => PerformanceReport::Article(self.tracker.content_performance(id).await),
            None => PerformanceReport::All(self.tracker.all_content_performance().await),
        }
    }

    /// 当前热门文章，`limit` 缺省为 [`DEFAULT_TRENDING_LIMIT`]
    pub async fn get_trending_content(&self, limit: Option<usize>) -> Vec<ContentPerformance> {
        self.tracker
            .trending_content(limit.unwrap_or(DEFAULT_TRENDING_LIMIT))
            .await
    }
}
