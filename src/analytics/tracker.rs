use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{
    BehaviorAction, BehaviorEvent, ContentPerformance, TrackEvent, performance::Tally,
};
use crate::clock::Clock;

/// 默认事件保留期：30 天
pub fn default_retention() -> Duration {
    Duration::days(30)
}

#[derive(Default)]
struct TrackerState {
    events: Vec<BehaviorEvent>,
    tallies: HashMap<i64, Tally>,
}

impl TrackerState {
    fn record(&mut self, event: BehaviorEvent, now: DateTime<Utc>) {
        self.tallies
            .entry(event.article_id)
            .or_insert_with(|| Tally::new(event.article_id, now))
            .apply(&event, now);
        self.events.push(event);
    }
}

/// 一次保留期清理的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub removed_events: usize,
    pub remaining_events: usize,
    pub aggregates: usize,
}

/// 行为记录器
///
/// 事件日志与文章表现聚合放在同一把锁下，记录事件时同步更新聚合，
/// 读取“热门”状态总能看到最新写入。
pub struct BehaviorTracker {
    state: RwLock<TrackerState>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl BehaviorTracker {
    pub fn new(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            clock,
            retention,
        }
    }

    /// 记录一条行为
    ///
    /// 不做去重，不会失败：不合法的事件只记录警告后丢弃。
    pub async fn track_behavior(&self, event: TrackEvent) {
        if event.session_id.trim().is_empty() {
            tracing::warn!(
                article_id = event.article_id,
                "dropping behavior event without session id"
            );
            return;
        }
        if event.article_id <= 0 {
            tracing::warn!(
                article_id = event.article_id,
                "dropping behavior event with invalid article id"
            );
            return;
        }

        let now = self.clock.now();
        let timestamp = match event.timestamp {
            Some(t) if t > now => {
                tracing::warn!(
                    article_id = event.article_id,
                    timestamp = %t,
                    "behavior event dated in the future, clamped to now"
                );
                now
            }
            Some(t) => t,
            None => now,
        };
        let event = BehaviorEvent {
            session_id: event.session_id,
            article_id: event.article_id,
            action: event.action,
            timestamp,
            metadata: event.metadata,
        };

        if event.action == BehaviorAction::Scroll && event.time_spent().is_none() {
            tracing::warn!(
                article_id = event.article_id,
                "scroll event without numeric timeSpent, average time spent unchanged"
            );
        }

        self.state.write().await.record(event, now);
    }

    /// 单篇文章的表现，从未被记录过时为 `None`
    pub async fn content_performance(&self, article_id: i64) -> Option<ContentPerformance> {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .tallies
            .get(&article_id)
            .map(|t| t.snapshot(now))
    }

    /// 全部文章表现，按得分降序
    pub async fn all_content_performance(&self) -> Vec<ContentPerformance> {
        let now = self.clock.now();
        let mut all: Vec<ContentPerformance> = self
            .state
            .read()
            .await
            .tallies
            .values()
            .map(|t| t.snapshot(now))
            .collect();
        sort_by_score(&mut all);
        all
    }

    /// 当前热门的文章，按得分降序取前 `limit` 个
    pub async fn trending_content(&self, limit: usize) -> Vec<ContentPerformance> {
        let mut trending: Vec<ContentPerformance> = self
            .all_content_performance()
            .await
            .into_iter()
            .filter(|p| p.trending)
            .collect();
        trending.truncate(limit);
        trending
    }

    /// 指定文章集合的表现
    pub async fn performance_of(&self, article_ids: &[i64]) -> HashMap<i64, ContentPerformance> {
        let now = self.clock.now();
        let state = self.state.read().await;
        article_ids
            .iter()
            .filter_map(|id| state.tallies.get(id).map(|t| (*id, t.snapshot(now))))
            .collect()
    }

    /// 某个 session 的全部事件，按记录顺序
    pub async fn session_events(&self, session_id: &str) -> Vec<BehaviorEvent> {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// 清理保留期外的事件，并用剩余事件重建所有聚合
    ///
    /// 全部事件都过期的文章，其聚合随之删除。
    pub async fn prune_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let cutoff = now - self.retention;

        let mut state = self.state.write().await;
        let before = state.events.len();

        let kept: Vec<BehaviorEvent> = std::mem::take(&mut state.events)
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect();

        state.tallies.clear();
        for event in kept {
            state.record(event, now);
        }

        SweepReport {
            removed_events: before - state.events.len(),
            remaining_events: state.events.len(),
            aggregates: state.tallies.len(),
        }
    }

    /// 周期性执行保留期清理
    #[instrument(name = "retention sweep", skip_all)]
    pub async fn run_retention_sweep(self: Arc<Self>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        // 第一次 tick 立即返回
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = self.prune_expired().await;
            tracing::info!(
                removed = report.removed_events,
                remaining = report.remaining_events,
                aggregates = report.aggregates,
                "behavior retention sweep completed"
            );
        }
    }
}

fn sort_by_score(all: &mut [ContentPerformance]) {
    all.sort_by(|a, b| {
        b.engagement_score
            .total_cmp(&a.engagement_score)
            .then(a.article_id.cmp(&b.article_id))
    });
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::clock::ManualClock;

    fn tracker(start: DateTime<Utc>) -> (Arc<ManualClock>, BehaviorTracker) {
        let clock = Arc::new(ManualClock::new(start));
        let tracker = BehaviorTracker::new(clock.clone(), default_retention());
        (clock, tracker)
    }

    fn track(session: &str, article_id: i64, action: BehaviorAction) -> TrackEvent {
        TrackEvent {
            session_id: session.to_string(),
            article_id,
            action,
            timestamp: None,
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_tracking_updates_aggregate_immediately() {
        let (_, tracker) = tracker(Utc::now());
        assert!(tracker.content_performance(1).await.is_none());

        tracker.track_behavior(track("s1", 1, BehaviorAction::View)).await;
        tracker.track_behavior(track("s1", 1, BehaviorAction::View)).await;

        let perf = tracker.content_performance(1).await.expect("aggregate created lazily");
        assert_eq!(perf.views, 2);
        assert_eq!(perf.unique_views, 1);
    }

    #[tokio::test]
    async fn test_invalid_events_are_dropped() {
        let (_, tracker) = tracker(Utc::now());
        tracker.track_behavior(track(" ", 1, BehaviorAction::View)).await;
        tracker.track_behavior(track("s1", 0, BehaviorAction::View)).await;

        assert!(tracker.all_content_performance().await.is_empty());
    }

    #[tokio::test]
    async fn test_future_timestamp_is_clamped_to_now() {
        let start = Utc::now();
        let (clock, tracker) = tracker(start);

        let mut view = track("s1", 1, BehaviorAction::View);
        view.timestamp = Some(start + Duration::days(365));
        tracker.track_behavior(view).await;

        let events = tracker.session_events("s1").await;
        assert_eq!(events[0].timestamp, start);

        clock.advance(default_retention() + Duration::days(1));
        let report = tracker.prune_expired().await;
        assert_eq!(report.removed_events, 1);
        assert!(tracker.content_performance(1).await.is_none());
    }

    #[tokio::test]
    async fn test_prune_rebuilds_aggregates_from_surviving_events() {
        let start = Utc::now();
        let (clock, tracker) = tracker(start);

        tracker.track_behavior(track("old", 1, BehaviorAction::View)).await;
        tracker.track_behavior(track("old", 2, BehaviorAction::Share)).await;

        clock.advance(Duration::days(20));
        let mut scroll = track("new", 1, BehaviorAction::Scroll);
        scroll.metadata.insert("timeSpent".into(), json!(90));
        tracker.track_behavior(scroll).await;
        tracker.track_behavior(track("new", 1, BehaviorAction::View)).await;

        clock.advance(Duration::days(15));
        let report = tracker.prune_expired().await;
        assert_eq!(report.removed_events, 2);
        assert_eq!(report.remaining_events, 2);
        assert_eq!(report.aggregates, 1);

        let perf = tracker.content_performance(1).await.unwrap();
        assert_eq!(perf.views, 1);
        assert_eq!(perf.unique_views, 1);
        assert_eq!(perf.avg_time_spent, 90.0);
        assert!(tracker.content_performance(2).await.is_none());
    }

    #[tokio::test]
    async fn test_session_events() {
        let (_, tracker) = tracker(Utc::now());
        tracker.track_behavior(track("a", 1, BehaviorAction::View)).await;
        tracker.track_behavior(track("b", 1, BehaviorAction::View)).await;
        tracker.track_behavior(track("a", 2, BehaviorAction::Like)).await;

        let events = tracker.session_events("a").await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, BehaviorAction::Like);
    }
}
