use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{BehaviorAction, BehaviorEvent};

/// 浏览量饱和点
const VIEWS_SATURATION: f64 = 100.0;
/// 平均停留时长饱和点（秒）
const TIME_SPENT_SATURATION: f64 = 300.0;
/// 分享数饱和点
const SHARES_SATURATION: f64 = 10.0;

/// 热门判定：窗口内浏览次数需大于该值
const TRENDING_MIN_RECENT_VIEWS: usize = 10;
/// 热门判定：互动得分需大于该值
const TRENDING_MIN_SCORE: f64 = 70.0;

/// 热门判定的时间窗口
pub fn trending_window() -> Duration {
    Duration::hours(24)
}

/// 互动得分（0–100）
///
/// `(min(views/100,1)*0.3 + min(avgTimeSpent/300,1)*0.4 + min(shareCount/10,1)*0.3) * 100`
pub fn engagement_score(views: u64, avg_time_spent: f64, share_count: u64) -> f64 {
    let views = (views as f64 / VIEWS_SATURATION).min(1.0);
    let time = (avg_time_spent / TIME_SPENT_SATURATION).clamp(0.0, 1.0);
    let shares = (share_count as f64 / SHARES_SATURATION).min(1.0);

    ((views * 0.3 + time * 0.4 + shares * 0.3) * 100.0).min(100.0)
}

/// 热门：最近 24 小时浏览超过 10 次，且得分超过 70，两者缺一不可
pub fn is_trending(recent_views: usize, score: f64) -> bool {
    recent_views > TRENDING_MIN_RECENT_VIEWS && score > TRENDING_MIN_SCORE
}

/// 文章表现聚合
///
/// 由行为事件派生，可以随时从事件日志重建。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPerformance {
    pub article_id: i64,
    pub views: u64,
    /// 有过 view 事件的不同 session 数
    pub unique_views: u64,
    /// 所有 scroll 事件 `timeSpent` 的均值（秒）
    pub avg_time_spent: f64,
    pub share_count: u64,
    pub engagement_score: f64,
    pub trending: bool,
    pub last_updated: DateTime<Utc>,
}

/// 单篇文章的增量统计
///
/// 除对外的 [`ContentPerformance`] 外，还保留计算均值、去重和热门窗口所需的中间量。
#[derive(Debug, Clone)]
pub(crate) struct Tally {
    performance: ContentPerformance,
    viewers: HashSet<String>,
    time_spent_total: f64,
    time_spent_samples: u64,
    view_times: Vec<DateTime<Utc>>,
}

impl Tally {
    pub(crate) fn new(article_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            performance: ContentPerformance {
                article_id,
                views: 0,
                unique_views: 0,
                avg_time_spent: 0.0,
                share_count: 0,
                engagement_score: 0.0,
                trending: false,
                last_updated: now,
            },
            viewers: HashSet::new(),
            time_spent_total: 0.0,
            time_spent_samples: 0,
            view_times: Vec::new(),
        }
    }

    /// 应用一条事件并重新计算得分与热门状态
    pub(crate) fn apply(&mut self, event: &BehaviorEvent, now: DateTime<Utc>) {
        let perf = &mut self.performance;

        match event.action {
            BehaviorAction::View => {
                perf.views += 1;
                self.viewers.insert(event.session_id.clone());
                perf.unique_views = self.viewers.len() as u64;
                self.view_times.push(event.timestamp);
            }
            BehaviorAction::Scroll => {
                if let Some(seconds) = event.time_spent() {
                    self.time_spent_total += seconds;
                    self.time_spent_samples += 1;
                    perf.avg_time_spent = self.time_spent_total / self.time_spent_samples as f64;
                }
            }
            BehaviorAction::Share => perf.share_count += 1,
            BehaviorAction::Like | BehaviorAction::Comment => {}
        }

        perf.engagement_score =
            engagement_score(perf.views, perf.avg_time_spent, perf.share_count);
        perf.last_updated = now;
        self.refresh_trending(now);
    }

    /// 丢弃窗口外的浏览时间并重新判定热门
    pub(crate) fn refresh_trending(&mut self, now: DateTime<Utc>) {
        let cutoff = now - trending_window();
        self.view_times.retain(|t| *t > cutoff);
        self.performance.trending =
            is_trending(self.view_times.len(), self.performance.engagement_score);
    }

    /// 以 `now` 重新判定热门后的快照，不修改自身
    pub(crate) fn snapshot(&self, now: DateTime<Utc>) -> ContentPerformance {
        let cutoff = now - trending_window();
        let recent = self.view_times.iter().filter(|t| **t > cutoff).count();

        ContentPerformance {
            trending: is_trending(recent, self.performance.engagement_score),
            ..self.performance.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    fn event(session: &str, action: BehaviorAction, at: DateTime<Utc>) -> BehaviorEvent {
        BehaviorEvent {
            session_id: session.to_string(),
            article_id: 1,
            action,
            timestamp: at,
            metadata: Map::new(),
        }
    }

    fn scroll(seconds: f64, at: DateTime<Utc>) -> BehaviorEvent {
        let mut e = event("s", BehaviorAction::Scroll, at);
        e.metadata.insert("timeSpent".into(), json!(seconds));
        e
    }

    #[test]
    fn test_engagement_score_formula() {
        assert_eq!(engagement_score(0, 0.0, 0), 0.0);
        assert!((engagement_score(50, 150.0, 5) - 50.0).abs() < 1e-9);
        assert!((engagement_score(100, 0.0, 0) - 30.0).abs() < 1e-9);
        assert!((engagement_score(0, 300.0, 0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_engagement_score_caps_each_dimension() {
        let saturated = engagement_score(100, 300.0, 10);
        assert!(saturated <= 100.0);
        assert_eq!(engagement_score(100_000, 300.0, 10), saturated);
        assert_eq!(engagement_score(100, 9_999.0, 10), saturated);
        assert_eq!(engagement_score(100, 300.0, 9_999), saturated);
    }

    #[test]
    fn test_engagement_monotonic_in_views_and_shares() {
        let mut last = 0.0;
        for n in 0..200 {
            let score = engagement_score(n, 120.0, n / 3);
            assert!(score >= last, "score decreased at n={n}");
            assert!(score <= 100.0);
            last = score;
        }
    }

    #[test]
    fn test_tally_unique_views_and_avg_time() {
        let now = Utc::now();
        let mut tally = Tally::new(1, now);

        tally.apply(&event("a", BehaviorAction::View, now), now);
        tally.apply(&event("a", BehaviorAction::View, now), now);
        tally.apply(&event("b", BehaviorAction::View, now), now);
        tally.apply(&scroll(100.0, now), now);
        tally.apply(&scroll(200.0, now), now);
        tally.apply(&event("a", BehaviorAction::Scroll, now), now);
        tally.apply(&event("a", BehaviorAction::Share, now), now);

        let perf = tally.snapshot(now);
        assert_eq!(perf.views, 3);
        assert_eq!(perf.unique_views, 2);
        assert_eq!(perf.avg_time_spent, 150.0);
        assert_eq!(perf.share_count, 1);
    }

    #[test]
    fn test_trending_requires_recent_views() {
        let now = Utc::now();
        let long_ago = now - Duration::days(3);
        let mut tally = Tally::new(1, long_ago);

        for i in 0..100 {
            tally.apply(&event(&format!("s{i}"), BehaviorAction::View, long_ago), long_ago);
        }
        for _ in 0..10 {
            tally.apply(&event("s", BehaviorAction::Share, long_ago), long_ago);
        }
        tally.apply(&scroll(250.0, long_ago), long_ago);

        let then = tally.snapshot(long_ago);
        assert!(then.engagement_score > 90.0);
        assert!(then.trending);

        let perf = tally.snapshot(now);
        assert!(perf.engagement_score > 90.0);
        assert!(!perf.trending, "no views in the trailing 24h");
    }

    #[test]
    fn test_trending_requires_high_score() {
        let now = Utc::now();
        let mut tally = Tally::new(1, now);
        for i in 0..20 {
            tally.apply(&event(&format!("s{i}"), BehaviorAction::View, now), now);
        }
        let perf = tally.snapshot(now);
        assert!(perf.engagement_score < 70.0);
        assert!(!perf.trending);
    }
}
