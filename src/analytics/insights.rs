use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Analytics, BehaviorAction, BehaviorEvent};
use crate::{content::Article, error::Result, storage::ContentStore};

/// 单个 session 的行为概览
///
/// 没有任何事件的 session 返回空概览，而不是 [`crate::error::Error::NotFound`]。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInsights {
    pub session_id: String,
    pub total_events: usize,
    pub action_counts: BTreeMap<BehaviorAction, usize>,
    /// 浏览过的不同文章数
    pub articles_viewed: usize,
    /// scroll 事件 `timeSpent` 的均值（秒）
    pub avg_time_spent: f64,
    /// 浏览过的文章的平均阅读时长（分钟）
    pub avg_reading_time: Option<f64>,
    /// 按浏览文章数降序的分类 id
    pub preferred_categories: Vec<i64>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserInsights {
    fn summarize(session_id: &str, events: &[BehaviorEvent], viewed: &[Article]) -> Self {
        let mut action_counts = BTreeMap::new();
        for event in events {
            *action_counts.entry(event.action).or_insert(0) += 1;
        }

        let spent: Vec<f64> = events
            .iter()
            .filter(|e| e.action == BehaviorAction::Scroll)
            .filter_map(BehaviorEvent::time_spent)
            .collect();
        let avg_time_spent = if spent.is_empty() {
            0.0
        } else {
            spent.iter().sum::<f64>() / spent.len() as f64
        };

        let articles_viewed = events
            .iter()
            .filter(|e| e.action == BehaviorAction::View)
            .map(|e| e.article_id)
            .collect::<HashSet<_>>()
            .len();

        let avg_reading_time = (!viewed.is_empty()).then(|| {
            viewed.iter().map(|a| f64::from(a.reading_time)).sum::<f64>() / viewed.len() as f64
        });

        let mut per_category: HashMap<i64, usize> = HashMap::new();
        for id in viewed.iter().filter_map(|a| a.category_id) {
            *per_category.entry(id).or_insert(0) += 1;
        }
        let mut preferred: Vec<(i64, usize)> = per_category.into_iter().collect();
        preferred.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Self {
            session_id: session_id.to_string(),
            total_events: events.len(),
            action_counts,
            articles_viewed,
            avg_time_spent,
            avg_reading_time,
            preferred_categories: preferred.into_iter().map(|(id, _)| id).collect(),
            first_seen: events.iter().map(|e| e.timestamp).min(),
            last_seen: events.iter().map(|e| e.timestamp).max(),
        }
    }
}

impl<S: ContentStore> Analytics<S> {
    /// 汇总某个 session 的行为
    pub async fn get_user_insights(&self, session_id: &str) -> Result<UserInsights> {
        let events = self.tracker.session_events(session_id).await;
        let viewed = self.viewed_articles(session_id).await?;
        Ok(UserInsights::summarize(session_id, &events, &viewed))
    }
}
