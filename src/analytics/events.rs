use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 用户行为类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorAction {
    View,
    Scroll,
    Share,
    Like,
    Comment,
}

/// 客户端上报的行为
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub session_id: String,
    pub article_id: i64,
    pub action: BehaviorAction,
    /// 缺省时使用服务端当前时间
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// 已记录的行为事件，只追加
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEvent {
    pub session_id: String,
    pub article_id: i64,
    pub action: BehaviorAction,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl BehaviorEvent {
    /// `metadata.timeSpent`（秒），非数字或负数视为缺失
    pub fn time_spent(&self) -> Option<f64> {
        self.metadata
            .get("timeSpent")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_track_event_deserialize() {
        let event: TrackEvent = serde_json::from_value(json!({
            "sessionId": "s-1",
            "articleId": 4,
            "action": "scroll",
            "metadata": { "timeSpent": 120, "depth": 0.8 }
        }))
        .expect("Failed to deserialize event");

        assert_eq!(event.action, BehaviorAction::Scroll);
        assert!(event.timestamp.is_none());
        assert_eq!(event.metadata.get("depth"), Some(&json!(0.8)));
    }

    #[test]
    fn test_time_spent() {
        let mut event = BehaviorEvent {
            session_id: "s".into(),
            article_id: 1,
            action: BehaviorAction::Scroll,
            timestamp: Utc::now(),
            metadata: Map::new(),
        };
        assert_eq!(event.time_spent(), None);

        event.metadata.insert("timeSpent".into(), json!(42));
        assert_eq!(event.time_spent(), Some(42.0));

        event.metadata.insert("timeSpent".into(), json!("42"));
        assert_eq!(event.time_spent(), None);

        event.metadata.insert("timeSpent".into(), json!(-1));
        assert_eq!(event.time_spent(), None);
    }
}
