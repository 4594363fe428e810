use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    content::Article,
    storage::{Seek, SortKey, SortValue},
};

/// 游标的 JSON 结构：`{"id": <integer>, "value": <ISO-8601 | 整数字符串>}`
#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    id: i64,
    value: Value,
}

/// 分页游标
///
/// 编码为 base64(UTF-8 JSON)。游标只对生成它的排序字段有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub id: i64,
    pub value: SortValue,
}

/// 游标被忽略的原因
///
/// 损坏的游标不是错误：调用方记录警告后按“没有游标”处理，从第一页开始。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    /// 不是合法的 base64
    Encoding,
    /// 不是合法的 `{id, value}` JSON
    Payload(String),
    /// `value` 与当前排序字段的类型不匹配
    Mismatch(SortKey),
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignored::Encoding => write!(f, "cursor is not valid base64"),
            Ignored::Payload(e) => write!(f, "cursor payload is malformed: {e}"),
            Ignored::Mismatch(key) => write!(f, "cursor value does not match sort key {key:?}"),
        }
    }
}

impl Cursor {
    /// 以页面最后一行生成游标，使用与排序相同的字段
    pub fn from_article(article: &Article, key: SortKey) -> Self {
        Self {
            id: article.id,
            value: key.value_of(article),
        }
    }

    pub fn encode(&self) -> String {
        let value = match self.value {
            SortValue::Time(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            SortValue::Id(id) => Value::String(id.to_string()),
        };
        let payload = CursorPayload { id: self.id, value };

        // 只含整数和字符串，序列化不会失败
        let json = serde_json::to_string(&payload).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// 按排序字段解码游标
    ///
    /// 时间字段要求 `value` 为 ISO-8601 字符串；`id` 字段要求为整数（字符串或数字）
    /// 且与 `id` 一致。任何不符合都返回 [`Ignored`]。
    pub fn decode(token: &str, key: SortKey) -> Result<Cursor, Ignored> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|_| Ignored::Encoding)?;
        let payload: CursorPayload =
            serde_json::from_slice(&bytes).map_err(|e| Ignored::Payload(e.to_string()))?;

        let value = match key {
            SortKey::PublishedAt | SortKey::CreatedAt => payload
                .value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| SortValue::Time(t.with_timezone(&Utc)))
                .ok_or(Ignored::Mismatch(key))?,
            SortKey::Id => {
                let id = match &payload.value {
                    Value::String(s) => s.parse::<i64>().ok(),
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                };
                match id {
                    Some(id) if id == payload.id => SortValue::Id(id),
                    _ => return Err(Ignored::Mismatch(key)),
                }
            }
        };

        Ok(Cursor {
            id: payload.id,
            value,
        })
    }

    pub fn seek(&self) -> Seek {
        Seek {
            id: self.id,
            value: self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_encode_wire_format() {
        let cursor = Cursor {
            id: 2,
            value: SortValue::Time(t0()),
        };
        let json = String::from_utf8(STANDARD.decode(cursor.encode()).unwrap()).unwrap();
        assert_eq!(json, r#"{"id":2,"value":"2024-03-01T10:00:00Z"}"#);

        let by_id = Cursor {
            id: 15,
            value: SortValue::Id(15),
        };
        let json = String::from_utf8(STANDARD.decode(by_id.encode()).unwrap()).unwrap();
        assert_eq!(json, r#"{"id":15,"value":"15"}"#);
    }

    #[test]
    fn test_decode_keeps_sub_second_precision() {
        let at = t0() + chrono::Duration::microseconds(123_456);
        let cursor = Cursor {
            id: 9,
            value: SortValue::Time(at),
        };
        let decoded = Cursor::decode(&cursor.encode(), SortKey::CreatedAt).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_decode_accepts_foreign_millisecond_cursor() {
        let token = STANDARD.encode(r#"{"id": 2, "value": "2024-03-01T10:00:00.000Z"}"#);
        let cursor = Cursor::decode(&token, SortKey::PublishedAt).unwrap();
        assert_eq!(cursor.id, 2);
        assert_eq!(cursor.value, SortValue::Time(t0()));
    }

    #[test]
    fn test_decode_garbage_is_ignored() {
        assert_eq!(
            Cursor::decode("%%%not-base64", SortKey::PublishedAt),
            Err(Ignored::Encoding)
        );

        let not_json = STANDARD.encode("hello");
        assert!(matches!(
            Cursor::decode(&not_json, SortKey::PublishedAt),
            Err(Ignored::Payload(_))
        ));
    }

    #[test]
    fn test_decode_rejects_cursor_from_other_sort_key() {
        let time_cursor = Cursor {
            id: 3,
            value: SortValue::Time(t0()),
        }
        .encode();
        assert_eq!(
            Cursor::decode(&time_cursor, SortKey::Id),
            Err(Ignored::Mismatch(SortKey::Id))
        );

        let id_cursor = Cursor {
            id: 3,
            value: SortValue::Id(3),
        }
        .encode();
        assert_eq!(
            Cursor::decode(&id_cursor, SortKey::PublishedAt),
            Err(Ignored::Mismatch(SortKey::PublishedAt))
        );
    }

    #[test]
    fn test_decode_id_value_must_match_id() {
        let token = STANDARD.encode(r#"{"id":3,"value":"4"}"#);
        assert!(Cursor::decode(&token, SortKey::Id).is_err());

        let numeric = STANDARD.encode(r#"{"id":3,"value":3}"#);
        assert_eq!(
            Cursor::decode(&numeric, SortKey::Id).unwrap().value,
            SortValue::Id(3)
        );
    }
}
