use std::{cmp::Ordering, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{content::Article, error::Error};

/// 文章过滤条件
///
/// 计数查询只使用过滤条件，不带游标的 seek 条件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category_id: Option<i64>,
    pub featured: Option<bool>,
    /// `None` 表示不限制发布状态
    pub published: Option<bool>,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            featured: None,
            published: Some(true),
        }
    }
}

impl ArticleFilter {
    pub fn matches(&self, article: &Article) -> bool {
        self.category_id
            .is_none_or(|id| article.category_id == Some(id))
            && self.featured.is_none_or(|f| article.featured == f)
            && self.published.is_none_or(|p| article.published == p)
    }
}

/// 排序字段
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "publishedAt")]
    PublishedAt,
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "id")]
    Id,
}

impl SortKey {
    /// 取文章在该字段上的排序值
    pub fn value_of(&self, article: &Article) -> SortValue {
        match self {
            SortKey::PublishedAt => SortValue::Time(article.published_sort_key()),
            SortKey::CreatedAt => SortValue::Time(article.created_at),
            SortKey::Id => SortValue::Id(article.id),
        }
    }

    /// PostgreSQL 中对应的排序表达式
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortKey::PublishedAt => "COALESCE(a.published_at, a.created_at)",
            SortKey::CreatedAt => "a.created_at",
            SortKey::Id => "a.id",
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publishedAt" | "published_at" => Ok(SortKey::PublishedAt),
            "createdAt" | "created_at" => Ok(SortKey::CreatedAt),
            "id" => Ok(SortKey::Id),
            other => Err(Error::Validation(format!("unsupported sortBy: {other}"))),
        }
    }
}

/// 排序方向
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// seek 条件使用的比较符
    pub(crate) fn seek_operator(&self) -> &'static str {
        match self {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::Validation(format!("unsupported sortOrder: {other}"))),
        }
    }
}

/// 排序值：时间戳或 id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortValue {
    Time(DateTime<Utc>),
    Id(i64),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Id(a), SortValue::Id(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// 游标定位点：上一页最后一行的排序值与 id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek {
    pub id: i64,
    pub value: SortValue,
}

/// 一次文章列表查询
///
/// 排序总是 `(sort_key, id)` 复合排序，`id` 作为并列时的决胜字段，
/// 保证排序是全序的。
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuery {
    pub filter: ArticleFilter,
    pub sort_key: SortKey,
    pub order: SortOrder,
    pub seek: Option<Seek>,
    pub limit: i64,
    pub offset: i64,
}

impl ArticleQuery {
    /// 行是否满足过滤条件和 seek 条件
    ///
    /// 降序时：`value < seek.value OR (value = seek.value AND id < seek.id)`，升序对称。
    pub fn admits(&self, article: &Article) -> bool {
        if !self.filter.matches(article) {
            return false;
        }

        let Some(seek) = &self.seek else {
            return true;
        };

        let by_value = self.sort_key.value_of(article).compare(&seek.value);
        let by_id = article.id.cmp(&seek.id);
        let position = by_value.then(by_id);

        match self.order {
            SortOrder::Desc => position == Ordering::Less,
            SortOrder::Asc => position == Ordering::Greater,
        }
    }

    /// 按 `(sort_key, id)` 比较两行，方向由 [`SortOrder`] 决定
    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let ordering = self
            .sort_key
            .value_of(a)
            .compare(&self.sort_key.value_of(b))
            .then(a.id.cmp(&b.id));

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::content::Localized;

    fn article(id: i64, published_at: DateTime<Utc>) -> Article {
        Article {
            id,
            slug: format!("a-{id}"),
            title: Localized::new(format!("A{id}"), None),
            excerpt: Localized::default(),
            content: None,
            meta_description: Localized::default(),
            category_id: None,
            author: "Sara".into(),
            published: true,
            featured: false,
            reading_time: 1,
            published_at: Some(published_at),
            created_at: published_at,
            updated_at: published_at,
        }
    }

    fn query(order: SortOrder, seek: Option<Seek>) -> ArticleQuery {
        ArticleQuery {
            filter: ArticleFilter::default(),
            sort_key: SortKey::PublishedAt,
            order,
            seek,
            limit: 10,
            offset: 0,
        }
    }

    #[test]
    fn test_seek_desc_uses_id_tiebreak() {
        let t0 = Utc::now();
        let seek = Seek {
            id: 2,
            value: SortValue::Time(t0),
        };
        let q = query(SortOrder::Desc, Some(seek));

        assert!(q.admits(&article(1, t0)), "same time, lower id");
        assert!(!q.admits(&article(2, t0)), "the seek row itself");
        assert!(!q.admits(&article(3, t0)), "same time, higher id");
        assert!(q.admits(&article(9, t0 - Duration::seconds(1))));
        assert!(!q.admits(&article(0, t0 + Duration::seconds(1))));
    }

    #[test]
    fn test_seek_asc_mirrors_desc() {
        let t0 = Utc::now();
        let seek = Seek {
            id: 2,
            value: SortValue::Time(t0),
        };
        let q = query(SortOrder::Asc, Some(seek));

        assert!(q.admits(&article(3, t0)));
        assert!(!q.admits(&article(1, t0)));
        assert!(q.admits(&article(1, t0 + Duration::seconds(1))));
    }

    #[test]
    fn test_compare_orders_by_value_then_id() {
        let t0 = Utc::now();
        let q = query(SortOrder::Desc, None);
        let mut rows = vec![article(1, t0), article(3, t0 + Duration::hours(1)), article(2, t0)];
        rows.sort_by(|a, b| q.compare(a, b));

        let ids: Vec<i64> = rows.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_filter_defaults_to_published_only() {
        let mut draft = article(1, Utc::now());
        draft.published = false;
        assert!(!ArticleFilter::default().matches(&draft));

        let any = ArticleFilter {
            published: None,
            ..Default::default()
        };
        assert!(any.matches(&draft));
    }

    #[test]
    fn test_sort_key_and_order_from_str() {
        assert_eq!("createdAt".parse::<SortKey>().unwrap(), SortKey::CreatedAt);
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("title".parse::<SortKey>().is_err());
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
