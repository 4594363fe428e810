use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryRef, Lang, Localized, category::validate_slug};
use crate::error::{Error, Result};

/// 阅读速度，单位：词/分钟
const WORDS_PER_MINUTE: usize = 200;

/// 文章
///
/// 列表查询不加载正文，此时 [`Article::content`] 为 `None`；
/// 详情查询才会带上双语正文。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub title: Localized,
    pub excerpt: Localized,
    pub content: Option<Localized>,
    pub meta_description: Localized,
    pub category_id: Option<i64>,
    pub author: String,
    pub published: bool,
    pub featured: bool,
    /// 阅读时长（分钟）
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// `publishedAt` 排序键
    ///
    /// 未发布的文章没有 `published_at`，以 `created_at` 代替，保证排序键非空。
    pub fn published_sort_key(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

/// 按语言投影后的文章
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub meta_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub category: Option<CategoryRef>,
    pub author: String,
    pub published: bool,
    pub featured: bool,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleView {
    /// 把 [`Article`] 投影为指定语言的输出
    pub fn project(article: Article, lang: Lang, category: Option<CategoryRef>) -> Self {
        Self {
            id: article.id,
            title: article.title.resolve(lang).to_string(),
            excerpt: article.excerpt.resolve(lang).to_string(),
            meta_description: article.meta_description.resolve(lang).to_string(),
            content: article.content.as_ref().map(|c| c.resolve(lang).to_string()),
            category,
            slug: article.slug,
            author: article.author,
            published: article.published,
            featured: article.featured,
            reading_time: article.reading_time,
            published_at: article.published_at,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// 创建或整体更新文章时的输入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub slug: String,
    pub title_en: String,
    pub title_ar: Option<String>,
    #[serde(default)]
    pub excerpt_en: String,
    pub excerpt_ar: Option<String>,
    #[serde(default)]
    pub content_en: String,
    pub content_ar: Option<String>,
    #[serde(default)]
    pub meta_description_en: String,
    pub meta_description_ar: Option<String>,
    pub category_id: Option<i64>,
    pub author: String,
    #[serde(default)]
    pub featured: bool,
    /// 缺省时按英文正文估算
    pub reading_time: Option<i32>,
    /// 仅在创建时生效：立即发布
    #[serde(default)]
    pub publish_now: bool,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;

        if self.title_en.trim().is_empty() {
            return Err(Error::Validation("article title_en must not be empty".into()));
        }
        if self.author.trim().is_empty() {
            return Err(Error::Validation("article author must not be empty".into()));
        }
        if let Some(minutes) = self.reading_time {
            if minutes < 1 {
                return Err(Error::Validation(format!(
                    "reading_time must be at least 1 minute, got {minutes}"
                )));
            }
        }
        Ok(())
    }

    /// 最终写入的阅读时长
    pub fn resolved_reading_time(&self) -> i32 {
        self.reading_time
            .unwrap_or_else(|| estimate_reading_time(&self.content_en))
    }
}

/// 按 200 词/分钟估算阅读时长，至少 1 分钟
pub fn estimate_reading_time(body: &str) -> i32 {
    let words = body.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> Article {
        let now = Utc::now();
        Article {
            id: 1,
            slug: "media-report".into(),
            title: Localized::new("Media Report", None),
            excerpt: Localized::new("Summary", Some("ملخص".into())),
            content: Some(Localized::new("Body", Some("نص".into()))),
            meta_description: Localized::new("Meta", None),
            category_id: None,
            author: "Sara".into(),
            published: true,
            featured: false,
            reading_time: 3,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_project_arabic_with_fallback() {
        let view = ArticleView::project(sample_article(), Lang::Ar, None);

        // 标题没有阿拉伯文，回退到英文
        assert_eq!(view.title, "Media Report");
        assert_eq!(view.excerpt, "ملخص");
        assert_eq!(view.meta_description, "Meta");
        assert_eq!(view.content.as_deref(), Some("نص"));
    }

    #[test]
    fn test_published_sort_key_uses_created_at_when_unpublished() {
        let mut article = sample_article();
        article.published_at = None;
        assert_eq!(article.published_sort_key(), article.created_at);
    }

    #[test]
    fn test_estimate_reading_time() {
        assert_eq!(estimate_reading_time(""), 1);
        assert_eq!(estimate_reading_time(&"word ".repeat(200)), 1);
        assert_eq!(estimate_reading_time(&"word ".repeat(201)), 2);
    }

    #[test]
    fn test_validate_reading_time() {
        let mut input = ArticleInput {
            slug: "a".into(),
            title_en: "A".into(),
            author: "Sara".into(),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.reading_time = Some(0);
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }
}
