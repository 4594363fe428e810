use chrono::{DateTime, Utc};

use crate::content::{Article, Category, Localized};

/// `categories` 表的一行
#[derive(Debug, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub slug: String,
    pub name_en: String,
    pub name_ar: Option<String>,
    pub description_en: String,
    pub description_ar: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: Localized::new(row.name_en, row.name_ar),
            description: Localized::new(row.description_en, row.description_ar),
            icon: row.icon,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `articles` 表的一行
///
/// 列表查询以 `NULL` 代替正文列，此时 `content_en` 为 `None`。
#[derive(Debug, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub slug: String,
    pub title_en: String,
    pub title_ar: Option<String>,
    pub excerpt_en: String,
    pub excerpt_ar: Option<String>,
    pub content_en: Option<String>,
    pub content_ar: Option<String>,
    pub meta_description_en: String,
    pub meta_description_ar: Option<String>,
    pub category_id: Option<i64>,
    pub author: String,
    pub published: bool,
    pub featured: bool,
    pub reading_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        let content_ar = row.content_ar;
        Self {
            id: row.id,
            slug: row.slug,
            title: Localized::new(row.title_en, row.title_ar),
            excerpt: Localized::new(row.excerpt_en, row.excerpt_ar),
            content: row.content_en.map(|en| Localized::new(en, content_ar)),
            meta_description: Localized::new(row.meta_description_en, row.meta_description_ar),
            category_id: row.category_id,
            author: row.author,
            published: row.published,
            featured: row.featured,
            reading_time: row.reading_time,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
