use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ArticleFilter, ArticleQuery, ContentStore, StoreError, StoreResult};
use crate::content::{Article, ArticleInput, Category, CategoryInput, Localized};

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    articles: Vec<Article>,
    next_category_id: i64,
    next_article_id: i64,
}

impl Tables {
    fn slug_taken<'a>(
        mut slugs: impl Iterator<Item = (i64, &'a str)>,
        slug: &str,
        except: Option<i64>,
    ) -> bool {
        slugs.any(|(id, s)| s == slug && Some(id) != except)
    }

    fn check_category_slug(&self, slug: &str, except: Option<i64>) -> StoreResult<()> {
        let slugs = self.categories.iter().map(|c| (c.id, c.slug.as_str()));
        if Self::slug_taken(slugs, slug, except) {
            return Err(StoreError::Conflict(format!(
                "category slug already exists: {slug}"
            )));
        }
        Ok(())
    }

    fn check_article(&self, input: &ArticleInput, except: Option<i64>) -> StoreResult<()> {
        let slugs = self.articles.iter().map(|a| (a.id, a.slug.as_str()));
        if Self::slug_taken(slugs, &input.slug, except) {
            return Err(StoreError::Conflict(format!(
                "article slug already exists: {}",
                input.slug
            )));
        }
        if let Some(category_id) = input.category_id {
            if !self.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::Conflict(format!(
                    "category does not exist: {category_id}"
                )));
            }
        }
        Ok(())
    }
}

fn without_content(article: &Article) -> Article {
    Article {
        content: None,
        ..article.clone()
    }
}

fn apply_input(article: &mut Article, input: &ArticleInput, now: DateTime<Utc>) {
    article.slug = input.slug.clone();
    article.title = Localized::new(&input.title_en, input.title_ar.clone());
    article.excerpt = Localized::new(&input.excerpt_en, input.excerpt_ar.clone());
    article.content = Some(Localized::new(&input.content_en, input.content_ar.clone()));
    article.meta_description =
        Localized::new(&input.meta_description_en, input.meta_description_ar.clone());
    article.category_id = input.category_id;
    article.author = input.author.clone();
    article.featured = input.featured;
    article.reading_time = input.resolved_reading_time();
    article.updated_at = now;
}

fn contains_ignore_case(text: &Localized, needle: &str) -> bool {
    text.en.to_lowercase().contains(needle)
        || text
            .ar
            .as_ref()
            .is_some_and(|ar| ar.to_lowercase().contains(needle))
}

/// 进程内的 [`ContentStore`] 实现
///
/// 未配置数据库时使用，也用于测试。可以通过 [`MemoryStore::set_offline`]
/// 模拟存储不可用，通过 [`MemoryStore::category_fetches`] 观察分类读取次数。
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    category_fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换离线状态，离线时所有操作返回 [`StoreError::Offline`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// 分类读取（列表、按 slug、按 id）的累计次数
    pub fn category_fetches(&self) -> usize {
        self.category_fetches.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Offline("memory store switched offline".into()))
        } else {
            Ok(())
        }
    }

    fn ensure_online_for_category_read(&self) -> StoreResult<()> {
        self.ensure_online()?;
        self.category_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        self.ensure_online_for_category_read()?;
        let tables = self.tables.read().await;
        Ok(tables.categories.clone())
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        self.ensure_online_for_category_read()?;
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        self.ensure_online_for_category_read()?;
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(
        &self,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        tables.check_category_slug(&input.slug, None)?;

        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            slug: input.slug.clone(),
            name: Localized::new(&input.name_en, input.name_ar.clone()),
            description: Localized::new(&input.description_en, input.description_ar.clone()),
            icon: input.icon.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Category>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        tables.check_category_slug(&input.slug, Some(id))?;

        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.slug = input.slug.clone();
        category.name = Localized::new(&input.name_en, input.name_ar.clone());
        category.description = Localized::new(&input.description_en, input.description_ar.clone());
        category.icon = input.icon.clone();
        category.updated_at = now;
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        let deleted = tables.categories.len() < before;

        if deleted {
            for article in tables.articles.iter_mut() {
                if article.category_id == Some(id) {
                    article.category_id = None;
                }
            }
        }
        Ok(deleted)
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<i64> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let count = tables.articles.iter().filter(|a| filter.matches(a)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        let mut rows: Vec<&Article> = tables.articles.iter().filter(|a| query.admits(a)).collect();
        rows.sort_by(|a, b| query.compare(a, b));

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(without_content)
            .collect())
    }

    async fn article_by_slug(&self, slug: &str) -> StoreResult<Option<Article>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn article_by_id(&self, id: i64) -> StoreResult<Option<Article>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn articles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Article>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| ids.contains(&a.id))
            .map(without_content)
            .collect();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    async fn search_articles(&self, term: &str, limit: i64) -> StoreResult<Vec<Article>> {
        self.ensure_online()?;
        let needle = term.to_lowercase();
        let tables = self.tables.read().await;

        let mut rows: Vec<&Article> = tables
            .articles
            .iter()
            .filter(|a| a.published)
            .filter(|a| {
                contains_ignore_case(&a.title, &needle) || contains_ignore_case(&a.excerpt, &needle)
            })
            .collect();
        rows.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.id.cmp(&a.id))
        });

        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(rows.into_iter().take(limit).map(without_content).collect())
    }

    async fn insert_article(&self, input: &ArticleInput, now: DateTime<Utc>) -> StoreResult<Article> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        tables.check_article(input, None)?;

        tables.next_article_id += 1;
        let mut article = Article {
            id: tables.next_article_id,
            slug: String::new(),
            title: Localized::default(),
            excerpt: Localized::default(),
            content: None,
            meta_description: Localized::default(),
            category_id: None,
            author: String::new(),
            published: input.publish_now,
            featured: false,
            reading_time: 1,
            published_at: input.publish_now.then_some(now),
            created_at: now,
            updated_at: now,
        };
        apply_input(&mut article, input, now);

        tables.articles.push(article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        id: i64,
        input: &ArticleInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Article>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        tables.check_article(input, Some(id))?;

        let Some(article) = tables.articles.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        apply_input(article, input, now);
        Ok(Some(article.clone()))
    }

    async fn set_published(
        &self,
        id: i64,
        published: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Article>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let Some(article) = tables.articles.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        article.published = published;
        article.published_at = published.then_some(now);
        article.updated_at = now;
        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, id: i64) -> StoreResult<bool> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let before = tables.articles.len();
        tables.articles.retain(|a| a.id != id);
        Ok(tables.articles.len() < before)
    }
}
