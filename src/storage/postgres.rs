use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, postgres::PgPoolOptions};

use super::{
    ArticleFilter, ArticleQuery, ContentStore, SortKey, SortValue, StoreError, StoreResult,
    models::{ArticleRow, CategoryRow},
};
use crate::content::{Article, ArticleInput, Category, CategoryInput};

/// 数据库连接池类型
pub type Db = sqlx::PgPool;

/// 文章元数据列（不含正文）
const ARTICLE_META_COLUMNS: &str = r#"
    a.id, a.slug, a.title_en, a.title_ar, a.excerpt_en, a.excerpt_ar,
    a.meta_description_en, a.meta_description_ar, a.category_id, a.author,
    a.published, a.featured, a.reading_time, a.published_at, a.created_at, a.updated_at
"#;

const CATEGORY_COLUMNS: &str = r#"
    id, slug, name_en, name_ar, description_en, description_ar, icon, created_at, updated_at
"#;

/// 根据连接 URL 创建新的数据库连接池
///
/// 连接池配置：
///
/// - 最大空闲时间 60 秒
/// - 最大生存时间 1500 秒（约 25 分钟）
/// - 最大连接数 10
/// - 获取连接超时 2 秒
/// - 获取前测试连接
/// - 最小连接数 2
pub async fn new_db_pool(conn_url: &str) -> Result<Db, sqlx::Error> {
    PgPoolOptions::new()
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1500))
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .test_before_acquire(true)
        .min_connections(2)
        .connect(conn_url)
        .await
}

/// 执行 SQL 文件中的迁移语句
///
/// 将文件内容按 `;` 分割，每条 SQL 单独执行
pub async fn migrate(db: &Db, file: &str) -> Result<(), sqlx::Error> {
    let content = std::fs::read_to_string(file)?;

    for sql in content.split(';') {
        if sql.trim().is_empty() {
            continue;
        }
        sqlx::query(sql).execute(db).await?;
    }
    Ok(())
}

/// 约束冲突转换为 [`StoreError::Conflict`]
fn map_constraint(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Sqlx(e)
}

/// 转义 `LIKE` 通配符
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 追加过滤条件，调用前 SQL 需以 `FROM articles a` 结尾
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category_id) = filter.category_id {
        builder.push(" AND a.category_id = ").push_bind(category_id);
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND a.featured = ").push_bind(featured);
    }
    if let Some(published) = filter.published {
        builder.push(" AND a.published = ").push_bind(published);
    }
}

/// PostgreSQL 实现的 [`ContentStore`]
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl ContentStore for PgStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_category(
        &self,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            INSERT INTO categories
                (slug, name_en, name_ar, description_en, description_ar, icon, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&input.slug)
        .bind(&input.name_en)
        .bind(&input.name_ar)
        .bind(&input.description_en)
        .bind(&input.description_ar)
        .bind(&input.icon)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_constraint)?;
        Ok(row.into())
    }

    async fn update_category(
        &self,
        id: i64,
        input: &CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE categories
            SET slug = $2, name_en = $3, name_ar = $4, description_en = $5,
                description_ar = $6, icon = $7, updated_at = $8
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name_en)
        .bind(&input.name_ar)
        .bind(&input.description_en)
        .bind(&input.description_ar)
        .bind(&input.icon)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .map_err(map_constraint)?;
        Ok(row.map(Into::into))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {ARTICLE_META_COLUMNS}, NULL::text AS content_en, NULL::text AS content_ar FROM articles a"
        ));
        push_filter(&mut builder, &query.filter);

        if let Some(seek) = &query.seek {
            let column = query.sort_key.column();
            let op = query.order.seek_operator();

            match (query.sort_key, seek.value) {
                (SortKey::Id, _) | (_, SortValue::Id(_)) => {
                    builder.push(format!(" AND a.id {op} ")).push_bind(seek.id);
                }
                (_, SortValue::Time(value)) => {
                    builder
                        .push(format!(" AND ({column} {op} "))
                        .push_bind(value)
                        .push(format!(" OR ({column} = "))
                        .push_bind(value)
                        .push(format!(" AND a.id {op} "))
                        .push_bind(seek.id)
                        .push("))");
                }
            }
        }

        let direction = query.order.keyword();
        builder.push(format!(
            " ORDER BY {} {direction}, a.id {direction}",
            query.sort_key.column()
        ));
        builder.push(" LIMIT ").push_bind(query.limit);
        builder.push(" OFFSET ").push_bind(query.offset);

        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn article_by_slug(&self, slug: &str) -> StoreResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_META_COLUMNS}, a.content_en, a.content_ar FROM articles a WHERE a.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn article_by_id(&self, id: i64) -> StoreResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_META_COLUMNS}, a.content_en, a.content_ar FROM articles a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn articles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            SELECT {ARTICLE_META_COLUMNS}, NULL::text AS content_en, NULL::text AS content_ar
            FROM articles a
            WHERE a.id = ANY($1)
            ORDER BY a.id
            "#
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_articles(&self, term: &str, limit: i64) -> StoreResult<Vec<Article>> {
        let pattern = format!("%{}%", escape_like(term));

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            SELECT {ARTICLE_META_COLUMNS}, NULL::text AS content_en, NULL::text AS content_ar
            FROM articles a
            WHERE a.published = TRUE
            AND (
                a.title_en ILIKE $1 OR a.title_ar ILIKE $1
                OR a.excerpt_en ILIKE $1 OR a.excerpt_ar ILIKE $1
            )
            ORDER BY a.published_at DESC, a.id DESC
            LIMIT $2
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_article(&self, input: &ArticleInput, now: DateTime<Utc>) -> StoreResult<Article> {
        let published_at = input.publish_now.then_some(now);

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            INSERT INTO articles AS a
                (slug, title_en, title_ar, excerpt_en, excerpt_ar, content_en, content_ar,
                 meta_description_en, meta_description_ar, category_id, author,
                 published, featured, reading_time, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING {ARTICLE_META_COLUMNS}, a.content_en, a.content_ar
            "#
        ))
        .bind(&input.slug)
        .bind(&input.title_en)
        .bind(&input.title_ar)
        .bind(&input.excerpt_en)
        .bind(&input.excerpt_ar)
        .bind(&input.content_en)
        .bind(&input.content_ar)
        .bind(&input.meta_description_en)
        .bind(&input.meta_description_ar)
        .bind(input.category_id)
        .bind(&input.author)
        .bind(input.publish_now)
        .bind(input.featured)
        .bind(input.resolved_reading_time())
        .bind(published_at)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_constraint)?;
        Ok(row.into())
    }

    async fn update_article(
        &self,
        id: i64,
        input: &ArticleInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            UPDATE articles AS a
            SET slug = $2, title_en = $3, title_ar = $4, excerpt_en = $5, excerpt_ar = $6,
                content_en = $7, content_ar = $8, meta_description_en = $9,
                meta_description_ar = $10, category_id = $11, author = $12,
                featured = $13, reading_time = $14, updated_at = $15
            WHERE a.id = $1
            RETURNING {ARTICLE_META_COLUMNS}, a.content_en, a.content_ar
            "#
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.title_en)
        .bind(&input.title_ar)
        .bind(&input.excerpt_en)
        .bind(&input.excerpt_ar)
        .bind(&input.content_en)
        .bind(&input.content_ar)
        .bind(&input.meta_description_en)
        .bind(&input.meta_description_ar)
        .bind(input.category_id)
        .bind(&input.author)
        .bind(input.featured)
        .bind(input.resolved_reading_time())
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .map_err(map_constraint)?;
        Ok(row.map(Into::into))
    }

    async fn set_published(
        &self,
        id: i64,
        published: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Article>> {
        let published_at = published.then_some(now);

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            UPDATE articles AS a
            SET published = $2, published_at = $3, updated_at = $4
            WHERE a.id = $1
            RETURNING {ARTICLE_META_COLUMNS}, a.content_en, a.content_ar
            "#
        ))
        .bind(id)
        .bind(published)
        .bind(published_at)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_article(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
