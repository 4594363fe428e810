use super::Catalog;
use crate::{
    content::{Article, ArticleInput, Category, CategoryInput, CategoryView, Lang},
    error::{Error, Result},
    storage::ContentStore,
};

/// 分类读取与后台写操作
impl<S: ContentStore> Catalog<S> {
    /// 全部分类，按语言投影
    pub async fn get_categories(&self, lang: Lang) -> Result<Vec<CategoryView>> {
        let categories = self.cache.get_categories().await?;
        Ok(categories.iter().map(|c| c.view(lang)).collect())
    }

    /// 按 slug 获取分类
    pub async fn get_category_by_slug(&self, slug: &str, lang: Lang) -> Result<CategoryView> {
        self.cache
            .get_category_by_slug(slug)
            .await?
            .map(|c| c.view(lang))
            .ok_or(Error::NotFound)
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        input.validate()?;
        let category = self.store.insert_category(&input, self.clock.now()).await?;
        self.cache.invalidate().await;

        tracing::info!(id = category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, input: CategoryInput) -> Result<Category> {
        input.validate()?;
        let category = self
            .store
            .update_category(id, &input, self.clock.now())
            .await?
            .ok_or(Error::NotFound)?;
        self.cache.invalidate().await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        if !self.store.delete_category(id).await? {
            return Err(Error::NotFound);
        }
        self.cache.invalidate().await;

        tracing::info!(id, "category deleted");
        Ok(())
    }

    /// 创建文章
    ///
    /// `publish_now` 为真时同时发布，`published_at` 取当前时间。
    pub async fn create_article(&self, input: ArticleInput) -> Result<Article> {
        input.validate()?;
        self.ensure_category_exists(input.category_id).await?;

        let article = self.store.insert_article(&input, self.clock.now()).await?;
        tracing::info!(id = article.id, slug = %article.slug, published = article.published, "article created");
        Ok(article)
    }

    /// 整体更新文章内容，发布状态不变
    pub async fn update_article(&self, id: i64, input: ArticleInput) -> Result<Article> {
        input.validate()?;
        self.ensure_category_exists(input.category_id).await?;

        self.store
            .update_article(id, &input, self.clock.now())
            .await?
            .ok_or(Error::NotFound)
    }

    /// 立即发布：`published = true` 且 `published_at = now`
    pub async fn publish_article(&self, id: i64) -> Result<Article> {
        self.store
            .set_published(id, true, self.clock.now())
            .await?
            .ok_or(Error::NotFound)
    }

    /// 取消发布，`published_at` 被清空
    pub async fn unpublish_article(&self, id: i64) -> Result<Article> {
        self.store
            .set_published(id, false, self.clock.now())
            .await?
            .ok_or(Error::NotFound)
    }

    pub async fn delete_article(&self, id: i64) -> Result<()> {
        if !self.store.delete_article(id).await? {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: Option<i64>) -> Result<()> {
        let Some(id) = category_id else {
            return Ok(());
        };

        match self.store.category_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::Validation(format!("category does not exist: {id}"))),
        }
    }
}
