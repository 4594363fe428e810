use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Lang, Localized};
use crate::error::{Error, Result};

/// 分类
///
/// 由后台创建，极少修改，读取走 [`crate::catalog::CategoryCache`]。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    /// 唯一 slug
    pub slug: String,
    pub name: Localized,
    pub description: Localized,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// 按语言投影为对外输出的 [`CategoryView`]
    pub fn view(&self, lang: Lang) -> CategoryView {
        CategoryView {
            id: self.id,
            slug: self.slug.clone(),
            name: self.name.resolve(lang).to_string(),
            description: self.description.resolve(lang).to_string(),
            icon: self.icon.clone(),
        }
    }

    /// 文章列表中内嵌的简要分类信息
    pub fn summary(&self, lang: Lang) -> CategoryRef {
        CategoryRef {
            id: self.id,
            slug: self.slug.clone(),
            name: self.name.resolve(lang).to_string(),
            icon: self.icon.clone(),
        }
    }
}

/// 按语言投影后的分类
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

/// 文章中引用的分类
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub icon: Option<String>,
}

/// 创建或整体更新分类时的输入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub slug: String,
    pub name_en: String,
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description_en: String,
    pub description_ar: Option<String>,
    pub icon: Option<String>,
}

impl CategoryInput {
    /// 校验 slug 与英文名称
    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        if self.name_en.trim().is_empty() {
            return Err(Error::Validation("category name_en must not be empty".into()));
        }
        Ok(())
    }
}

/// slug 只允许小写 ASCII 字母、数字和 `-`
pub(crate) fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid slug: {slug:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(slug: &str, name: &str) -> CategoryInput {
        CategoryInput {
            slug: slug.to_string(),
            name_en: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_kebab_slug() {
        assert!(input("media-monitoring-2", "Media").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_slug_or_name() {
        assert!(input("", "Media").validate().is_err());
        assert!(input("Media Monitoring", "Media").validate().is_err());
        assert!(input("media", "   ").validate().is_err());
    }

    #[test]
    fn test_view_projects_language() {
        let now = Utc::now();
        let category = Category {
            id: 7,
            slug: "analysis".into(),
            name: Localized::new("Analysis", Some("تحليل".into())),
            description: Localized::new("Deep dives", None),
            icon: Some("chart".into()),
            created_at: now,
            updated_at: now,
        };

        let ar = category.view(Lang::Ar);
        assert_eq!(ar.name, "تحليل");
        assert_eq!(ar.description, "Deep dives");

        let en = category.summary(Lang::En);
        assert_eq!(en.name, "Analysis");
        assert_eq!(en.icon.as_deref(), Some("chart"));
    }
}
