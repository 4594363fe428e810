use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// 请求语言
///
/// 决定双语字段中哪一个作为规范字段输出。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ar,
}

impl FromStr for Lang {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "ar" => Ok(Lang::Ar),
            other => Err(Error::Validation(format!("unsupported language: {other}"))),
        }
    }
}

/// 双语文本
///
/// 英文为必填，阿拉伯文可以缺失。
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Localized {
    pub en: String,
    pub ar: Option<String>,
}

impl Localized {
    pub fn new(en: impl Into<String>, ar: Option<String>) -> Self {
        Self { en: en.into(), ar }
    }

    /// 按语言取值
    ///
    /// 仅当请求阿拉伯文且阿拉伯文存在时返回阿拉伯文，否则回退到英文。
    /// 列表、搜索、详情都必须经过这里，保证回退规则一致。
    pub fn resolve(&self, lang: Lang) -> &str {
        match (lang, &self.ar) {
            (Lang::Ar, Some(ar)) => ar,
            _ => &self.en,
        }
    }
}
