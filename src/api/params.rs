//! 查询参数解析
//!
//! 查询字符串中的数字先按字符串接收，在这里解析，
//! 格式错误统一返回 [`Error::Validation`]，不会进入存储调用。

use std::str::FromStr;

use crate::{
    content::Lang,
    error::{Error, Result},
};

/// 解析可选的数字参数
pub(super) fn number<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| Error::Validation(format!("{name} must be a number, got {s:?}")))
        })
        .transpose()
}

/// 解析路径中的 id
pub(super) fn id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Validation(format!("invalid id: {raw:?}")))
}

/// 解析可选的布尔参数
pub(super) fn flag(name: &str, raw: Option<&str>) -> Result<Option<bool>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(Error::Validation(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}

/// 解析可选的枚举参数，缺省时取默认值
pub(super) fn choice<T>(raw: Option<&str>) -> Result<T>
where
    T: FromStr<Err = Error> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse(),
        None => Ok(T::default()),
    }
}

pub(super) fn lang(raw: Option<&str>) -> Result<Lang> {
    choice(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number() {
        assert_eq!(number::<i64>("limit", Some("20")).unwrap(), Some(20));
        assert_eq!(number::<i64>("limit", None).unwrap(), None);
        assert_eq!(number::<i64>("limit", Some(" ")).unwrap(), None);
        assert!(matches!(
            number::<i64>("limit", Some("ten")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_flag_and_lang() {
        assert_eq!(flag("featured", Some("true")).unwrap(), Some(true));
        assert!(flag("featured", Some("yes")).is_err());
        assert_eq!(lang(None).unwrap(), Lang::En);
        assert_eq!(lang(Some("ar")).unwrap(), Lang::Ar);
        assert!(lang(Some("fr")).is_err());
    }
}
