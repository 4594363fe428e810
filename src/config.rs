use std::{net::SocketAddr, str::FromStr};

use chrono::Duration;

/// 启动配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// 启动配置，全部来自环境变量
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// 未设置时使用内存存储
    pub database_url: Option<String>,
    pub category_cache_ttl: Duration,
    pub event_retention: Duration,
    pub retention_sweep_interval: std::time::Duration,
    pub max_page_size: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过 `lookup` 读取配置项，便于测试
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let ttl_secs: u32 = parse_or(&lookup, "CATEGORY_CACHE_TTL_SECS", Some(300))?;
        let retention_days: u32 = parse_or(&lookup, "EVENT_RETENTION_DAYS", Some(30))?;
        let sweep_secs: u64 = parse_or(&lookup, "RETENTION_SWEEP_INTERVAL_SECS", Some(3600))?;
        let max_page_size: i64 = parse_or(&lookup, "MAX_PAGE_SIZE", Some(100))?;

        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RETENTION_SWEEP_INTERVAL_SECS".into(),
                "must be greater than 0".into(),
            ));
        }
        if max_page_size < 1 {
            return Err(ConfigError::InvalidValue(
                "MAX_PAGE_SIZE".into(),
                "must be at least 1".into(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            category_cache_ttl: Duration::seconds(i64::from(ttl_secs)),
            event_retention: Duration::days(i64::from(retention_days)),
            retention_sweep_interval: std::time::Duration::from_secs(sweep_secs),
            max_page_size,
        })
    }
}

/// 解析变量，未设置时返回默认值
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}
