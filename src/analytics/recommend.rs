use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::{Analytics, BehaviorAction, ContentPerformance};
use crate::{
    content::Article,
    error::Result,
    storage::{ArticleFilter, ArticleQuery, ContentStore, SortKey, SortOrder},
};

/// 推荐候选集大小：最近发布的文章数
pub const CANDIDATE_POOL_SIZE: i64 = 100;
/// 返回的推荐条数
pub const RECOMMENDATION_LIMIT: usize = 5;

/// 没有阅读历史时的阅读时长相似度
const NEUTRAL_SIMILARITY: f64 = 50.0;
/// 每过一天，时效分扣减的分数
const RECENCY_DECAY_PER_DAY: f64 = 5.0;

/// 一个 session 的阅读画像
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// 每个分类下浏览过的不同文章数
    pub category_views: HashMap<i64, usize>,
    /// 浏览过的不同文章数
    pub articles_viewed: usize,
    /// 浏览过的文章的平均阅读时长（分钟）
    pub avg_reading_time: Option<f64>,
    pub now: DateTime<Utc>,
}

impl SessionContext {
    /// 由 session 浏览过的文章构建画像
    pub fn from_viewed(viewed: &[Article], now: DateTime<Utc>) -> Self {
        let mut category_views = HashMap::new();
        for id in viewed.iter().filter_map(|a| a.category_id) {
            *category_views.entry(id).or_insert(0) += 1;
        }

        let avg_reading_time = (!viewed.is_empty()).then(|| {
            viewed.iter().map(|a| f64::from(a.reading_time)).sum::<f64>() / viewed.len() as f64
        });

        Self {
            category_views,
            articles_viewed: viewed.len(),
            avg_reading_time,
            now,
        }
    }
}

/// 待打分的候选文章
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub article: &'a Article,
    pub performance: Option<&'a ContentPerformance>,
}

/// 一条加权打分规则，`score` 返回 0–100
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub weight: f64,
    pub score: fn(&Candidate<'_>, &SessionContext) -> f64,
}

/// 推荐规则及权重
pub const RULES: [Rule; 4] = [
    Rule {
        name: "category_affinity",
        weight: 0.4,
        score: category_affinity,
    },
    Rule {
        name: "reading_time_similarity",
        weight: 0.3,
        score: reading_time_similarity,
    },
    Rule {
        name: "engagement",
        weight: 0.2,
        score: engagement,
    },
    Rule {
        name: "recency",
        weight: 0.1,
        score: recency,
    },
];

/// 候选文章所在分类占该 session 浏览文章的比例
pub fn category_affinity(candidate: &Candidate<'_>, ctx: &SessionContext) -> f64 {
    if ctx.articles_viewed == 0 {
        return 0.0;
    }
    let Some(category_id) = candidate.article.category_id else {
        return 0.0;
    };

    let hits = ctx.category_views.get(&category_id).copied().unwrap_or(0);
    hits as f64 / ctx.articles_viewed as f64 * 100.0
}

/// `100 / (1 + |差值分钟数|)`，没有阅读历史时取中间值
pub fn reading_time_similarity(candidate: &Candidate<'_>, ctx: &SessionContext) -> f64 {
    match ctx.avg_reading_time {
        Some(avg) => 100.0 / (1.0 + (f64::from(candidate.article.reading_time) - avg).abs()),
        None => NEUTRAL_SIMILARITY,
    }
}

/// 热门文章满分，否则取互动得分；没有统计数据时为 0
pub fn engagement(candidate: &Candidate<'_>, _ctx: &SessionContext) -> f64 {
    match candidate.performance {
        Some(p) if p.trending => 100.0,
        Some(p) => p.engagement_score,
        None => 0.0,
    }
}

/// `max(0, 100 - 发布天数 * 5)`
pub fn recency(candidate: &Candidate<'_>, ctx: &SessionContext) -> f64 {
    let published = candidate.article.published_sort_key();
    let days = (ctx.now - published).num_days() as f64;
    (100.0 - days * RECENCY_DECAY_PER_DAY).clamp(0.0, 100.0)
}

/// 规则加权总分
pub fn weighted_score(candidate: &Candidate<'_>, ctx: &SessionContext) -> f64 {
    RULES
        .iter()
        .map(|rule| rule.weight * (rule.score)(candidate, ctx))
        .sum()
}

/// 按总分降序取前 `limit` 个文章 id
///
/// 稳定排序，同分时保持候选集原有顺序。
pub fn rank(candidates: &[Candidate<'_>], ctx: &SessionContext, limit: usize) -> Vec<i64> {
    let mut scored: Vec<(i64, f64)> = candidates
        .iter()
        .map(|c| (c.article.id, weighted_score(c, ctx)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().take(limit).map(|(id, _)| id).collect()
}

impl<S: ContentStore> Analytics<S> {
    /// 为 session 生成个性化推荐，最多 5 个文章 id
    ///
    /// 候选集为最近发布的 100 篇文章，`current_article_id` 不会出现在结果中。
    pub async fn generate_personalized_recommendations(
        &self,
        session_id: &str,
        current_article_id: Option<i64>,
    ) -> Result<Vec<i64>> {
        let query = ArticleQuery {
            filter: ArticleFilter::default(),
            sort_key: SortKey::PublishedAt,
            order: SortOrder::Desc,
            seek: None,
            limit: CANDIDATE_POOL_SIZE,
            offset: 0,
        };
        let mut pool = self.store.list_articles(&query).await?;
        pool.retain(|a| Some(a.id) != current_article_id);

        let viewed = self.viewed_articles(session_id).await?;
        let ctx = SessionContext::from_viewed(&viewed, self.clock.now());

        let ids: Vec<i64> = pool.iter().map(|a| a.id).collect();
        let performance = self.tracker.performance_of(&ids).await;

        let candidates: Vec<Candidate<'_>> = pool
            .iter()
            .map(|article| Candidate {
                article,
                performance: performance.get(&article.id),
            })
            .collect();

        let ranked = rank(&candidates, &ctx, RECOMMENDATION_LIMIT);
        tracing::debug!(
            session_id,
            rules = ?RULES.iter().map(|r| (r.name, r.weight)).collect::<Vec<_>>(),
            candidates = candidates.len(),
            returned = ranked.len(),
            "recommendations generated"
        );
        Ok(ranked)
    }

    /// session 浏览过的不同文章，按首次浏览顺序
    pub(super) async fn viewed_articles(&self, session_id: &str) -> Result<Vec<Article>> {
        let mut seen = HashSet::new();
        let ids: Vec<i64> = self
            .tracker
            .session_events(session_id)
            .await
            .into_iter()
            .filter(|e| e.action == BehaviorAction::View)
            .map(|e| e.article_id)
            .filter(|id| seen.insert(*id))
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.articles_by_ids(&ids).await?)
    }
}
