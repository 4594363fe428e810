mod articles;
mod category;
mod lang;

pub use self::{
    articles::{Article, ArticleInput, ArticleView, estimate_reading_time},
    category::{Category, CategoryInput, CategoryRef, CategoryView},
    lang::{Lang, Localized},
};
