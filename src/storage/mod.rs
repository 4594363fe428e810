mod memory;
mod models;
mod postgres;
mod query;
mod store;

pub use self::{
    memory::MemoryStore,
    postgres::{Db, PgStore, migrate, new_db_pool},
    query::{ArticleFilter, ArticleQuery, Seek, SortKey, SortOrder, SortValue},
    store::{ContentStore, StoreError, StoreResult},
};
