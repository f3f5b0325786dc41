use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::pagination::{Page, PageRequest};
use crate::types::{Article, Category, NewArticle, Stats};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Inserts the article unless one with the same `source_url` exists.
    /// Returns `true` when this call created the row. Concurrent callers
    /// racing on the same url get exactly one `true`.
    async fn upsert_if_absent(&self, article: &NewArticle) -> Result<bool>;

    /// Replaces every field of the article stored under `source_url`,
    /// inserting it when missing. Administrative use only.
    async fn refresh_article(&self, article: &NewArticle) -> Result<Article>;

    async fn exists(&self, source_url: &str) -> Result<bool>;

    async fn get_by_id(&self, id: i64) -> Result<Article>;

    /// Newest first.
    async fn list_page(&self, page: PageRequest) -> Result<Page<Article>>;

    async fn list_by_category(&self, category: &str, page: PageRequest) -> Result<Page<Article>>;

    /// Sorted, de-duplicated categories of stored articles.
    async fn list_distinct_categories(&self) -> Result<Vec<String>>;

    /// Case-insensitive substring match over title or category. An empty
    /// query behaves like `list_page`.
    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Article>>;

    async fn delete_all_articles(&self) -> Result<u64>;

    async fn stats(&self, since: DateTime<Utc>) -> Result<Stats>;

    /// Creates the category or updates its active flag.
    async fn upsert_category(&self, name: &str, active: bool) -> Result<Category>;

    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn active_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| c.is_active)
            .collect())
    }

    /// Records a completed fetch cycle for the category. A category not
    /// known yet is created inactive.
    async fn touch_category(&self, name: &str, at: DateTime<Utc>) -> Result<()>;

    /// Deactivates every category, then activates exactly `names`,
    /// creating the missing ones.
    async fn set_active_categories(&self, names: &[&str]) -> Result<()>;
}
