use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fnd_core::{Article, ArticleStorage, Category, Error, NewArticle, Page, PageRequest, Result, Stats};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    articles: HashMap<i64, Article>,
    by_url: HashMap<String, i64>,
    categories: BTreeMap<String, Category>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, article: &NewArticle) -> Article {
        self.next_id += 1;
        let stored = article.clone().into_article(self.next_id);
        self.by_url.insert(stored.source_url.clone(), stored.id);
        self.articles.insert(stored.id, stored.clone());
        stored
    }

    pub fn upsert_if_absent(&mut self, article: &NewArticle) -> bool {
        if self.by_url.contains_key(&article.source_url) {
            return false;
        }
        self.insert(article);
        true
    }

    pub fn refresh_article(&mut self, article: &NewArticle) -> Article {
        match self.by_url.get(&article.source_url) {
            Some(&id) => {
                let stored = article.clone().into_article(id);
                self.articles.insert(id, stored.clone());
                stored
            }
            None => self.insert(article),
        }
    }

    /// Articles matching `filter`, newest first.
    fn sorted(&self, filter: impl Fn(&Article) -> bool) -> Vec<Article> {
        let mut articles: Vec<Article> = self.articles.values().filter(|a| filter(a)).cloned().collect();
        articles.sort_by(|a, b| {
            b.publication_date
                .cmp(&a.publication_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        articles
    }

    pub fn page(&self, page: PageRequest, filter: impl Fn(&Article) -> bool) -> Page<Article> {
        Page::from_sorted(self.sorted(filter), page)
    }

    pub fn touch_category(&mut self, name: &str, at: DateTime<Utc>) {
        self.categories
            .entry(name.to_string())
            .or_insert_with(|| Category {
                is_active: false,
                ..Category::new(name)
            })
            .last_fetch_at = Some(at);
    }
}

/// Process-local store. Everything lives behind a single lock, which makes
/// the existence check and the insert one atomic step.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn new() -> Result<Self> where Self: Sized {
        Ok(Self::default())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn upsert_if_absent(&self, article: &NewArticle) -> Result<bool> {
        article.validate()?;
        Ok(self.store.write().await.upsert_if_absent(article))
    }

    async fn refresh_article(&self, article: &NewArticle) -> Result<Article> {
        article.validate()?;
        Ok(self.store.write().await.refresh_article(article))
    }

    async fn exists(&self, source_url: &str) -> Result<bool> {
        Ok(self.store.read().await.by_url.contains_key(source_url))
    }

    async fn get_by_id(&self, id: i64) -> Result<Article> {
        self.store
            .read()
            .await
            .articles
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))
    }

    async fn list_page(&self, page: PageRequest) -> Result<Page<Article>> {
        Ok(self.store.read().await.page(page, |_| true))
    }

    async fn list_by_category(&self, category: &str, page: PageRequest) -> Result<Page<Article>> {
        Ok(self.store.read().await.page(page, |a| a.category == category))
    }

    async fn list_distinct_categories(&self) -> Result<Vec<String>> {
        let store = self.store.read().await;
        let categories: BTreeSet<String> = store.articles.values().map(|a| a.category.clone()).collect();
        Ok(categories.into_iter().collect())
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Article>> {
        let needle = query.trim().to_lowercase();
        let store = self.store.read().await;
        if needle.is_empty() {
            return Ok(store.page(page, |_| true));
        }
        Ok(store.page(page, |a| {
            a.title.to_lowercase().contains(&needle) || a.category.to_lowercase().contains(&needle)
        }))
    }

    async fn delete_all_articles(&self) -> Result<u64> {
        let mut store = self.store.write().await;
        let deleted = store.articles.len() as u64;
        store.articles.clear();
        store.by_url.clear();
        Ok(deleted)
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<Stats> {
        let store = self.store.read().await;
        let total = store.articles.len() as u64;
        let reliable = store.articles.values().filter(|a| a.prediction).count() as u64;
        let recent = store.articles.values().filter(|a| a.publication_date >= since).count() as u64;
        Ok(Stats {
            total,
            reliable,
            unreliable: total - reliable,
            recent,
        })
    }

    async fn upsert_category(&self, name: &str, active: bool) -> Result<Category> {
        let mut store = self.store.write().await;
        let category = store
            .categories
            .entry(name.to_string())
            .or_insert_with(|| Category::new(name));
        category.is_active = active;
        Ok(category.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.read().await.categories.values().cloned().collect())
    }

    async fn touch_category(&self, name: &str, at: DateTime<Utc>) -> Result<()> {
        self.store.write().await.touch_category(name, at);
        Ok(())
    }

    async fn set_active_categories(&self, names: &[&str]) -> Result<()> {
        let mut store = self.store.write().await;
        for category in store.categories.values_mut() {
            category.is_active = false;
        }
        for name in names {
            store
                .categories
                .entry(name.to_string())
                .or_insert_with(|| Category::new(*name))
                .is_active = true;
        }
        Ok(())
    }
}
