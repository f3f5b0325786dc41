use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use fnd_core::{Article, ArticleStorage, Category, ContentType, Error, NewArticle, Page, PageRequest, Result, Stats};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        publication_date TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT 'Undefined',
        section_id TEXT NOT NULL DEFAULT '',
        section_name TEXT NOT NULL DEFAULT '',
        content_type TEXT NOT NULL DEFAULT 'article',
        source_url TEXT NOT NULL UNIQUE,
        image_url TEXT NOT NULL DEFAULT 'None',
        prediction INTEGER NOT NULL DEFAULT 1,
        confidence REAL NOT NULL DEFAULT 0.84,
        title_folded TEXT NOT NULL DEFAULT '',
        category_folded TEXT NOT NULL DEFAULT ''
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_category ON articles (category)",
    "CREATE INDEX IF NOT EXISTS idx_articles_publication_date ON articles (publication_date)",
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        name TEXT PRIMARY KEY,
        is_active INTEGER NOT NULL DEFAULT 1,
        last_fetch_at TEXT
    )
    "#,
    // Add future migrations here
];

const ARTICLE_COLUMNS: &str = "id, title, publication_date, category, section_id, section_name, \
     content_type, source_url, image_url, prediction, confidence";

const ORDER_NEWEST: &str = "ORDER BY publication_date DESC, id DESC";

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable"
    }

    async fn new() -> Result<Self> {
        let db_path = PathBuf::from("articles.db");
        Self::new_with_path(&db_path).await
    }
}

fn db_err(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so that text ordering is time ordering.
fn encode_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_date(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", value, e)))
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let content_type: String = row.try_get("content_type").map_err(db_err("content_type"))?;
    let publication_date: String = row.try_get("publication_date").map_err(db_err("publication_date"))?;
    Ok(Article {
        id: row.try_get("id").map_err(db_err("id"))?,
        title: row.try_get("title").map_err(db_err("title"))?,
        publication_date: decode_date(&publication_date)?,
        category: row.try_get("category").map_err(db_err("category"))?,
        section_id: row.try_get("section_id").map_err(db_err("section_id"))?,
        section_name: row.try_get("section_name").map_err(db_err("section_name"))?,
        content_type: ContentType::from_upstream(Some(&content_type)),
        source_url: row.try_get("source_url").map_err(db_err("source_url"))?,
        image_url: row.try_get("image_url").map_err(db_err("image_url"))?,
        prediction: row.try_get("prediction").map_err(db_err("prediction"))?,
        confidence: row.try_get("confidence").map_err(db_err("confidence"))?,
    })
}

fn row_to_category(row: &SqliteRow) -> Result<Category> {
    let last_fetch_at: Option<String> = row.try_get("last_fetch_at").map_err(db_err("last_fetch_at"))?;
    Ok(Category {
        name: row.try_get("name").map_err(db_err("name"))?,
        is_active: row.try_get("is_active").map_err(db_err("is_active"))?,
        last_fetch_at: last_fetch_at.as_deref().map(decode_date).transpose()?,
    })
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }
        debug!("SQLite database ready at {}", db_path.display());

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn count(&self, sql: &str, binds: &[&str]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query.fetch_one(&*self.pool).await.map_err(db_err("Failed to count articles"))?;
        let count: i64 = row.try_get(0).map_err(db_err("count"))?;
        Ok(count as u64)
    }

    /// Runs a filtered page query plus the matching count.
    async fn page(&self, filter: &str, binds: &[&str], page: PageRequest) -> Result<Page<Article>> {
        let total = self
            .count(&format!("SELECT COUNT(*) FROM articles {}", filter), binds)
            .await?;

        let sql = format!(
            "SELECT {} FROM articles {} {} LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS, filter, ORDER_NEWEST
        );
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_err("Failed to list articles"))?;

        let items = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn upsert_if_absent(&self, article: &NewArticle) -> Result<bool> {
        article.validate()?;
        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, publication_date, category, section_id, section_name,
             content_type, source_url, image_url, prediction, confidence,
             title_folded, category_folded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_url) DO NOTHING
            "#,
        )
        .bind(&article.title)
        .bind(encode_date(&article.publication_date))
        .bind(&article.category)
        .bind(&article.section_id)
        .bind(&article.section_name)
        .bind(article.content_type.as_str())
        .bind(&article.source_url)
        .bind(&article.image_url)
        .bind(article.prediction)
        .bind(article.confidence)
        .bind(article.title.to_lowercase())
        .bind(article.category.to_lowercase())
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to store article"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn refresh_article(&self, article: &NewArticle) -> Result<Article> {
        article.validate()?;
        sqlx::query(
            r#"
            INSERT INTO articles
            (title, publication_date, category, section_id, section_name,
             content_type, source_url, image_url, prediction, confidence,
             title_folded, category_folded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_url) DO UPDATE SET
                title = excluded.title,
                publication_date = excluded.publication_date,
                category = excluded.category,
                section_id = excluded.section_id,
                section_name = excluded.section_name,
                content_type = excluded.content_type,
                image_url = excluded.image_url,
                prediction = excluded.prediction,
                confidence = excluded.confidence,
                title_folded = excluded.title_folded,
                category_folded = excluded.category_folded
            "#,
        )
        .bind(&article.title)
        .bind(encode_date(&article.publication_date))
        .bind(&article.category)
        .bind(&article.section_id)
        .bind(&article.section_name)
        .bind(article.content_type.as_str())
        .bind(&article.source_url)
        .bind(&article.image_url)
        .bind(article.prediction)
        .bind(article.confidence)
        .bind(article.title.to_lowercase())
        .bind(article.category.to_lowercase())
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to refresh article"))?;

        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE source_url = ?", ARTICLE_COLUMNS))
            .bind(&article.source_url)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_err("Failed to reload article"))?;
        row_to_article(&row)
    }

    async fn exists(&self, source_url: &str) -> Result<bool> {
        let count = self
            .count("SELECT COUNT(*) FROM articles WHERE source_url = ?", &[source_url])
            .await?;
        Ok(count > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Article> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_err("Failed to get article"))?;
        match row {
            Some(row) => row_to_article(&row),
            None => Err(Error::NotFound(format!("article {}", id))),
        }
    }

    async fn list_page(&self, page: PageRequest) -> Result<Page<Article>> {
        self.page("", &[], page).await
    }

    async fn list_by_category(&self, category: &str, page: PageRequest) -> Result<Page<Article>> {
        self.page("WHERE category = ?", &[category], page).await
    }

    async fn list_distinct_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT category FROM articles ORDER BY category")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_err("Failed to list categories"))?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(db_err("category")))
            .collect()
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Article>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_page(page).await;
        }
        // SQLite LOWER() only folds ASCII, so the folded columns are written from Rust.
        let pattern = like_pattern(query);
        self.page(
            r"WHERE title_folded LIKE ? ESCAPE '\' OR category_folded LIKE ? ESCAPE '\'",
            &[pattern.as_str(), pattern.as_str()],
            page,
        )
        .await
    }

    async fn delete_all_articles(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM articles")
            .execute(&*self.pool)
            .await
            .map_err(db_err("Failed to delete articles"))?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<Stats> {
        let total = self.count("SELECT COUNT(*) FROM articles", &[]).await?;
        let reliable = self
            .count("SELECT COUNT(*) FROM articles WHERE prediction = 1", &[])
            .await?;
        let since = encode_date(&since);
        let recent = self
            .count("SELECT COUNT(*) FROM articles WHERE publication_date >= ?", &[since.as_str()])
            .await?;
        Ok(Stats {
            total,
            reliable,
            unreliable: total - reliable,
            recent,
        })
    }

    async fn upsert_category(&self, name: &str, active: bool) -> Result<Category> {
        sqlx::query(
            "INSERT INTO categories (name, is_active) VALUES (?, ?) \
             ON CONFLICT(name) DO UPDATE SET is_active = excluded.is_active",
        )
        .bind(name)
        .bind(active)
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to store category"))?;

        let row = sqlx::query("SELECT name, is_active, last_fetch_at FROM categories WHERE name = ?")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(db_err("Failed to reload category"))?;
        row_to_category(&row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT name, is_active, last_fetch_at FROM categories ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_err("Failed to list categories"))?;
        rows.iter().map(row_to_category).collect()
    }

    async fn touch_category(&self, name: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (name, is_active, last_fetch_at) VALUES (?, 0, ?) \
             ON CONFLICT(name) DO UPDATE SET last_fetch_at = excluded.last_fetch_at",
        )
        .bind(name)
        .bind(encode_date(&at))
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to update category watermark"))?;
        Ok(())
    }

    async fn set_active_categories(&self, names: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to open transaction"))?;
        sqlx::query("UPDATE categories SET is_active = 0")
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to deactivate categories"))?;
        for name in names {
            sqlx::query(
                "INSERT INTO categories (name, is_active) VALUES (?, 1) \
                 ON CONFLICT(name) DO UPDATE SET is_active = 1",
            )
            .bind(*name)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to activate category"))?;
        }
        tx.commit().await.map_err(db_err("Failed to commit categories"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fnd_core::NO_IMAGE;
    use tempfile::tempdir;

    fn article(url: &str, title: &str, category: &str, minutes: i64) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            publication_date: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minutes),
            category: category.to_string(),
            section_id: category.to_lowercase(),
            section_name: category.to_string(),
            content_type: ContentType::Liveblog,
            source_url: url.to_string(),
            image_url: NO_IMAGE.to_string(),
            prediction: true,
            confidence: 0.86,
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Budget"), "%budget%");
        assert_eq!(like_pattern("100%_"), r"%100\%\_%");
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        assert_eq!(storage.get_db_path(), &db_path);

        let first = article("https://x/1", "Local Council Approves New Budget", "News", 0);
        assert!(storage.upsert_if_absent(&first).await.unwrap());
        assert!(!storage.upsert_if_absent(&first).await.unwrap());
        assert!(storage.exists("https://x/1").await.unwrap());

        let page = storage.list_page(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        let stored = &page.items[0];
        assert_eq!(stored.title, first.title);
        assert_eq!(stored.publication_date, first.publication_date);
        assert_eq!(stored.content_type, ContentType::Liveblog);
        assert!(stored.prediction);
        assert_eq!(stored.confidence, 0.86);

        let by_id = storage.get_by_id(stored.id).await.unwrap();
        assert_eq!(&by_id, stored);
        assert!(matches!(storage.get_by_id(stored.id + 100).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_concurrent_inserts_create_once() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(SQLiteStorage::new_with_path(&temp_dir.path().join("race.db")).await.unwrap());
        let item = article("https://x/race", "Racing inserts on one url", "News", 0);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let storage = storage.clone();
                let item = item.clone();
                tokio::spawn(async move { storage.upsert_if_absent(&item).await.unwrap() })
            })
            .collect();
        let created = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();
        assert_eq!(created, 1);
        assert_eq!(storage.list_page(PageRequest::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_sqlite_queries() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("q.db")).await.unwrap();
        for i in 0..7 {
            let category = if i % 2 == 0 { "News" } else { "Sport" };
            let title = format!("Headline number {} for 100% coverage", i);
            storage
                .upsert_if_absent(&article(&format!("https://x/{}", i), &title, category, i))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut request = PageRequest::new(Some(0), Some(3));
        loop {
            let page = storage.list_page(request).await.unwrap();
            assert_eq!(page.total, 7);
            seen.extend(page.items.iter().map(|a| a.source_url.clone()));
            match page.next_offset() {
                Some(next) => request.offset = next,
                None => break,
            }
        }
        let expected: Vec<String> = (0..7).rev().map(|i| format!("https://x/{}", i)).collect();
        assert_eq!(seen, expected);

        let sport = storage.list_by_category("Sport", PageRequest::default()).await.unwrap();
        assert_eq!(sport.total, 3);
        assert_eq!(
            storage.list_distinct_categories().await.unwrap(),
            vec!["News".to_string(), "Sport".to_string()]
        );

        assert_eq!(storage.search("NUMBER 3", PageRequest::default()).await.unwrap().total, 1);
        assert_eq!(storage.search("spor", PageRequest::default()).await.unwrap().total, 3);
        assert_eq!(storage.search("100%", PageRequest::default()).await.unwrap().total, 7);
        assert_eq!(storage.search("1_0", PageRequest::default()).await.unwrap().total, 0);
        assert_eq!(storage.search("  ", PageRequest::default()).await.unwrap().total, 7);

        let stats = storage
            .stats(Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(stats.total, 7);
        assert_eq!(stats.reliable, 7);
        assert_eq!(stats.recent, 2);
    }

    #[tokio::test]
    async fn test_sqlite_refresh_and_reset() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("r.db")).await.unwrap();
        let original = article("https://x/1", "Original headline text", "News", 0);
        storage.upsert_if_absent(&original).await.unwrap();

        let mut updated = original.clone();
        updated.title = "Updated headline text".to_string();
        updated.prediction = false;
        let refreshed = storage.refresh_article(&updated).await.unwrap();
        assert_eq!(refreshed.title, "Updated headline text");
        assert!(!refreshed.prediction);
        assert_eq!(storage.list_page(PageRequest::default()).await.unwrap().total, 1);

        storage.upsert_category("sport", true).await.unwrap();
        storage.set_active_categories(&["world", "politics"]).await.unwrap();
        let categories = storage.list_categories().await.unwrap();
        let active: Vec<&str> = categories.iter().filter(|c| c.is_active).map(|c| c.name.as_str()).collect();
        assert_eq!(active, vec!["politics", "world"]);
        assert!(categories.iter().any(|c| c.name == "sport" && !c.is_active));

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        storage.touch_category("world", at).await.unwrap();
        let world = storage
            .active_categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == "world")
            .unwrap();
        assert_eq!(world.last_fetch_at, Some(at));

        storage.touch_category("travel", at).await.unwrap();
        let categories = storage.list_categories().await.unwrap();
        let travel = categories.iter().find(|c| c.name == "travel").unwrap();
        assert!(!travel.is_active);
        assert_eq!(travel.last_fetch_at, Some(at));
        assert_eq!(storage.active_categories().await.unwrap().len(), 2);

        assert_eq!(storage.delete_all_articles().await.unwrap(), 1);
        assert_eq!(storage.list_page(PageRequest::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_sqlite_search_folds_unicode_case() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("fold.db")).await.unwrap();
        storage
            .upsert_if_absent(&article("https://x/ecole", "ÉCOLE fermée après la tempête", "Société", 0))
            .await
            .unwrap();

        assert_eq!(storage.search("école", PageRequest::default()).await.unwrap().total, 1);
        assert_eq!(storage.search("TEMPÊTE", PageRequest::default()).await.unwrap().total, 1);
        assert_eq!(storage.search("société", PageRequest::default()).await.unwrap().total, 1);

        let mut renamed = article("https://x/ecole", "Ouverture de l'ÉTÉ culturel", "Culture", 0);
        renamed.prediction = false;
        storage.refresh_article(&renamed).await.unwrap();
        assert_eq!(storage.search("école", PageRequest::default()).await.unwrap().total, 0);
        assert_eq!(storage.search("été", PageRequest::default()).await.unwrap().total, 1);
    }
}
