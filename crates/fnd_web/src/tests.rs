use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use fnd_core::{
    ArticleStorage, Classifier, ClassifierSource, ContentType, Error, NewArticle, Prediction, Result,
};
use fnd_storage::InMemoryStorage;
use serde_json::Value;
use tower::ServiceExt;

struct FixedClassifier(Prediction);

impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn score(&self, _text: &str) -> Result<Prediction> {
        Ok(self.0)
    }
}

struct Unavailable;

#[async_trait::async_trait]
impl ClassifierSource for Unavailable {
    async fn classifier(&self) -> Result<Arc<dyn Classifier>> {
        Err(Error::ArtifactUnavailable("blob store offline".to_string()))
    }
}

fn article(n: u32, category: &str, prediction: bool, confidence: f64) -> NewArticle {
    NewArticle {
        title: format!("Story number {} about the council", n),
        publication_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, n).unwrap(),
        category: category.to_string(),
        section_id: "world".to_string(),
        section_name: "World news".to_string(),
        content_type: ContentType::Article,
        source_url: format!("https://www.theguardian.com/world/{}", n),
        image_url: "None".to_string(),
        prediction,
        confidence,
    }
}

async fn seeded_storage(count: u32) -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new());
    for n in 0..count {
        let category = if n % 2 == 0 { "News" } else { "Arts" };
        storage.upsert_if_absent(&article(n, category, true, 0.86)).await.unwrap();
    }
    storage
}

fn app_with(storage: Arc<InMemoryStorage>, classifiers: Arc<dyn ClassifierSource>) -> Router {
    create_app(AppState::new(storage, classifiers))
}

fn real_classifier() -> Arc<dyn ClassifierSource> {
    let classifier: Arc<dyn Classifier> = Arc::new(FixedClassifier(Prediction::from_posterior(0.14, 0.86)));
    Arc::new(classifier)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_pagination() {
    let app = app_with(seeded_storage(25).await, real_classifier());

    let (status, body) = send(app.clone(), get("/news")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 25);
    assert_eq!(body["next_offset"], 10);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);

    let (_, body) = send(app.clone(), get("/news?offset=20&limit=10")).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert!(body["next_offset"].is_null());

    let (_, body) = send(app, get("/news?offset=0&limit=1000")).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_article_shape_and_not_found() {
    let storage = seeded_storage(1).await;
    let id = storage.list_page(Default::default()).await.unwrap().items[0].id;
    let app = app_with(storage, real_classifier());

    let (status, body) = send(app.clone(), get(&format!("/news/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["news_category"], "News");
    assert_eq!(body["type"], "article");
    assert_eq!(body["web_url"], "https://www.theguardian.com/world/0");
    assert_eq!(body["img_url"], "None");
    assert_eq!(body["prediction"], true);
    assert_eq!(body["reliability_score"], 91);

    let (status, body) = send(app.clone(), get("/news/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);

    let (status, _) = send(app, get("/news/not-a-number")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_and_categories() {
    let storage = seeded_storage(4).await;
    storage.upsert_if_absent(&article(10, "Lifestyle news", false, 0.95)).await.unwrap();
    let app = app_with(storage, real_classifier());

    let (_, body) = send(app.clone(), get("/news/category/Lifestyle-news")).await;
    assert_eq!(body["category"], "Lifestyle news");
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["reliability_score"], 90);

    let (_, body) = send(app, get("/categories")).await;
    assert_eq!(
        body["categories"],
        serde_json::json!(["Arts", "Lifestyle news", "News"])
    );
}

#[tokio::test]
async fn test_search() {
    let storage = seeded_storage(6).await;
    let app = app_with(storage, real_classifier());

    let (_, body) = send(app.clone(), get("/news/search?q=arts")).await;
    assert_eq!(body["query"], "arts");
    assert_eq!(body["count"], 3);

    let (_, body) = send(app.clone(), get("/news/search?q=NUMBER%205")).await;
    assert_eq!(body["count"], 1);

    let (status, body) = send(app, get("/news/search")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 6);
}

#[tokio::test]
async fn test_check() {
    let app = app_with(seeded_storage(0).await, real_classifier());

    let (status, body) = send(app.clone(), get("/check")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("POST"));

    let (status, body) = send(
        app.clone(),
        post_json("/check", serde_json::json!({"title": "Council approves new budget"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], true);
    assert_eq!(body["confidence"], 0.86);
    assert_eq!(body["analysis"]["interpretation"]["caps_usage"], "Normal");

    let (status, body) = send(app, post_json("/check", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
}

#[tokio::test]
async fn test_analyze() {
    let app = app_with(seeded_storage(0).await, real_classifier());

    let (status, body) = send(
        app.clone(),
        post_json(
            "/news/analyze",
            serde_json::json!({"title": "Council approves new budget", "text": "The council met on Monday."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence"], "86.00%");
    assert_eq!(body["probabilities"]["real"], "86.00%");
    assert_eq!(body["analysis"]["patterns"]["conspiracy_language"], "Not Present");
    assert!(body["analysis"]["risk_score"].as_str().unwrap().ends_with("/100"));

    let (status, _) = send(app, post_json("/news/analyze", serde_json::json!({"title": "Only a title"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classifier_unavailable_is_503() {
    let app = app_with(seeded_storage(0).await, Arc::new(Unavailable));
    let (status, body) = send(
        app,
        post_json("/check", serde_json::json!({"title": "Council approves new budget"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status_code"], 503);
}

#[tokio::test]
async fn test_stats_and_ingest_disabled() {
    let storage = seeded_storage(3).await;
    storage.set_active_categories(&["world"]).await.unwrap();
    let app = app_with(storage, real_classifier());

    let (status, body) = send(app.clone(), get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["reliable"], 3);
    assert_eq!(body["active_categories"][0]["name"], "world");
    assert!(body["active_categories"][0]["last_fetch_at"].is_null());

    let (status, _) = send(app, post_json("/ingest", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(ApiError::from(Error::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
    assert_eq!(ApiError::from(Error::MalformedRecord("x".into())).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::from(Error::VectorizerMissing).status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ApiError::from(Error::Storage("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let app = app_with(seeded_storage(3).await, real_classifier());

    for uri in ["/news?offset=abc", "/news?limit=-1", "/news/search?q=x&offset=1.5", "/news/category/News?limit=ten"] {
        let (status, body) = send(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status_code"], 400, "{}", uri);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{}", uri);
    }
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let app = app_with(seeded_storage(0).await, real_classifier());

    for uri in ["/check", "/news/analyze"] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status_code"], 400, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}
