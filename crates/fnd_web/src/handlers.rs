use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use fnd_core::{Error, PageRequest};
use fnd_inference::assess;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::dto::{
    analyze_response, AnalyzeRequest, ArticleResponse, CategoryStatus, CheckRequest, ListResponse, PageParams,
    SearchParams,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list_news(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(params) = params?;
    let page = state
        .storage
        .list_page(PageRequest::new(params.offset, params.limit))
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ArticleResponse>> {
    let id: i64 = id
        .parse()
        .map_err(|_| Error::NotFound("News not found".to_string()))?;
    let article = state.storage.get_by_id(id).await?;
    Ok(Json(article.into()))
}

pub async fn news_by_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(params) = params?;
    let category = name.replace('-', " ");
    let page = state
        .storage
        .list_by_category(&category, PageRequest::new(params.offset, params.limit))
        .await?;
    let mut response = ListResponse::from(page);
    response.category = Some(category);
    Ok(Json(response))
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(params) = params?;
    let page = state
        .storage
        .search(&params.q, PageRequest::new(params.offset, params.limit))
        .await?;
    let mut response = ListResponse::from(page);
    response.query = Some(params.q);
    Ok(Json(response))
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let categories = state.storage.list_distinct_categories().await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Available news categories",
        "categories": categories,
    })))
}

pub async fn check_usage() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Use POST request with a title parameter to check news",
        "example": {"title": "Your news title here"},
    }))
}

pub async fn check_title(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = request?;
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Title parameter is required".to_string()))?;

    info!("Checking title: {}", title);
    let classifier = state.classifiers.classifier().await?;
    let assessment = assess(classifier.as_ref(), &title, "")?;

    Ok(Json(json!({
        "status": "success",
        "title": title,
        "prediction": assessment.is_real,
        "confidence": assessment.confidence,
        "reliability_score": assessment.reliability_score,
        "analysis": assessment.risk,
    })))
}

pub async fn analyze_news(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = request?;
    let (title, text) = match (request.title, request.text) {
        (Some(title), Some(text)) if !title.trim().is_empty() && !text.trim().is_empty() => (title, text),
        _ => return Err(ApiError::BadRequest("Both title and text are required".to_string())),
    };

    let classifier = state.classifiers.classifier().await?;
    let assessment = assess(classifier.as_ref(), &title, &text)?;
    Ok(Json(analyze_response(&assessment)))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let stats = state.storage.stats(now - Duration::hours(24)).await?;
    let categories: Vec<CategoryStatus> = state
        .storage
        .active_categories()
        .await?
        .into_iter()
        .map(|c| CategoryStatus::new(c, now))
        .collect();

    Ok(Json(json!({
        "status": "success",
        "total": stats.total,
        "reliable": stats.reliable,
        "unreliable": stats.unreliable,
        "reliable_percent": (stats.reliable_percent() * 10.0).round() / 10.0,
        "last_24h": stats.recent,
        "active_categories": categories,
    })))
}

pub async fn trigger_ingest(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let pipeline = state
        .pipeline
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Ingestion is not enabled on this server".to_string()))?;

    let report = pipeline.run_cycle().await?;
    let categories: Vec<Value> = report
        .categories
        .iter()
        .map(|c| match &c.result {
            Ok(outcome) => json!({
                "category": c.category,
                "created": outcome.created,
                "skipped": outcome.skipped,
                "failed": outcome.failed.len(),
            }),
            Err(e) => json!({
                "category": c.category,
                "error": e.to_string(),
            }),
        })
        .collect();

    Ok(Json(json!({
        "status": "success",
        "created": report.created(),
        "categories": categories,
    })))
}
