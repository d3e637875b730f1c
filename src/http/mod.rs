use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, FromRequest, Path, Query, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use crate::{
    config::Config,
    domain::{BlogPost, BlogPostPatch, NewBlogPost, PageParams},
    mirror::MirrorClient,
    replication::Replicator,
    store::{BlogStore, StoreError},
};


const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<BlogStore>>,
    pub replicator: Arc<Replicator>,
}

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
    details: Map<String, Value>,
}

impl ApiError {
    fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status,
            details: Map::new(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal", StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        ApiError::internal(value.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    details: Map<String, Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S>,
    <axum::Json<T> as FromRequest<S>>::Rejection: std::fmt::Display,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_request(e.to_string()))?;
        Ok(Self(value))
    }
}

#[derive(Serialize)]
struct BlogPostPage {
    items: Vec<BlogPost>,
    total: u64,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Deserialize)]
struct ListBlogPostsQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

fn page_params(query: ListBlogPostsQuery) -> Result<PageParams, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit < 1 || limit > MAX_PAGE_LIMIT {
        return Err(ApiError::invalid_request(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(PageParams {
        limit,
        offset: query.offset.unwrap_or(0),
    })
}

pub fn build_router(config: Config, store: Arc<Mutex<BlogStore>>) -> Router {
    let replicator = Replicator::new(MirrorClient::new(&config.mirror_api));

    let app_state = AppState {
        store,
        replicator: Arc::new(replicator),
    };

    let api = Router::new()
        .route("/health", get(health))
        .route("/blog", post(create_blog_post).get(list_blog_posts))
        .route(
            "/blog/:post_id",
            get(get_blog_post)
                .patch(update_blog_post)
                .delete(delete_blog_post),
        );

    Router::new()
        .nest("/api/v1", api)
        .fallback(fallback_not_found)
        .layer(Extension(app_state))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::version::VERSION,
    }))
}

async fn create_blog_post(
    Extension(state): Extension<AppState>,
    ApiJson(post): ApiJson<NewBlogPost>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    // The snapshot save is the commit; the mirror only ever sees committed writes.
    let created = {
        let mut store = state.store.lock().await;
        store.create(&post)?
    };
    state.replicator.mirror_created(post, &created).await;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_blog_posts(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListBlogPostsQuery>,
) -> Result<Json<BlogPostPage>, ApiError> {
    let page = page_params(query)?;

    // Reads replay to the mirror before the primary lookup, from request
    // params alone.
    state.replicator.mirror_list(page).await;

    let store = state.store.lock().await;
    let (items, total) = store.list(page);
    Ok(Json(BlogPostPage {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

async fn get_blog_post(
    Extension(state): Extension<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<BlogPost>, ApiError> {
    state.replicator.mirror_retrieve(post_id).await;

    let store = state.store.lock().await;
    let post = store
        .get(post_id)
        .ok_or_else(|| ApiError::not_found(format!("blog post not found: {post_id}")))?;
    Ok(Json(post))
}

async fn update_blog_post(
    Extension(state): Extension<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(patch): ApiJson<BlogPostPatch>,
) -> Result<Json<BlogPost>, ApiError> {
    let updated = {
        let mut store = state.store.lock().await;
        store.update(post_id, &patch)?
    };
    let Some(updated) = updated else {
        return Err(ApiError::not_found(format!(
            "blog post not found: {post_id}"
        )));
    };
    state
        .replicator
        .mirror_updated(post_id, patch, &updated)
        .await;
    Ok(Json(updated))
}

async fn delete_blog_post(
    Extension(state): Extension<AppState>,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = {
        let mut store = state.store.lock().await;
        store.delete(post_id)?
    };
    if !deleted {
        return Err(ApiError::not_found(format!(
            "blog post not found: {post_id}"
        )));
    }
    state.replicator.mirror_deleted(post_id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn fallback_not_found() -> ApiError {
    ApiError::not_found("not found")
}
