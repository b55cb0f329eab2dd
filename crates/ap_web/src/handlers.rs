use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use ap_core::{ContentType, FileInfo, HistoryPage, InputData, NewHistoryRecord};
use ap_inference::analysis::{ConversationRequest, DocumentRequest, ImageRequest, UrlRequest};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, CurrentUser};
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 100;
const DASHBOARD_RECENT: usize = 5;
const HISTORY_PAGE_LIMIT: usize = 50;

const MISSING_FIELDS: &str = "Missing required fields: content_type, input_data, or output_data";

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub async fn analyze_conversation(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: std::result::Result<Json<ConversationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let analysis = state
        .analysis
        .analyze_conversation(user.id(), &request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to analyze conversation"))?;
    Ok(Json(analysis))
}

pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let analysis = state
        .analysis
        .analyze_image(user.id(), &request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to analyze image"))?;
    Ok(Json(analysis))
}

pub async fn analyze_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: std::result::Result<Json<DocumentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let summary = state
        .analysis
        .analyze_document(user.id(), &request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to analyze document"))?;
    Ok(Json(summary))
}

pub async fn analyze_url(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let summary = state
        .analysis
        .analyze_url(user.id(), &request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to analyze URL"))?;
    Ok(Json(summary))
}

/// History entry as posted by clients; every field is checked by hand so a
/// missing one gets the same message
#[derive(Debug, Default, Deserialize)]
pub struct SaveHistoryBody {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub input_data: Option<InputData>,
    /// Stored as text; non-string JSON is serialized
    #[serde(default)]
    pub output_data: Option<Value>,
    #[serde(default)]
    pub file_info: Option<FileInfo>,
}

impl SaveHistoryBody {
    fn into_record(self) -> ApiResult<NewHistoryRecord> {
        let content_type = self.content_type.filter(|t| !t.trim().is_empty());
        let output_data = match self.output_data {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text).filter(|t| !t.is_empty()),
            Some(other) => Some(other.to_string()),
        };

        let (Some(content_type), Some(input_data), Some(output_data)) =
            (content_type, self.input_data, output_data)
        else {
            return Err(ApiError::bad_request(MISSING_FIELDS));
        };

        let content_type = content_type
            .parse::<ContentType>()
            .map_err(|e| ApiError::from_error(e, "Failed to save to history"))?;

        Ok(NewHistoryRecord {
            content_type,
            input_data,
            output_data,
            file_info: self.file_info,
        })
    }
}

pub async fn save_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    payload: std::result::Result<Json<SaveHistoryBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let record = body(payload)?.into_record()?;
    let saved = state
        .analysis
        .history()
        .save(&user_id, record)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to save to history"))?;
    tracing::info!(id = %saved.id, content_type = %saved.content_type, "💾 History item saved");
    Ok(Json(json!({ "success": true, "data": saved })))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub limit: Option<String>,
    pub id: Option<String>,
}

/// Leading digits of `raw`, like a lenient integer parse; anything unusable
/// falls back to the default
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.map(|s| {
        s.trim()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
    })
    .and_then(|digits| digits.parse::<usize>().ok())
    .filter(|&limit| limit > 0)
    .unwrap_or(DEFAULT_HISTORY_LIMIT)
    .min(MAX_HISTORY_LIMIT)
}

fn parse_type_filter(raw: Option<&str>) -> ApiResult<Option<ContentType>> {
    raw.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse::<ContentType>)
        .transpose()
        .map_err(|e| ApiError::from_error(e, "Failed to fetch history"))
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let content_type = parse_type_filter(query.content_type.as_deref())?;
    let limit = parse_limit(query.limit.as_deref());
    let page = state
        .analysis
        .history()
        .list(&user_id, limit, content_type)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to fetch history"))?;
    Ok(Json(json!({
        "success": true,
        "data": page.data,
        "count": page.count,
        "hasMore": page.has_more,
    })))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("History ID is required"))?;

    let deleted = state
        .analysis
        .history()
        .delete(&user_id, &id)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to delete history item"))?;
    if !deleted {
        tracing::warn!(%id, "history item not found for user");
        return Err(ApiError::internal("Failed to delete history item"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let deleted = state
        .analysis
        .history()
        .clear(&user_id)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to clear history"))?;
    tracing::info!(deleted, "🧹 History cleared");
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.analysis.model_name(),
    }))
}

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": "AI Playground",
        "description": "Analyze conversations, images, documents and web pages",
        "routes": [
            "/api/analyze-conversation",
            "/api/analyze-image",
            "/api/analyze-document",
            "/api/analyze-url",
            "/api/content-history",
        ],
    }))
}

pub async fn sign_in() -> impl IntoResponse {
    Json(json!({
        "message": "Send your access token as a Bearer token or in the ap_session cookie",
    }))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let recent = state
        .analysis
        .history()
        .list(&user_id, DASHBOARD_RECENT, None)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to fetch history"))?;
    Ok(Json(json!({
        "user": user_id,
        "model": state.analysis.model_name(),
        "recent": recent,
    })))
}

/// Anonymous visitors get an empty page rather than an error
pub async fn history_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let page = match user.id() {
        Some(user_id) => state
            .analysis
            .history()
            .list(user_id, HISTORY_PAGE_LIMIT, None)
            .await
            .map_err(|e| ApiError::from_error(e, "Failed to fetch history"))?,
        None => HistoryPage::default(),
    };
    Ok(Json(page))
}
