use super::{JsonBody, OwnerIdentity, Result, WebError};
use crate::core::{JournalError, PermanentReference, ResolutionPair, StagedFile};
use crate::journal::{JournalService, LogDetails, LogView, Profile, ProfileDetails, TravelLog};
use crate::proxy::{ImageImporter, ImageResult, ImageSearch, Place, PlaceQuery, PlaceSearch};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, event};

// App State
#[derive(Clone)]
pub struct AppState {
    pub journal: Arc<JournalService>,
    pub images: Arc<dyn ImageSearch>,
    pub places: Arc<dyn PlaceSearch>,
    pub importer: Arc<ImageImporter>,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/images", get(search_images))
        .route("/save-image", post(save_image))
        .route("/search", get(search_places))
        .route("/resolve", post(resolve_references))
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/:id", get(get_log).put(update_log).delete(delete_log))
        .route(
            "/profile",
            get(get_profile).post(create_profile).put(update_profile),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Proxy failures keep configuration problems visible and hide upstream detail.
fn proxy_failure(err: JournalError, public_message: &str) -> WebError {
    match err {
        JournalError::Configuration(_) | JournalError::Validation(_) => WebError::Journal(err),
        other => {
            event!(Level::ERROR, error = %other, "{}", public_message);
            WebError::Internal(public_message.to_string())
        }
    }
}

// Image search

#[derive(Deserialize)]
pub struct ImageSearchParams {
    location: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ImageSearchResponse {
    pub images: Vec<ImageResult>,
}

pub async fn search_images(
    State(state): State<AppState>,
    Query(params): Query<ImageSearchParams>,
) -> Result<Json<ImageSearchResponse>> {
    let location = params
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| WebError::Input("Missing \"location\" query parameter.".to_string()))?;

    let images = state
        .images
        .search(&location)
        .await
        .map_err(|e| proxy_failure(e, "Failed to fetch images."))?;
    Ok(Json(ImageSearchResponse { images }))
}

// Suggested image import

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveImageRequest {
    image_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveImageResponse {
    pub message: String,
    pub new_s3_url: PermanentReference,
}

pub async fn save_image(
    State(state): State<AppState>,
    identity: Option<OwnerIdentity>,
    payload: std::result::Result<Json<SaveImageRequest>, JsonRejection>,
) -> Result<Json<SaveImageResponse>> {
    // an absent or unreadable body has no imageUrl either
    let image_url = payload
        .ok()
        .and_then(|Json(payload)| payload.image_url)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| WebError::Input("Missing \"imageUrl\" in request body.".to_string()))?;
    let OwnerIdentity(owner) = identity
        .ok_or_else(|| WebError::Unauthenticated("User is not authenticated.".to_string()))?;

    let reference = state
        .importer
        .import(&owner, &image_url)
        .await
        .map_err(|e| proxy_failure(e, "Failed to save image."))?;
    Ok(Json(SaveImageResponse {
        message: "Image saved successfully!".to_string(),
        new_s3_url: reference,
    }))
}

// Place search

#[derive(Deserialize)]
pub struct PlaceSearchParams {
    query: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct PlaceSearchResponse {
    pub places: Vec<Place>,
}

pub async fn search_places(
    State(state): State<AppState>,
    Query(params): Query<PlaceSearchParams>,
) -> Result<Json<PlaceSearchResponse>> {
    state.places.ensure_configured()?;
    let query = PlaceQuery::from_params(
        params.query.as_deref(),
        params.lat.as_deref(),
        params.lon.as_deref(),
    )?;

    let places = state
        .places
        .search(&query)
        .await
        .map_err(|e| proxy_failure(e, "Failed to search for locations."))?;
    Ok(Json(PlaceSearchResponse { places }))
}

// Reference resolution

#[derive(Deserialize)]
pub struct ResolveRequest {
    references: Vec<PermanentReference>,
}

#[derive(Serialize, Deserialize)]
pub struct ResolveResponse {
    pub pairs: Vec<ResolutionPair>,
}

pub async fn resolve_references(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    JsonBody(payload): JsonBody<ResolveRequest>,
) -> Json<ResolveResponse> {
    let pairs = state
        .journal
        .resolver()
        .resolve_all_for(&owner, &payload.references)
        .await;
    Json(ResolveResponse { pairs })
}

// Travel logs

/// A staged file as sent by the client; `data` is standard base64.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: String,
}

impl UploadedFile {
    fn into_staged(self) -> Result<StagedFile> {
        let bytes = STANDARD.decode(self.data.trim()).map_err(|e| {
            WebError::Input(format!("file '{}' is not valid base64: {e}", self.filename))
        })?;
        Ok(StagedFile {
            filename: self.filename,
            bytes,
            content_type: self.content_type,
        })
    }
}

fn stage_all(files: Vec<UploadedFile>) -> Result<Vec<StagedFile>> {
    files.into_iter().map(UploadedFile::into_staged).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    #[serde(flatten)]
    details: LogDetails,
    /// References returned by `/save-image`.
    #[serde(default)]
    imported_image_urls: Vec<PermanentReference>,
    #[serde(default)]
    new_images: Vec<UploadedFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogRequest {
    #[serde(flatten)]
    details: LogDetails,
    /// Required: an absent list would read as "remove every image".
    existing_image_urls: Vec<PermanentReference>,
    #[serde(default)]
    imported_image_urls: Vec<PermanentReference>,
    #[serde(default)]
    new_images: Vec<UploadedFile>,
}

#[derive(Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogView>,
}

pub async fn list_logs(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<Json<LogsResponse>> {
    let logs = state.journal.dashboard(&owner).await?;
    Ok(Json(LogsResponse { logs }))
}

pub async fn create_log(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    JsonBody(payload): JsonBody<CreateLogRequest>,
) -> Result<(StatusCode, Json<TravelLog>)> {
    let staged = stage_all(payload.new_images)?;
    let log = state
        .journal
        .create_log(&owner, payload.details, payload.imported_image_urls, staged)
        .await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn get_log(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(id): Path<String>,
) -> Result<Json<LogView>> {
    Ok(Json(state.journal.view_log(&owner, &id).await?))
}

pub async fn update_log(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateLogRequest>,
) -> Result<Json<TravelLog>> {
    let staged = stage_all(payload.new_images)?;
    let log = state
        .journal
        .update_log(
            &owner,
            &id,
            payload.details,
            payload.existing_image_urls,
            payload.imported_image_urls,
            staged,
        )
        .await?;
    Ok(Json(log))
}

pub async fn delete_log(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.journal.delete_log(&owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Profile

pub async fn get_profile(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<Json<Profile>> {
    let profile = state
        .journal
        .profile(&owner)
        .await?
        .ok_or_else(|| JournalError::EntryNotFound(format!("profile of {}", owner)))?;
    Ok(Json(profile))
}

pub async fn create_profile(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    JsonBody(details): JsonBody<ProfileDetails>,
) -> Result<(StatusCode, Json<Profile>)> {
    let profile = state.journal.create_profile(&owner, details).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    JsonBody(details): JsonBody<ProfileDetails>,
) -> Result<Json<Profile>> {
    Ok(Json(state.journal.update_profile(&owner, details).await?))
}
