//! Route handlers.
//!
//! Each handler validates its parameters, runs one store query and maps any
//! failure to a fixed [`ApiError`] message.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeFile;
use tracing::debug;

use crate::error::{ApiError, Error};
use crate::faces::FaceImages;
use crate::model::{ActivityEvent, LocationVisits, PersonFirstSeen, Profile, Record};
use crate::storage::queries::normalize_param;
use crate::storage::{Store, TimelineQuery};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Everything a request needs.
#[derive(Debug)]
pub struct AppState {
    /// The campus database.
    pub store: Store,
    /// The face image directory.
    pub faces: FaceImages,
}

impl AppState {
    /// Bundle the store and face images into shared state.
    #[must_use]
    pub fn shared(store: Store, faces: FaceImages) -> SharedState {
        Arc::new(Self { store, faces })
    }
}

/// `{count}` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    /// Number of distinct values.
    pub count: i64,
}

/// `/search` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching profiles.
    pub profiles: Vec<Profile>,
}

/// `/mysql/data/top-locations` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopLocationsResponse {
    /// At most three rooms, busiest first.
    pub top_locations: Vec<LocationVisits>,
}

/// `/mysql/data/top-persons` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopPersonsResponse {
    /// At most five persons.
    pub top_persons: Vec<PersonFirstSeen>,
}

/// `/mysql/activity-timeline` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    /// The trimmed person id that was asked for.
    pub person_id: String,
    /// Events, newest raw timestamp first.
    pub timeline: Vec<ActivityEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineParams {
    person_id: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

pub(crate) async fn list_profiles(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    debug!("Listing profiles");
    let profiles = state
        .store
        .profiles()
        .await
        .map_err(ApiError::backend("Failed to fetch profiles"))?;
    Ok(Json(profiles))
}

pub(crate) async fn list_activity(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Record>>, ApiError> {
    debug!("Listing activity rows");
    let rows = state
        .store
        .activity_rows()
        .await
        .map_err(ApiError::backend("Failed to fetch data"))?;
    Ok(Json(rows))
}

pub(crate) async fn unique_entities_count(
    State(state): State<SharedState>,
) -> Result<Json<CountResponse>, ApiError> {
    debug!("Counting unique entities");
    let count = state
        .store
        .count_unique_persons()
        .await
        .map_err(ApiError::backend("Failed to calculate unique entity count"))?;
    Ok(Json(CountResponse { count }))
}

pub(crate) async fn unique_device_hashes_count(
    State(state): State<SharedState>,
) -> Result<Json<CountResponse>, ApiError> {
    debug!("Counting unique device hashes");
    let count = state
        .store
        .count_unique_device_hashes()
        .await
        .map_err(ApiError::backend("Failed to count unique device hashes"))?;
    Ok(Json(CountResponse { count }))
}

pub(crate) async fn search(
    State(state): State<SharedState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    const MISSING_Q: &str = "Missing query parameter `q`";

    let Query(params) = params.map_err(|rejection| {
        debug!("Rejected search query: {rejection}");
        ApiError::BadRequest(MISSING_Q)
    })?;
    let term = normalize_param(params.q.as_deref()).ok_or(ApiError::BadRequest(MISSING_Q))?;

    debug!("Searching for {:?}", term);
    let profiles = state
        .store
        .search_profiles(term)
        .await
        .map_err(ApiError::backend("Search failed"))?;
    Ok(Json(SearchResponse { profiles }))
}

pub(crate) async fn face_image(
    State(state): State<SharedState>,
    Path(face_id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    const NOT_FOUND: &str = "Face image not found";

    let face_id = face_id.trim();
    if face_id.is_empty() {
        return Err(ApiError::BadRequest("Missing faceId"));
    }

    debug!("Looking up face {}", face_id);
    let path = state
        .faces
        .resolve(face_id)
        .await
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let response = ServeFile::new(&path)
        .try_call(request)
        .await
        .map_err(|e| ApiError::backend("Failed to read face image")(Error::Io(e)))?;

    // Removed or made unreadable since it was resolved
    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    Ok(response.into_response())
}

pub(crate) async fn top_locations(
    State(state): State<SharedState>,
) -> Result<Json<TopLocationsResponse>, ApiError> {
    debug!("Fetching top locations");
    let top_locations = state
        .store
        .top_locations()
        .await
        .map_err(ApiError::backend("Failed to fetch top locations"))?;
    Ok(Json(TopLocationsResponse { top_locations }))
}

pub(crate) async fn top_persons(
    State(state): State<SharedState>,
) -> Result<Json<TopPersonsResponse>, ApiError> {
    debug!("Fetching top persons");
    let top_persons = state
        .store
        .top_persons()
        .await
        .map_err(ApiError::backend("Failed to fetch top persons"))?;
    Ok(Json(TopPersonsResponse { top_persons }))
}

pub(crate) async fn activity_timeline(
    State(state): State<SharedState>,
    params: Result<Query<TimelineParams>, QueryRejection>,
) -> Result<Json<TimelineResponse>, ApiError> {
    const MISSING_PERSON_ID: &str = "Missing required query parameter `person_id`";

    let Query(params) = params.map_err(|rejection| {
        debug!("Rejected timeline query: {rejection}");
        ApiError::BadRequest(MISSING_PERSON_ID)
    })?;
    let query = TimelineQuery::new(
        params.person_id.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
    )
    .ok_or(ApiError::BadRequest(MISSING_PERSON_ID))?;

    debug!(
        "Fetching timeline for {} (start={:?}, end={:?})",
        query.person_id, query.start, query.end
    );
    let person_id = query.person_id.clone();
    let timeline = state
        .store
        .activity_timeline(query)
        .await
        .map_err(ApiError::backend("Failed to fetch activity timeline"))?;
    Ok(Json(TimelineResponse {
        person_id,
        timeline,
    }))
}
