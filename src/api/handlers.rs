use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::Prediction,
    services::recommender::RatingUpdate,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct KnownIdsResponse {
    pub count: usize,
    pub items: Vec<String>,
}

impl From<Vec<String>> for KnownIdsResponse {
    fn from(items: Vec<String>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub results: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
pub struct RatedFilmRequest {
    pub film: String,
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user: String,
    pub ratings: Vec<RatedFilmRequest>,
}

/// Parameters packed into the single path segment of the legacy endpoint,
/// e.g. `user=abc&item_list=1,2&rating_list=4.0,3.5`
fn parse_packed_query(segment: &str) -> AppResult<RatingUpdate> {
    let mut user = None;
    let mut item_list = None;
    let mut rating_list = None;

    for pair in segment.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "user" => user = Some(value),
            "item_list" => item_list = Some(value),
            "rating_list" => rating_list = Some(value),
            _ => {}
        }
    }

    let missing = |name: &str| AppError::InvalidInput(format!("missing {}", name));

    RatingUpdate::from_csv(
        user.ok_or_else(|| missing("user"))?,
        item_list.ok_or_else(|| missing("item_list"))?,
        rating_list.ok_or_else(|| missing("rating_list"))?,
    )
}

// Handlers

/// Describes the loaded model
pub async fn root(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.model.description().await,
    })
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Members the model has factors for
pub async fn model_users(State(state): State<AppState>) -> Json<KnownIdsResponse> {
    Json(state.model.known_users().await.into())
}

/// Films the model has factors for
pub async fn model_items(State(state): State<AppState>) -> Json<KnownIdsResponse> {
    Json(state.model.known_items().await.into())
}

/// Update-then-recommend with everything packed into the path
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> AppResult<Json<RecommendationsResponse>> {
    let update = parse_packed_query(&query)?;
    recommend_for(&state, update).await
}

/// Update-then-recommend from a JSON body
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationsResponse>> {
    let ratings = request
        .ratings
        .into_iter()
        .map(|r| (r.film, r.rating))
        .collect();
    let update = RatingUpdate::new(&request.user, ratings)?;
    recommend_for(&state, update).await
}

async fn recommend_for(
    state: &AppState,
    update: RatingUpdate,
) -> AppResult<Json<RecommendationsResponse>> {
    tracing::info!(
        user = %update.user,
        ratings = update.ratings.len(),
        "Processing recommendation request"
    );

    let recommendations = state
        .model
        .update_and_recommend(&update, state.update_params, state.bound_ratings)
        .await?;

    Ok(Json(RecommendationsResponse {
        results: recommendations.predictions,
    }))
}
