use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::Prediction,
    services::recommender::{FactorModel, UpdateParams},
};

/// New ratings from one member
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub user: String,
    pub ratings: Vec<(String, f64)>,
}

impl RatingUpdate {
    /// Pairs comma-separated film ids with comma-separated ratings by position
    pub fn from_csv(user: &str, item_list: &str, rating_list: &str) -> AppResult<Self> {
        let items = split_csv(item_list);
        let raw_ratings = split_csv(rating_list);

        if items.len() != raw_ratings.len() {
            return Err(AppError::InvalidInput(format!(
                "got {} films but {} ratings",
                items.len(),
                raw_ratings.len()
            )));
        }

        if let Some(position) = items.iter().position(|item| item.is_empty()) {
            return Err(AppError::InvalidInput(format!(
                "film at position {} is empty",
                position + 1
            )));
        }

        let ratings = raw_ratings
            .into_iter()
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| AppError::InvalidInput(format!("invalid rating '{}'", raw)))
            })
            .collect::<AppResult<Vec<f64>>>()?;

        Self::new(
            user,
            items
                .into_iter()
                .map(str::to_string)
                .zip(ratings)
                .collect(),
        )
    }

    pub fn new(user: &str, ratings: Vec<(String, f64)>) -> AppResult<Self> {
        let user = user.trim();
        if user.is_empty() {
            return Err(AppError::InvalidInput("user must not be empty".to_string()));
        }
        if ratings.is_empty() {
            return Err(AppError::InvalidInput("no ratings supplied".to_string()));
        }
        if let Some((film, rating)) = ratings.iter().find(|(_, r)| !r.is_finite()) {
            return Err(AppError::InvalidInput(format!(
                "rating {} for {} is not a number",
                rating, film
            )));
        }

        Ok(Self {
            user: user.to_string(),
            ratings,
        })
    }
}

/// Splits on commas keeping positions; a single trailing comma is tolerated
fn split_csv(list: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = list.split(',').map(str::trim).collect();
    if fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

/// Outcome of an update-then-recommend transaction
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub applied: usize,
    pub skipped: Vec<String>,
    pub predictions: Vec<Prediction>,
}

/// Owned, shareable handle to the serving model
///
/// Update+predict runs as one transaction under the lock, so concurrent
/// requests are queued rather than interleaved.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<Mutex<FactorModel>>,
}

impl ModelHandle {
    pub fn new(model: FactorModel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    pub async fn description(&self) -> String {
        self.inner.lock().await.to_string()
    }

    pub async fn known_users(&self) -> Vec<String> {
        self.inner.lock().await.known_users()
    }

    pub async fn known_items(&self) -> Vec<String> {
        self.inner.lock().await.known_items()
    }

    /// Fits the member to their ratings, then ranks every other known film
    pub async fn update_and_recommend(
        &self,
        update: &RatingUpdate,
        params: UpdateParams,
        bound_ratings: bool,
    ) -> AppResult<Recommendations> {
        let mut model = self.inner.lock().await;

        let summary = model.update_user(
            &update.user,
            &update.ratings,
            params,
            &mut rand::thread_rng(),
        );

        if summary.applied == 0 {
            return Err(AppError::InvalidInput(
                "none of the rated films are known to the model".to_string(),
            ));
        }

        if !summary.skipped.is_empty() {
            tracing::warn!(
                user = %update.user,
                skipped = summary.skipped.len(),
                "Ignored ratings for films unknown to the model"
            );
        }

        let rated: HashSet<&str> = update.ratings.iter().map(|(film, _)| film.as_str()).collect();
        let predictions = model.recommend(&update.user, &rated, None, bound_ratings);

        tracing::info!(
            user = %update.user,
            applied = summary.applied,
            new_user = summary.new_user,
            predictions = predictions.len(),
            "Recommendations generated"
        );

        Ok(Recommendations {
            applied: summary.applied,
            skipped: summary.skipped,
            predictions,
        })
    }
}
