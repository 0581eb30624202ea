use crate::services::recommender::{ModelHandle, UpdateParams};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: ModelHandle,
    pub update_params: UpdateParams,
    pub bound_ratings: bool,
}

impl AppState {
    /// Creates state serving `model` with default update settings
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            update_params: UpdateParams::default(),
            bound_ratings: true,
        }
    }

    pub fn with_update_params(mut self, params: UpdateParams) -> Self {
        self.update_params = params;
        self
    }

    pub fn with_bound_ratings(mut self, bound: bool) -> Self {
        self.bound_ratings = bound;
        self
    }
}
