//! Serving-side recommendation model

pub mod handle;
pub mod model;

pub use handle::{ModelHandle, RatingUpdate, Recommendations};
pub use model::{FactorModel, LatentFactors, ModelFile, UpdateParams, UpdateSummary};
