//! Biased matrix-factorization model
//!
//! A rating is predicted as `mu + b_u + b_i + p_u · q_i`. The model is trained
//! offline and loaded from JSON; at serving time only a single user's bias and
//! factors are fitted against the frozen item factors.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::ArtifactError, models::Prediction};

/// Bias and latent factors for one user or item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatentFactors {
    pub id: String,
    #[serde(default)]
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// On-disk representation of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub name: Option<String>,
    pub n_factors: usize,
    pub global_mean: f64,
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
    #[serde(default = "default_max_rating")]
    pub max_rating: f64,
    #[serde(default = "default_reg")]
    pub reg: f64,
    #[serde(default = "default_init_std")]
    pub init_std: f64,
    pub users: Vec<LatentFactors>,
    pub items: Vec<LatentFactors>,
}

fn default_min_rating() -> f64 {
    0.5
}

fn default_max_rating() -> f64 {
    5.0
}

fn default_reg() -> f64 {
    0.005
}

fn default_init_std() -> f64 {
    0.1
}

/// Online update hyperparameters
#[derive(Debug, Clone, Copy)]
pub struct UpdateParams {
    pub learning_rate: f64,
    pub n_epochs: usize,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            n_epochs: 10,
        }
    }
}

/// Result of fitting one user against new ratings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    /// Observations used for the update
    pub applied: usize,
    /// Rated items the model has no factors for
    pub skipped: Vec<String>,
    pub new_user: bool,
}

/// Rows of factors with an id lookup, in insertion order
#[derive(Debug, Clone, Default)]
struct FactorTable {
    rows: Vec<LatentFactors>,
    index: HashMap<String, usize>,
}

impl FactorTable {
    fn build(rows: Vec<LatentFactors>, n_factors: usize, kind: &str) -> Result<Self, ArtifactError> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.factors.len() != n_factors {
                return Err(ArtifactError::Shape(format!(
                    "{} {} has {} factors, expected {}",
                    kind,
                    row.id,
                    row.factors.len(),
                    n_factors
                )));
            }
            if index.insert(row.id.clone(), i).is_some() {
                return Err(ArtifactError::Shape(format!("duplicate {} {}", kind, row.id)));
            }
        }
        Ok(Self { rows, index })
    }

    fn get(&self, id: &str) -> Option<&LatentFactors> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut LatentFactors> {
        self.index.get(id).map(|&i| &mut self.rows[i])
    }

    fn insert(&mut self, row: LatentFactors) -> &mut LatentFactors {
        let i = self.rows.len();
        self.index.insert(row.id.clone(), i);
        self.rows.push(row);
        &mut self.rows[i]
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn ids(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.id.clone()).collect()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct FactorModel {
    name: String,
    n_factors: usize,
    global_mean: f64,
    min_rating: f64,
    max_rating: f64,
    reg: f64,
    init_std: f64,
    users: FactorTable,
    items: FactorTable,
}

impl FactorModel {
    pub fn from_model_file(file: ModelFile) -> Result<Self, ArtifactError> {
        if file.n_factors == 0 {
            return Err(ArtifactError::Shape("n_factors must be positive".to_string()));
        }
        if !(file.min_rating < file.max_rating) {
            return Err(ArtifactError::Shape(format!(
                "invalid rating scale {}..{}",
                file.min_rating, file.max_rating
            )));
        }

        let users = FactorTable::build(file.users, file.n_factors, "user")?;
        let items = FactorTable::build(file.items, file.n_factors, "item")?;

        Ok(Self {
            name: file.name.unwrap_or_else(|| "FactorModel".to_string()),
            n_factors: file.n_factors,
            global_mean: file.global_mean,
            min_rating: file.min_rating,
            max_rating: file.max_rating,
            reg: file.reg,
            init_std: file.init_std,
            users,
            items,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ModelFile =
            serde_json::from_str(&contents).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let model = Self::from_model_file(file)?;
        tracing::info!(
            path = %path.display(),
            users = model.users.len(),
            items = model.items.len(),
            n_factors = model.n_factors,
            "Model loaded"
        );
        Ok(model)
    }

    pub fn known_users(&self) -> Vec<String> {
        self.users.ids()
    }

    pub fn known_items(&self) -> Vec<String> {
        self.items.ids()
    }

    pub fn knows_item(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn rating_scale(&self) -> (f64, f64) {
        (self.min_rating, self.max_rating)
    }

    fn clamp(&self, rating: f64) -> f64 {
        rating.clamp(self.min_rating, self.max_rating)
    }

    fn raw_prediction(&self, user: Option<&LatentFactors>, item: &LatentFactors) -> f64 {
        match user {
            Some(user) => self.global_mean + user.bias + item.bias + dot(&user.factors, &item.factors),
            None => self.global_mean + item.bias,
        }
    }

    /// Predicted rating; unknown users fall back to the item baseline
    pub fn predict(&self, user: &str, item: &str, bound: bool) -> Option<f64> {
        let item = self.items.get(item)?;
        let prediction = self.raw_prediction(self.users.get(user), item);
        Some(if bound { self.clamp(prediction) } else { prediction })
    }

    /// Fits `user`'s bias and factors to `observations` with plain SGD
    ///
    /// Item parameters are left untouched. An unseen user is added with a
    /// zero bias and small random factors, but only if at least one rated
    /// item is known.
    pub fn update_user<R: Rng>(
        &mut self,
        user: &str,
        observations: &[(String, f64)],
        params: UpdateParams,
        rng: &mut R,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut known = Vec::with_capacity(observations.len());

        for (item, rating) in observations {
            match self.items.index.get(item.as_str()) {
                Some(&i) => known.push((i, *rating)),
                None => summary.skipped.push(item.clone()),
            }
        }

        summary.applied = known.len();
        if known.is_empty() {
            return summary;
        }

        if !self.users.contains(user) {
            let spread = self.init_std * 3f64.sqrt();
            let factors = (0..self.n_factors)
                .map(|_| if spread > 0.0 { rng.gen_range(-spread..spread) } else { 0.0 })
                .collect();
            self.users.insert(LatentFactors {
                id: user.to_string(),
                bias: 0.0,
                factors,
            });
            summary.new_user = true;
        }

        let lr = params.learning_rate;
        let reg = self.reg;
        let global_mean = self.global_mean;
        let items = &self.items.rows;
        let Some(row) = self.users.get_mut(user) else {
            return summary;
        };

        for _ in 0..params.n_epochs {
            for &(i, rating) in &known {
                let item = &items[i];
                let prediction = global_mean + row.bias + item.bias + dot(&row.factors, &item.factors);
                let err = rating - prediction;

                row.bias += lr * (err - reg * row.bias);
                for (p, q) in row.factors.iter_mut().zip(&item.factors) {
                    *p += lr * (err * q - reg * *p);
                }
            }
        }

        summary
    }

    /// Predictions for every known item not in `exclude`, best first
    ///
    /// `amount` caps the number of predictions returned; `None` returns all.
    pub fn recommend(
        &self,
        user: &str,
        exclude: &HashSet<&str>,
        amount: Option<usize>,
        bound: bool,
    ) -> Vec<Prediction> {
        let user_row = self.users.get(user);

        let mut predictions: Vec<Prediction> = self
            .items
            .rows
            .iter()
            .filter(|item| !exclude.contains(item.id.as_str()))
            .map(|item| {
                let raw = self.raw_prediction(user_row, item);
                Prediction {
                    member: user.to_string(),
                    film: item.id.clone(),
                    prediction: if bound { self.clamp(raw) } else { raw },
                }
            })
            .collect();

        predictions.sort_by(|a, b| b.prediction.total_cmp(&a.prediction));
        if let Some(amount) = amount {
            predictions.truncate(amount);
        }

        predictions
    }
}

impl fmt::Display for FactorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(n_factors={}, users={}, items={}, rating_scale={}..{}, reg={})",
            self.name,
            self.n_factors,
            self.users.len(),
            self.items.len(),
            self.min_rating,
            self.max_rating,
            self.reg
        )
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
