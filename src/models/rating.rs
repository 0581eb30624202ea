use serde::{Deserialize, Serialize};

/// A member's logged film, with the rating if they gave one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingEntry {
    pub member: String,
    pub film: String,
    pub rating: Option<f64>,
}

/// Film summary returned by the `films/` endpoint when filtered by member
#[derive(Debug, Clone, Deserialize)]
pub struct RatedFilm {
    pub id: String,
    #[serde(default)]
    pub relationships: Vec<MemberFilmRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberFilmRelationship {
    #[serde(default)]
    pub relationship: Option<FilmRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilmRelationship {
    #[serde(default)]
    pub rating: Option<f64>,
}

impl RatedFilm {
    /// The first relationship belongs to the member the listing was filtered by
    pub fn into_rating(self, member: &str) -> RatingEntry {
        let rating = self
            .relationships
            .first()
            .and_then(|r| r.relationship.as_ref())
            .and_then(|r| r.rating);

        RatingEntry {
            member: member.to_string(),
            film: self.id,
            rating,
        }
    }
}

/// A predicted rating for one (member, film) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub member: String,
    pub film: String,
    pub prediction: f64,
}
