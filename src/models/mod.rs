pub mod film;
pub mod rating;

pub use film::{ContributorSummary, Country, Film, Genre, Image, ImageSize, Link, WatchlistEntry};
pub use rating::{Prediction, RatedFilm, RatingEntry};

use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated Letterboxd listing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Cursor for the following page; absent on the last one
    #[serde(default)]
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_has_no_cursor() {
        let page: Page<WatchlistEntry> =
            serde_json::from_str(r#"{"items": [{"id": "a", "name": "A"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_page_with_cursor() {
        let page: Page<serde_json::Value> =
            serde_json::from_str(r#"{"items": [], "next": "start=100"}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next.as_deref(), Some("start=100"));
    }
}
