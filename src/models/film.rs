use serde::{Deserialize, Serialize};

/// A single rendition of a poster image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Image {
    #[serde(default)]
    pub sizes: Vec<ImageSize>,
}

impl Image {
    /// Sizes are listed smallest first
    pub fn largest_url(&self) -> Option<&str> {
        self.sizes.last().map(|s| s.url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    #[serde(rename = "type", default)]
    pub link_type: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContributorSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Film summary as it appears in a member's watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub directors: Vec<ContributorSummary>,
    #[serde(default)]
    pub poster: Option<Image>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WatchlistEntry {
    pub fn poster_url(&self) -> Option<&str> {
        self.poster.as_ref().and_then(Image::largest_url)
    }

    pub fn letterboxd_url(&self) -> Option<&str> {
        self.links.first().map(|l| l.url.as_str())
    }

    pub fn directed_by(&self) -> String {
        join_names(&self.directors)
    }
}

/// Catalog record with the metadata used to filter and rank picks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub run_time: Option<u32>,
    /// Average Letterboxd rating
    #[serde(default)]
    pub rating: Option<f64>,
    /// Popularity rank, lower is more popular
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub directors: Vec<ContributorSummary>,
    #[serde(default)]
    pub poster: Option<Image>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Film {
    pub fn poster_url(&self) -> Option<&str> {
        self.poster.as_ref().and_then(Image::largest_url)
    }

    pub fn letterboxd_url(&self) -> Option<&str> {
        self.links.first().map(|l| l.url.as_str())
    }

    pub fn has_country(&self, code: &str) -> bool {
        self.countries
            .iter()
            .any(|c| c.code.eq_ignore_ascii_case(code))
    }

    pub fn has_any_genre(&self, genres: &[String]) -> bool {
        self.genres
            .iter()
            .any(|g| genres.iter().any(|wanted| wanted.eq_ignore_ascii_case(&g.name)))
    }
}

fn join_names(people: &[ContributorSummary]) -> String {
    people
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_entry_deserialization() {
        let json = r#"{
            "id": "2bbs",
            "name": "Paris, Texas",
            "releaseYear": 1984,
            "directors": [{"id": "a1", "name": "Wim Wenders"}],
            "poster": {"sizes": [
                {"width": 70, "height": 105, "url": "https://a.ltrbxd.com/small.jpg"},
                {"width": 1000, "height": 1500, "url": "https://a.ltrbxd.com/large.jpg"}
            ]},
            "links": [{"type": "letterboxd", "url": "https://letterboxd.com/film/paris-texas/"}]
        }"#;

        let entry: WatchlistEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "2bbs");
        assert_eq!(entry.release_year, Some(1984));
        assert_eq!(entry.directed_by(), "Wim Wenders");
        assert_eq!(entry.poster_url(), Some("https://a.ltrbxd.com/large.jpg"));
        assert_eq!(
            entry.letterboxd_url(),
            Some("https://letterboxd.com/film/paris-texas/")
        );
    }

    #[test]
    fn test_watchlist_entry_sparse_fields() {
        let entry: WatchlistEntry =
            serde_json::from_str(r#"{"id": "x", "name": "Untitled"}"#).unwrap();
        assert_eq!(entry.release_year, None);
        assert_eq!(entry.poster_url(), None);
        assert_eq!(entry.directed_by(), "");
    }

    #[test]
    fn test_film_country_and_genre_matching() {
        let json = r#"{
            "id": "f1",
            "name": "City of God",
            "releaseYear": 2002,
            "runTime": 130,
            "rating": 4.5,
            "popularity": 120,
            "countries": [{"code": "BR", "name": "Brazil"}],
            "genres": [{"name": "Crime"}, {"name": "Drama"}]
        }"#;

        let film: Film = serde_json::from_str(json).unwrap();
        assert!(film.has_country("BR"));
        assert!(film.has_country("br"));
        assert!(!film.has_country("US"));
        assert!(film.has_any_genre(&["Drama".to_string()]));
        assert!(!film.has_any_genre(&["Horror".to_string()]));
    }
}
