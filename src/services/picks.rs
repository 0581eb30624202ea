//! Turning raw model output and watchlists into something worth watching

use std::collections::{HashMap, HashSet};

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::{
    catalog::Catalog,
    models::{Film, Prediction, WatchlistEntry},
};

/// Constraints applied to candidate films; `None` disables a constraint
///
/// A film lacking the metadata a constraint looks at never passes it.
#[derive(Debug, Clone)]
pub struct PickFilter {
    pub release_year: Option<(i32, i32)>,
    pub runtime: Option<(u32, u32)>,
    pub popularity: Option<(u32, u32)>,
    pub average_rating: Option<(f64, f64)>,
    /// ISO-3166 alpha-2 code
    pub country: Option<String>,
    pub genres: Option<Vec<String>>,
    pub include_watchlist: bool,
}

impl Default for PickFilter {
    fn default() -> Self {
        Self {
            release_year: None,
            runtime: None,
            popularity: None,
            average_rating: None,
            country: None,
            genres: None,
            include_watchlist: true,
        }
    }
}

fn within<T: PartialOrd>(value: Option<T>, range: &Option<(T, T)>) -> bool {
    match range {
        None => true,
        Some((lo, hi)) => value.map_or(false, |v| *lo <= v && v <= *hi),
    }
}

impl PickFilter {
    pub fn accepts(&self, film: &Film) -> bool {
        within(film.release_year, &self.release_year)
            && within(film.run_time, &self.runtime)
            && within(film.popularity, &self.popularity)
            && within(film.rating, &self.average_rating)
            && self
                .country
                .as_deref()
                .map_or(true, |code| film.has_country(code))
            && self
                .genres
                .as_deref()
                .map_or(true, |genres| film.has_any_genre(genres))
    }
}

/// A catalog film with its prediction and ranking score
#[derive(Debug, Clone, Serialize)]
pub struct Pick {
    pub film: Film,
    pub prediction: f64,
    pub score: f64,
}

/// Ranks predictions against the catalog
///
/// The score rewards films the member is predicted to like more than the
/// crowd does: `prediction + (prediction - average)`. Films already rated,
/// absent from the catalog, or rejected by the filter are dropped; watchlisted
/// films are dropped unless the filter includes them.
pub fn rank_picks(
    predictions: Vec<Prediction>,
    catalog: &Catalog,
    rated: &HashSet<String>,
    watchlist: &HashSet<String>,
    filter: &PickFilter,
) -> Vec<Pick> {
    let mut picks: Vec<Pick> = predictions
        .into_iter()
        .filter(|p| !rated.contains(&p.film))
        .filter(|p| filter.include_watchlist || !watchlist.contains(&p.film))
        .filter_map(|p| {
            let film = catalog.get(&p.film)?;
            if !filter.accepts(film) {
                return None;
            }
            let score = match film.rating {
                Some(average) => p.prediction + (p.prediction - average),
                None => p.prediction,
            };
            Some(Pick {
                film: film.clone(),
                prediction: p.prediction,
                score,
            })
        })
        .collect();

    picks.sort_by(|a, b| b.score.total_cmp(&a.score));
    picks
}

pub fn random_pick<'a, R: Rng + ?Sized>(
    watchlist: &'a [WatchlistEntry],
    rng: &mut R,
) -> Option<&'a WatchlistEntry> {
    watchlist.choose(rng)
}

/// A watchlist pick with the catalog's blurb when one is known
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistPick<'a> {
    #[serde(flatten)]
    pub entry: &'a WatchlistEntry,
    pub tagline: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> WatchlistPick<'a> {
    pub fn new(entry: &'a WatchlistEntry, catalog: Option<&'a Catalog>) -> Self {
        let film = catalog.and_then(|catalog| catalog.get(&entry.id));
        Self {
            entry,
            tagline: film.and_then(|f| f.tagline.as_deref()),
            description: film.and_then(|f| f.description.as_deref()),
        }
    }
}

/// A film shared by several watchlists
#[derive(Debug, Clone, Serialize)]
pub struct SharedFilm {
    pub entry: WatchlistEntry,
    pub count: usize,
}

/// Films that appear in at least two of the given watchlists, most shared first
pub fn common_films(watchlists: &[Vec<WatchlistEntry>]) -> Vec<SharedFilm> {
    let mut shared: HashMap<&str, SharedFilm> = HashMap::new();

    for watchlist in watchlists {
        let unique: HashMap<&str, &WatchlistEntry> =
            watchlist.iter().map(|e| (e.id.as_str(), e)).collect();
        for (id, entry) in unique {
            shared
                .entry(id)
                .or_insert_with(|| SharedFilm {
                    entry: entry.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }

    let mut films: Vec<SharedFilm> = shared.into_values().filter(|f| f.count >= 2).collect();
    films.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.entry.name.cmp(&b.entry.name))
    });
    films
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Country;
    use rand::{rngs::StdRng, SeedableRng};

    fn film(id: &str, year: i32, runtime: u32, rating: Option<f64>, country: &str) -> Film {
        Film {
            id: id.to_string(),
            name: id.to_uppercase(),
            release_year: Some(year),
            run_time: Some(runtime),
            rating,
            popularity: Some(100),
            countries: vec![Country {
                code: country.to_string(),
                name: None,
            }],
            genres: Vec::new(),
            directors: Vec::new(),
            poster: None,
            links: Vec::new(),
            tagline: None,
            description: None,
        }
    }

    fn prediction(film: &str, value: f64) -> Prediction {
        Prediction {
            member: "m1".to_string(),
            film: film.to_string(),
            prediction: value,
        }
    }

    fn entry(id: &str, name: &str) -> WatchlistEntry {
        WatchlistEntry {
            id: id.to_string(),
            name: name.to_string(),
            release_year: None,
            directors: Vec::new(),
            poster: None,
            links: Vec::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            film("a", 1975, 120, Some(4.0), "US"),
            film("b", 2001, 95, Some(3.0), "BR"),
            film("c", 2015, 200, None, "GB"),
            film("d", 1960, 100, Some(4.5), "US"),
        ])
    }

    #[test]
    fn test_score_rewards_beating_the_average() {
        let picks = rank_picks(
            vec![prediction("a", 4.0), prediction("b", 3.8), prediction("c", 3.9)],
            &catalog(),
            &HashSet::new(),
            &HashSet::new(),
            &PickFilter::default(),
        );

        let ids: Vec<&str> = picks.iter().map(|p| p.film.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!((picks[0].score - 4.6).abs() < 1e-9);
        assert!((picks[2].score - 3.9).abs() < 1e-9);
    }

    #[test]
    fn test_drops_rated_and_uncatalogued() {
        let rated: HashSet<String> = ["a".to_string()].into_iter().collect();
        let picks = rank_picks(
            vec![prediction("a", 5.0), prediction("zzz", 5.0), prediction("d", 3.0)],
            &catalog(),
            &rated,
            &HashSet::new(),
            &PickFilter::default(),
        );
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].film.id, "d");
    }

    #[test]
    fn test_watchlist_exclusion() {
        let watchlist: HashSet<String> = ["b".to_string()].into_iter().collect();
        let predictions = || vec![prediction("a", 4.0), prediction("b", 4.0)];

        let included = rank_picks(predictions(), &catalog(), &HashSet::new(), &watchlist, &PickFilter::default());
        assert_eq!(included.len(), 2);

        let filter = PickFilter {
            include_watchlist: false,
            ..PickFilter::default()
        };
        let excluded = rank_picks(predictions(), &catalog(), &HashSet::new(), &watchlist, &filter);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].film.id, "a");
    }

    #[test]
    fn test_filter_ranges_and_country() {
        let catalog = catalog();
        let filter = PickFilter {
            release_year: Some((1970, 2010)),
            runtime: Some((60, 150)),
            ..PickFilter::default()
        };
        assert!(filter.accepts(catalog.get("a").unwrap()));
        assert!(filter.accepts(catalog.get("b").unwrap()));
        assert!(!filter.accepts(catalog.get("c").unwrap()));
        assert!(!filter.accepts(catalog.get("d").unwrap()));

        let filter = PickFilter {
            country: Some("br".to_string()),
            ..PickFilter::default()
        };
        assert!(filter.accepts(catalog.get("b").unwrap()));
        assert!(!filter.accepts(catalog.get("a").unwrap()));
    }

    #[test]
    fn test_missing_metadata_fails_active_filter() {
        let catalog = catalog();
        let filter = PickFilter {
            average_rating: Some((0.0, 5.0)),
            ..PickFilter::default()
        };
        assert!(!filter.accepts(catalog.get("c").unwrap()));

        let filter = PickFilter {
            genres: Some(vec!["Drama".to_string()]),
            ..PickFilter::default()
        };
        assert!(!filter.accepts(catalog.get("a").unwrap()));
    }

    #[test]
    fn test_random_pick() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(random_pick(&[], &mut rng).is_none());

        let watchlist = vec![entry("a", "A"), entry("b", "B")];
        let picked = random_pick(&watchlist, &mut rng).unwrap();
        assert!(watchlist.contains(picked));
    }

    #[test]
    fn test_watchlist_pick_joins_catalog() {
        let mut brazil = film("b", 1985, 132, Some(3.9), "gb");
        brazil.tagline = Some("It's only a state of mind.".to_string());
        brazil.description = Some("A bureaucrat dreams of escape.".to_string());
        let catalog = Catalog::new(vec![brazil]);

        let known = entry("b", "Brazil");
        let pick = WatchlistPick::new(&known, Some(&catalog));
        assert_eq!(pick.tagline, Some("It's only a state of mind."));
        assert_eq!(pick.description, Some("A bureaucrat dreams of escape."));

        let rendered = serde_json::to_value(&pick).unwrap();
        assert_eq!(rendered["id"], "b");
        assert_eq!(rendered["name"], "Brazil");
        assert_eq!(rendered["tagline"], "It's only a state of mind.");

        let unknown = entry("z", "Zardoz");
        let pick = WatchlistPick::new(&unknown, Some(&catalog));
        assert!(pick.tagline.is_none() && pick.description.is_none());
        assert!(WatchlistPick::new(&known, None).description.is_none());
    }

    #[test]
    fn test_common_films_needs_two_watchlists() {
        let watchlists = vec![
            vec![entry("a", "Alien"), entry("b", "Brazil"), entry("c", "Cube")],
            vec![entry("b", "Brazil"), entry("c", "Cube")],
            vec![entry("c", "Cube"), entry("d", "Dune"), entry("d", "Dune")],
        ];

        let shared = common_films(&watchlists);
        let summary: Vec<(&str, usize)> = shared
            .iter()
            .map(|f| (f.entry.id.as_str(), f.count))
            .collect();
        assert_eq!(summary, vec![("c", 3), ("b", 2)]);
    }

    #[test]
    fn test_common_films_none_shared() {
        let watchlists = vec![vec![entry("a", "A")], vec![entry("b", "B")]];
        assert!(common_films(&watchlists).is_empty());
    }
}
