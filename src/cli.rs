use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::{
    api::{create_router, AppState},
    catalog::Catalog,
    config::Config,
    models::WatchlistEntry,
    services::{
        letterboxd::{self, LetterboxdClient},
        picks::{self, PickFilter},
        recommender::{FactorModel, ModelHandle, RatingUpdate},
    },
};

/// Rated films below this count give noticeably weaker recommendations
const FEW_RATINGS: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "toolboxd")]
#[command(about = "Letterboxd watchlist tools and film recommendations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the recommendation HTTP service (default)
    Serve,
    /// Print a member's watchlist
    Watchlist { username: String },
    /// Print a member's logged films and ratings
    Ratings { username: String },
    /// Pick a random film from a member's watchlist
    Random { username: String },
    /// Films shared by the watchlists of a group
    Group {
        #[arg(required = true, num_args = 2..)]
        usernames: Vec<String>,
    },
    /// Fetch every API path listed in a file, one per line
    Fetch {
        paths_file: PathBuf,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Recommend films for a member using the local model and catalog
    Recommend {
        username: String,
        /// Number of picks to print
        #[arg(short = 'n', long, default_value_t = 9)]
        count: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub year: Option<Vec<i32>>,
    /// Runtime range in minutes
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub runtime: Option<Vec<u32>>,
    /// Popularity rank range, higher is more obscure
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub popularity: Option<Vec<u32>>,
    /// Average Letterboxd rating range
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub rating: Option<Vec<f64>>,
    /// Two letter ISO-3166 country code
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long = "genre")]
    pub genres: Vec<String>,
    /// Leave out films already on the watchlist
    #[arg(long)]
    pub exclude_watchlist: bool,
}

fn pair<T: Copy>(values: &Option<Vec<T>>) -> Option<(T, T)> {
    match values.as_deref() {
        Some([lo, hi]) => Some((*lo, *hi)),
        _ => None,
    }
}

impl From<&FilterArgs> for PickFilter {
    fn from(args: &FilterArgs) -> Self {
        PickFilter {
            release_year: pair(&args.year),
            runtime: pair(&args.runtime),
            popularity: pair(&args.popularity),
            average_rating: pair(&args.rating),
            country: args.country.clone(),
            genres: (!args.genres.is_empty()).then(|| args.genres.clone()),
            include_watchlist: !args.exclude_watchlist,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Watchlist { username } => {
            let client = LetterboxdClient::from_config(&config)?;
            let member_id = client.resolve_member_id(&username).await?;
            let entries = letterboxd::watchlist(&client, &member_id, config.max_pages).await?;
            print_json(&entries)
        }
        Command::Ratings { username } => {
            let client = LetterboxdClient::from_config(&config)?;
            let member_id = client.resolve_member_id(&username).await?;
            let entries = letterboxd::ratings(&client, &member_id, config.max_pages).await?;
            print_json(&entries)
        }
        Command::Random { username } => {
            let client = LetterboxdClient::from_config(&config)?;
            let member_id = client.resolve_member_id(&username).await?;
            let entries = letterboxd::watchlist(&client, &member_id, config.max_pages).await?;
            let catalog = match Catalog::load(&config.catalog_path) {
                Ok(catalog) => Some(catalog),
                Err(e) => {
                    tracing::debug!(error = %e, "Catalog unavailable, picking without blurbs");
                    None
                }
            };
            match picks::random_pick(&entries, &mut rand::thread_rng()) {
                Some(entry) => print_json(&picks::WatchlistPick::new(entry, catalog.as_ref())),
                None => anyhow::bail!("{} has no watchlist or it is private", username),
            }
        }
        Command::Group { usernames } => {
            let client = LetterboxdClient::from_config(&config)?;
            let watchlists = group_watchlists(&client, &usernames, config.max_pages).await?;
            print_json(&picks::common_films(&watchlists))
        }
        Command::Fetch {
            paths_file,
            max_retries,
            concurrency,
        } => {
            let client = LetterboxdClient::from_config(&config)?;
            let contents = std::fs::read_to_string(&paths_file)
                .with_context(|| format!("reading {}", paths_file.display()))?;
            let paths = contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();

            let mut options = config.bulk_fetch_options();
            if let Some(max_retries) = max_retries {
                options.max_retries = max_retries;
            }
            if let Some(concurrency) = concurrency {
                options.max_concurrency = concurrency;
            }

            let report = letterboxd::fetch_all(&client, paths, &options).await;
            print_json(&report)
        }
        Command::Recommend {
            username,
            count,
            filters,
        } => recommend(&config, &username, count, &filters).await,
    }
}

/// Loads every member's watchlist, skipping members that cannot be fetched
///
/// Fails only when fewer than two watchlists could be loaded.
pub async fn group_watchlists(
    client: &LetterboxdClient,
    usernames: &[String],
    max_pages: usize,
) -> anyhow::Result<Vec<Vec<WatchlistEntry>>> {
    let mut watchlists = Vec::with_capacity(usernames.len());
    let mut unavailable = Vec::new();

    for username in usernames {
        let loaded = match client.resolve_member_id(username).await {
            Ok(member_id) => letterboxd::watchlist(client, &member_id, max_pages).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(watchlist) => watchlists.push(watchlist),
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Skipping member watchlist");
                unavailable.push(username.as_str());
            }
        }
    }

    if watchlists.len() < 2 {
        anyhow::bail!(
            "need at least two watchlists, could not load: {}",
            unavailable.join(", ")
        );
    }

    Ok(watchlists)
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let model = FactorModel::from_file(&config.model_path)?;
    let state = AppState::new(ModelHandle::new(model))
        .with_update_params(config.update_params())
        .with_bound_ratings(config.bound_ratings);

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn recommend(
    config: &Config,
    username: &str,
    count: usize,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let model = FactorModel::from_file(&config.model_path)?;
    let catalog = Catalog::load(&config.catalog_path)?;
    let client = LetterboxdClient::from_config(config)?;

    let member_id = client.resolve_member_id(username).await?;
    let ratings = letterboxd::ratings(&client, &member_id, config.max_pages).await?;

    let usable: Vec<(String, f64)> = ratings
        .iter()
        .filter(|r| model.knows_item(&r.film))
        .filter_map(|r| r.rating.map(|rating| (r.film.clone(), rating)))
        .collect();

    if usable.len() < FEW_RATINGS {
        tracing::warn!(
            username = %username,
            usable = usable.len(),
            "Few ratings; rate more films for better recommendations"
        );
    }

    let filter = PickFilter::from(filters);
    let watchlist: HashSet<String> = if filter.include_watchlist {
        HashSet::new()
    } else {
        letterboxd::watchlist(&client, &member_id, config.max_pages)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect()
    };

    let update = RatingUpdate::new(&member_id, usable)?;
    let handle = ModelHandle::new(model);
    let recommendations = handle
        .update_and_recommend(&update, config.update_params(), config.bound_ratings)
        .await?;

    let rated: HashSet<String> = ratings.into_iter().map(|r| r.film).collect();
    let picks = picks::rank_picks(
        recommendations.predictions,
        &catalog,
        &rated,
        &watchlist,
        &filter,
    );

    if picks.len() < count {
        anyhow::bail!("The filters left only {} films; try easing up", picks.len());
    }

    print_json(&picks.into_iter().take(count).collect::<Vec<_>>())
}
