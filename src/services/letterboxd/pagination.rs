use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::{
    error::{LetterboxdError, LetterboxdResult},
    models::{Page, RatedFilm, RatingEntry, WatchlistEntry},
    services::letterboxd::LetterboxdApi,
};

/// Cursor Letterboxd expects for the first page of any listing
pub const FIRST_CURSOR: &str = "start=0";

const PER_PAGE: u32 = 100;

/// Lazy, restartable walk over a cursor-paginated listing
///
/// Each call to [`CursorPages::next_page`] issues one request. The walk ends
/// when a page comes back without a `next` cursor, on the first error, or with
/// [`LetterboxdError::PageLimitExceeded`] once `max_pages` pages have been
/// read and the listing still has more. A `max_pages` of zero fails before the
/// first request; `Config::from_env` refuses it.
pub struct CursorPages<'a, A: ?Sized, T> {
    api: &'a A,
    base_path: String,
    max_pages: usize,
    cursor: Option<String>,
    pages_fetched: usize,
    _item: PhantomData<fn() -> T>,
}

impl<'a, A, T> CursorPages<'a, A, T>
where
    A: LetterboxdApi + ?Sized,
    T: DeserializeOwned,
{
    /// `base_path` may already carry a query string; the cursor is appended to it.
    pub fn new(api: &'a A, base_path: impl Into<String>, max_pages: usize) -> Self {
        Self {
            api,
            base_path: base_path.into(),
            max_pages,
            cursor: Some(FIRST_CURSOR.to_string()),
            pages_fetched: 0,
            _item: PhantomData,
        }
    }

    /// Rewinds to the first page
    pub fn restart(&mut self) {
        self.cursor = Some(FIRST_CURSOR.to_string());
        self.pages_fetched = 0;
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn page_path(&self, cursor: &str) -> String {
        let separator = if self.base_path.contains('?') { '&' } else { '?' };
        format!("{}{}cursor={}", self.base_path, separator, cursor)
    }

    pub async fn next_page(&mut self) -> Option<LetterboxdResult<Page<T>>> {
        let cursor = self.cursor.take()?;

        if self.pages_fetched >= self.max_pages {
            return Some(Err(LetterboxdError::PageLimitExceeded {
                max_pages: self.max_pages,
            }));
        }

        let path = self.page_path(&cursor);
        let body = match self.api.get_json(&path).await {
            Ok(body) => body,
            Err(e) => return Some(Err(e)),
        };

        let page: Page<T> = match serde_json::from_value(body) {
            Ok(page) => page,
            Err(source) => return Some(Err(LetterboxdError::Decode { path, source })),
        };

        self.pages_fetched += 1;
        self.cursor = page.next.clone();

        tracing::debug!(
            path = %path,
            items = page.items.len(),
            has_next = self.cursor.is_some(),
            "Fetched page"
        );

        Some(Ok(page))
    }

    /// Drains the remaining pages, failing on the first error
    pub async fn collect_items(&mut self) -> LetterboxdResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}

/// Fetches a member's whole watchlist
pub async fn watchlist<A>(
    api: &A,
    member_id: &str,
    max_pages: usize,
) -> LetterboxdResult<Vec<WatchlistEntry>>
where
    A: LetterboxdApi + ?Sized,
{
    let base_path = format!("member/{}/watchlist?perPage={}", member_id, PER_PAGE);
    let entries = CursorPages::<A, WatchlistEntry>::new(api, base_path, max_pages)
        .collect_items()
        .await?;

    tracing::info!(member_id = %member_id, films = entries.len(), "Watchlist fetched");

    Ok(entries)
}

/// Fetches every film a member has logged as watched, best rated first
pub async fn ratings<A>(
    api: &A,
    member_id: &str,
    max_pages: usize,
) -> LetterboxdResult<Vec<RatingEntry>>
where
    A: LetterboxdApi + ?Sized,
{
    let base_path = format!(
        "films/?perPage={}&member={}&memberRelationship=Watched&sort=MemberRatingHighToLow",
        PER_PAGE, member_id
    );
    let films = CursorPages::<A, RatedFilm>::new(api, base_path, max_pages)
        .collect_items()
        .await?;

    let entries: Vec<RatingEntry> = films
        .into_iter()
        .map(|film| film.into_rating(member_id))
        .collect();

    tracing::info!(
        member_id = %member_id,
        films = entries.len(),
        rated = entries.iter().filter(|e| e.rating.is_some()).count(),
        "Ratings fetched"
    );

    Ok(entries)
}
