//! Shared query parameter types for API handlers.

use serde::Deserialize;
use storyhub_core::pagination::{PageParams, PageRequest};

/// Query parameters for `GET /stories` (`?page=&limit=&genres=a,b`).
#[derive(Debug, Default, Deserialize)]
pub struct StoryListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Comma-separated genre filter. Absent or blank means no filter.
    pub genres: Option<String>,
}

impl StoryListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from(PageParams {
            page: self.page,
            limit: self.limit,
        })
    }

    /// The genre filter split on commas, trimmed, with blanks dropped.
    pub fn genre_list(&self) -> Vec<String> {
        self.genres
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genres_are_split_and_trimmed() {
        let params = StoryListParams {
            genres: Some(" Horror, Mystery ,,".into()),
            ..Default::default()
        };
        assert_eq!(params.genre_list(), vec!["Horror", "Mystery"]);
    }

    #[test]
    fn absent_genres_mean_no_filter() {
        assert!(StoryListParams::default().genre_list().is_empty());
    }

    #[test]
    fn page_request_applies_defaults_and_clamps() {
        let params = StoryListParams {
            page: Some(0),
            limit: None,
            genres: None,
        };
        let page = params.page_request();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), storyhub_core::pagination::DEFAULT_PAGE_LIMIT);
    }
}
