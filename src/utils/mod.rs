//! Utility functions and helpers.

pub mod display;
pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::EpisodeType;

static URL_UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Name of the remote list holding one show's episodes of one type,
/// e.g. `naruto_filler`.
pub fn list_name(roster_id: &str, episode_type: EpisodeType) -> String {
    format!("{}_{}", roster_id, episode_type.list_label())
}

/// Split a synced list name back into roster id and episode type.
///
/// Lists not following the `<roster-id>_<label>` scheme give `None`.
pub fn parse_list_name(list_name: &str) -> Option<(&str, EpisodeType)> {
    let (roster_id, label) = list_name.split_once('_')?;
    if roster_id.is_empty() {
        return None;
    }
    EpisodeType::ALL
        .into_iter()
        .find(|t| t.list_label() == label)
        .map(|t| (roster_id, t))
}

/// URL slug of a list name: spaces and slashes become hyphens, anything
/// else that is not a word character is dropped.
pub fn list_slug(list_name: &str) -> String {
    let slug = list_name.replace([' ', '/'], "-");
    URL_UNSAFE.replace_all(&slug, "").into_owned()
}

/// Public URL of a user's list on the catalog site.
pub fn list_url(site_url: &str, username: &str, list_name: &str) -> String {
    format!(
        "{}/users/{}/lists/{}",
        site_url.trim_end_matches('/'),
        username,
        list_slug(list_name)
    )
}

/// Library title as a roster-style id: whitespace runs become hyphens.
pub fn show_slug(title: &str) -> String {
    WHITESPACE.replace_all(title.trim(), "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.animefillerlist.com/shows").unwrap();
        assert_eq!(
            resolve_url(&base, "/shows/naruto"),
            "https://www.animefillerlist.com/shows/naruto"
        );
        assert_eq!(resolve_url(&base, "https://other.com/x"), "https://other.com/x");
    }

    #[test]
    fn test_list_name() {
        assert_eq!(list_name("naruto", EpisodeType::Filler), "naruto_filler");
        assert_eq!(
            list_name("bleach", EpisodeType::Mixed),
            "bleach_mixed canon/filler"
        );
    }

    #[test]
    fn test_list_url() {
        assert_eq!(
            list_url("https://trakt.tv/", "someone", "bleach_mixed canon/filler"),
            "https://trakt.tv/users/someone/lists/bleach_mixed-canon-filler"
        );
        assert_eq!(list_slug("one-piece_manga canon!"), "one-piece_manga-canon");
    }

    #[test]
    fn test_parse_list_name() {
        assert_eq!(
            parse_list_name("naruto_filler"),
            Some(("naruto", EpisodeType::Filler))
        );
        assert_eq!(
            parse_list_name(&list_name("one-piece", EpisodeType::Mixed)),
            Some(("one-piece", EpisodeType::Mixed))
        );
        assert_eq!(parse_list_name("naruto_favourites"), None);
        assert_eq!(parse_list_name("watchlist"), None);
        assert_eq!(parse_list_name("_filler"), None);
    }

    #[test]
    fn test_show_slug() {
        assert_eq!(show_slug("  Naruto   Shippuden "), "naruto-shippuden");
    }
}
