//! Wire shapes returned by the remote catalog API.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::RemoteId;

/// Identifier block attached to catalog objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIds {
    #[serde(default)]
    pub trakt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
}

impl CatalogIds {
    pub fn remote_id(&self) -> Option<RemoteId> {
        self.trakt.map(RemoteId)
    }
}

/// A season with its episodes (`/shows/{id}/seasons?extended=episodes`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSeason {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<CatalogEpisode>,
}

/// An episode inside a season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEpisode {
    pub number: u32,
    #[serde(default)]
    pub number_abs: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ids: CatalogIds,
}

/// A show as returned by search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogShow {
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    pub ids: CatalogIds,
}

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub show: Option<CatalogShow>,
}

/// A user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteList {
    pub name: String,
    pub ids: CatalogIds,
}

/// An item of a user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub episode: Option<ListEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEpisode {
    #[serde(default)]
    pub ids: CatalogIds,
}

/// Remote ids present in a list at the start of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    ids: HashSet<RemoteId>,
}

impl ListSnapshot {
    pub fn new(ids: impl IntoIterator<Item = RemoteId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Build a snapshot from raw list items, keeping only episodes.
    pub fn from_items(items: &[ListItem]) -> Self {
        Self::new(
            items
                .iter()
                .filter(|item| item.kind == "episode")
                .filter_map(|item| item.episode.as_ref())
                .filter_map(|episode| episode.ids.remote_id()),
        )
    }

    pub fn contains(&self, id: RemoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Snapshot that additionally contains `ids`.
    pub fn with(&self, ids: impl IntoIterator<Item = RemoteId>) -> Self {
        let mut next = self.clone();
        next.ids.extend(ids);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_only_episode_items() {
        let items: Vec<ListItem> = serde_json::from_str(
            r#"[
                {"type": "episode", "episode": {"ids": {"trakt": 555}}},
                {"type": "show", "show": {"ids": {"trakt": 1}}},
                {"type": "episode", "episode": {"ids": {}}},
                {"type": "episode", "episode": {"ids": {"trakt": 777, "tmdb": 9}}}
            ]"#,
        )
        .unwrap();

        let snapshot = ListSnapshot::from_items(&items);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(RemoteId(555)));
        assert!(snapshot.contains(RemoteId(777)));
        assert!(!snapshot.contains(RemoteId(1)));
    }

    #[test]
    fn seasons_tolerate_missing_fields() {
        let seasons: Vec<CatalogSeason> = serde_json::from_str(
            r#"[
                {"number": 0},
                {"number": 1, "episodes": [
                    {"number": 1, "number_abs": 1, "title": "Enter", "ids": {"trakt": 10}},
                    {"number": 2, "title": null, "ids": {"trakt": null}}
                ]}
            ]"#,
        )
        .unwrap();

        assert!(seasons[0].episodes.is_empty());
        assert_eq!(seasons[1].episodes[0].ids.remote_id(), Some(RemoteId(10)));
        assert_eq!(seasons[1].episodes[1].ids.remote_id(), None);
    }
}
