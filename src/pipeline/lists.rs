// src/pipeline/lists.rs

//! Listing and deleting the lists this tool maintains.

use crate::error::{AppError, Result};
use crate::models::{Config, EpisodeType, RemoteList};
use crate::services::CatalogClient;
use crate::utils::{display, list_url, parse_list_name};

/// A user list, classified by its name.
#[derive(Debug, Clone)]
pub struct UserList {
    pub list: RemoteList,
    /// Roster id and episode type for lists named `<roster-id>_<label>`
    pub synced: Option<(String, EpisodeType)>,
}

impl UserList {
    pub fn new(list: RemoteList) -> Self {
        let synced = parse_list_name(&list.name).map(|(id, t)| (id.to_string(), t));
        Self { list, synced }
    }

    pub fn is_synced(&self) -> bool {
        self.synced.is_some()
    }

    pub fn roster_id(&self) -> Option<&str> {
        self.synced.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn episode_type(&self) -> Option<EpisodeType> {
        self.synced.as_ref().map(|(_, t)| *t)
    }
}

/// Which lists to show.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only lists of this roster show
    pub roster_id: Option<String>,
    /// Case-insensitive substring of the list name
    pub name: Option<String>,
    /// Include lists not created by this tool
    pub include_foreign: bool,
}

/// Keep the lists matching `filter`, in their original order.
pub fn select_lists(lists: Vec<RemoteList>, filter: &ListFilter) -> Vec<UserList> {
    let needle = filter.name.as_deref().map(str::to_lowercase);

    lists
        .into_iter()
        .map(UserList::new)
        .filter(|l| {
            needle
                .as_deref()
                .is_none_or(|n| l.list.name.to_lowercase().contains(n))
        })
        .filter(|l| match &filter.roster_id {
            Some(id) => l.roster_id() == Some(id.as_str()),
            None => true,
        })
        .filter(|l| filter.include_foreign || l.is_synced())
        .collect()
}

/// Synced lists of `roster_id` to delete: one episode type, or all of them
/// when `episode_type` is `None`.
pub fn lists_to_delete(
    lists: Vec<RemoteList>,
    roster_id: &str,
    episode_type: Option<EpisodeType>,
) -> Vec<UserList> {
    lists
        .into_iter()
        .map(UserList::new)
        .filter(|l| l.roster_id() == Some(roster_id))
        .filter(|l| episode_type.is_none_or(|t| l.episode_type() == Some(t)))
        .collect()
}

/// Print the user's lists matching `filter` with their episode counts.
pub async fn run_list_lists(
    config: &Config,
    catalog: &CatalogClient,
    filter: &ListFilter,
) -> Result<Vec<UserList>> {
    let lists = select_lists(catalog.user_lists().await?, filter);

    if lists.is_empty() {
        log::info!("No matching lists");
        return Ok(lists);
    }

    display::header(&format!("{} list(s)", lists.len()));
    for user_list in &lists {
        let count = catalog.list_snapshot(&user_list.list).await?.len();
        let url = list_url(
            &config.catalog.site_url,
            &config.catalog.username,
            &user_list.list.name,
        );
        display::sub_item(&format!(
            "{} ({} episodes) {}",
            user_list.list.name, count, url
        ));
    }

    Ok(lists)
}

/// Delete the synced lists of `roster_id`; returns how many were deleted.
///
/// A list that fails to delete is logged and the remaining ones are still
/// attempted.
pub async fn run_delete(
    catalog: &CatalogClient,
    roster_id: &str,
    episode_type: Option<EpisodeType>,
) -> Result<usize> {
    let targets = lists_to_delete(catalog.user_lists().await?, roster_id, episode_type);
    if targets.is_empty() {
        return Err(AppError::validation(format!(
            "No {} lists found for {}",
            episode_type.map_or("synced", |t| t.list_label()),
            roster_id
        )));
    }

    let mut deleted = 0;
    for target in &targets {
        match catalog.delete_list(&target.list).await {
            Ok(()) => deleted += 1,
            Err(e) => log::error!("Failed to delete '{}': {}", target.list.name, e),
        }
    }

    display::summary(
        roster_id,
        &[("Deleted", format!("{} of {}", deleted, targets.len()))],
    );
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogIds;

    fn list(name: &str, id: u64) -> RemoteList {
        RemoteList {
            name: name.to_string(),
            ids: CatalogIds {
                trakt: Some(id),
                slug: None,
                tmdb: None,
            },
        }
    }

    fn lists() -> Vec<RemoteList> {
        vec![
            list("naruto_filler", 1),
            list("naruto_manga canon", 2),
            list("naruto-shippuden_filler", 3),
            list("Watch later", 4),
            list("bleach_mixed canon/filler", 5),
        ]
    }

    fn names(lists: &[UserList]) -> Vec<&str> {
        lists.iter().map(|l| l.list.name.as_str()).collect()
    }

    #[test]
    fn test_select_synced_lists_only_by_default() {
        let selected = select_lists(lists(), &ListFilter::default());
        assert_eq!(
            names(&selected),
            vec![
                "naruto_filler",
                "naruto_manga canon",
                "naruto-shippuden_filler",
                "bleach_mixed canon/filler"
            ]
        );
        assert_eq!(selected[3].episode_type(), Some(EpisodeType::Mixed));
    }

    #[test]
    fn test_select_by_show_and_name() {
        let filter = ListFilter {
            roster_id: Some("naruto".to_string()),
            ..Default::default()
        };
        assert_eq!(
            names(&select_lists(lists(), &filter)),
            vec!["naruto_filler", "naruto_manga canon"]
        );

        let filter = ListFilter {
            name: Some("WATCH".to_string()),
            include_foreign: true,
            ..Default::default()
        };
        let selected = select_lists(lists(), &filter);
        assert_eq!(names(&selected), vec!["Watch later"]);
        assert!(!selected[0].is_synced());
    }

    #[test]
    fn test_lists_to_delete() {
        assert_eq!(
            names(&lists_to_delete(lists(), "naruto", None)),
            vec!["naruto_filler", "naruto_manga canon"]
        );
        assert_eq!(
            names(&lists_to_delete(lists(), "naruto", Some(EpisodeType::Filler))),
            vec!["naruto_filler"]
        );
        assert!(lists_to_delete(lists(), "naruto", Some(EpisodeType::AnimeCanon)).is_empty());
    }
}
