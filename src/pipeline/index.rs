//! Catalog lookup tables for one show.
//!
//! Built once per reconciliation from the catalog's season listing and
//! discarded afterwards. Three lookups are kept:
//!
//! - absolute episode number (as a string) -> record
//! - title key -> record, where both the lower-cased title and its normalized
//!   form are keys
//! - (season, episode) -> record
//!
//! Catalog episodes without a remote id cannot be added to a list and are
//! left out of every table.

use std::collections::HashMap;

use crate::matching::normalize::normalize;
use crate::models::{CatalogEpisodeRecord, CatalogSeason};

/// Lookup tables over one show's catalog episodes.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_number: HashMap<String, CatalogEpisodeRecord>,
    /// Title keys in first-insertion order; fuzzy matching scans these.
    titles: Vec<(String, CatalogEpisodeRecord)>,
    title_positions: HashMap<String, usize>,
    by_season: HashMap<(u32, u32), CatalogEpisodeRecord>,
    episode_count: usize,
}

impl CatalogIndex {
    /// Record with the given absolute number.
    pub fn by_absolute_number(&self, number: &str) -> Option<&CatalogEpisodeRecord> {
        self.by_number.get(number)
    }

    /// Record whose lower-cased or normalized title equals `key`.
    pub fn by_title(&self, key: &str) -> Option<&CatalogEpisodeRecord> {
        self.title_positions.get(key).map(|&i| &self.titles[i].1)
    }

    /// Record at the given season/episode position.
    pub fn by_season_episode(&self, season: u32, episode: u32) -> Option<&CatalogEpisodeRecord> {
        self.by_season.get(&(season, episode))
    }

    /// Every title key with its record, in insertion order.
    pub fn title_entries(&self) -> impl Iterator<Item = (&str, &CatalogEpisodeRecord)> {
        self.titles.iter().map(|(key, record)| (key.as_str(), record))
    }

    /// Number of indexed catalog episodes.
    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn title_key_count(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episode_count == 0
    }
}

/// Builder for a [`CatalogIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: CatalogIndex,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every episode of a season.
    pub fn add_season(&mut self, season: &CatalogSeason) {
        for episode in &season.episodes {
            let Some(remote_id) = episode.ids.remote_id() else {
                log::debug!(
                    "Skipping S{}E{}: no remote id",
                    season.number,
                    episode.number
                );
                continue;
            };

            self.add_record(CatalogEpisodeRecord {
                season: season.number,
                episode: episode.number,
                absolute_number: episode.number_abs,
                title: episode.title.clone().unwrap_or_default(),
                remote_id,
            });
        }
    }

    /// Add a single record.
    pub fn add_record(&mut self, record: CatalogEpisodeRecord) {
        let index = &mut self.index;
        index.episode_count += 1;

        if let Some(number) = record.absolute_number.filter(|&n| n > 0) {
            index.by_number.insert(number.to_string(), record.clone());
        }

        index
            .by_season
            .insert((record.season, record.episode), record.clone());

        let lowered = record.title.trim().to_lowercase();
        if !lowered.is_empty() {
            let normalized = normalize(&lowered);
            self.insert_title(lowered.clone(), record.clone());
            if !normalized.is_empty() && normalized != lowered {
                self.insert_title(normalized, record);
            }
        }
    }

    /// Later records overwrite earlier ones but keep the key's original position.
    fn insert_title(&mut self, key: String, record: CatalogEpisodeRecord) {
        let index = &mut self.index;
        match index.title_positions.get(&key) {
            Some(&position) => index.titles[position].1 = record,
            None => {
                index.title_positions.insert(key.clone(), index.titles.len());
                index.titles.push((key, record));
            }
        }
    }

    pub fn build(self) -> CatalogIndex {
        log::debug!(
            "Indexed {} catalog episodes ({} numbered, {} title keys)",
            self.index.episode_count,
            self.index.by_number.len(),
            self.index.titles.len()
        );
        self.index
    }
}

/// Build an index from a show's season listing.
pub fn build_index(seasons: &[CatalogSeason]) -> CatalogIndex {
    let mut builder = IndexBuilder::new();
    for season in seasons {
        builder.add_season(season);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogEpisode, CatalogIds, RemoteId};

    fn episode(number: u32, abs: Option<u32>, title: &str, trakt: Option<u64>) -> CatalogEpisode {
        CatalogEpisode {
            number,
            number_abs: abs,
            title: Some(title.to_string()),
            ids: CatalogIds {
                trakt,
                ..Default::default()
            },
        }
    }

    fn seasons() -> Vec<CatalogSeason> {
        vec![
            CatalogSeason {
                number: 1,
                episodes: vec![
                    episode(1, Some(1), "Enter: Naruto Uzumaki!", Some(555)),
                    episode(2, Some(2), "My Name is Konohamaru!", Some(556)),
                    episode(3, Some(3), "Sasuke and Sakura", None),
                ],
            },
            CatalogSeason {
                number: 2,
                episodes: vec![episode(1, None, "The Battle, Part 2", Some(700))],
            },
        ]
    }

    #[test]
    fn test_absolute_numbers_are_string_keys() {
        let index = build_index(&seasons());
        assert_eq!(index.by_absolute_number("1").unwrap().remote_id, RemoteId(555));
        assert_eq!(index.by_absolute_number("2").unwrap().remote_id, RemoteId(556));
        assert!(index.by_absolute_number("01").is_none());
    }

    #[test]
    fn test_raw_and_normalized_title_keys() {
        let index = build_index(&seasons());
        let raw = index.by_title("enter: naruto uzumaki!").unwrap();
        let normalized = index.by_title("enter naruto uzumaki").unwrap();
        assert_eq!(raw.remote_id, normalized.remote_id);

        assert_eq!(index.by_title("battle 2").unwrap().remote_id, RemoteId(700));
    }

    #[test]
    fn test_records_without_remote_id_are_excluded() {
        let index = build_index(&seasons());
        assert_eq!(index.episode_count(), 3);
        assert!(index.by_absolute_number("3").is_none());
        assert!(index.by_title("sasuke and sakura").is_none());
        assert!(index.by_season_episode(1, 3).is_none());
    }

    #[test]
    fn test_season_episode_lookup() {
        let index = build_index(&seasons());
        assert_eq!(index.by_season_episode(2, 1).unwrap().remote_id, RemoteId(700));
        assert_eq!(index.by_season_episode(2, 1).unwrap().absolute_number, None);
    }

    #[test]
    fn test_duplicate_titles_keep_first_position() {
        let mut builder = IndexBuilder::new();
        for (abs, id) in [(1, 10), (2, 20)] {
            builder.add_record(CatalogEpisodeRecord {
                season: 1,
                episode: abs,
                absolute_number: Some(abs),
                title: "recap".to_string(),
                remote_id: RemoteId(id),
            });
        }
        let index = builder.build();

        assert_eq!(index.title_key_count(), 1);
        assert_eq!(index.by_title("recap").unwrap().remote_id, RemoteId(20));
    }

    #[test]
    fn test_empty_titles_are_not_keys() {
        let index = build_index(&[CatalogSeason {
            number: 1,
            episodes: vec![CatalogEpisode {
                number: 1,
                number_abs: Some(1),
                title: None,
                ids: CatalogIds {
                    trakt: Some(1),
                    ..Default::default()
                },
            }],
        }]);
        assert_eq!(index.title_key_count(), 0);
        assert!(index.by_absolute_number("1").is_some());
    }
}
