//! Episode data structures shared by the roster and the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Roster classification of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeType {
    Filler,
    MangaCanon,
    AnimeCanon,
    Mixed,
}

impl EpisodeType {
    pub const ALL: [EpisodeType; 4] = [
        EpisodeType::MangaCanon,
        EpisodeType::Filler,
        EpisodeType::AnimeCanon,
        EpisodeType::Mixed,
    ];

    /// Label used in the roster's episode table.
    pub fn roster_label(&self) -> &'static str {
        match self {
            Self::Filler => "FILLER",
            Self::MangaCanon => "MANGA CANON",
            Self::AnimeCanon => "ANIME CANON",
            Self::Mixed => "MIXED CANON/FILLER",
        }
    }

    /// Label used in remote list names.
    pub fn list_label(&self) -> &'static str {
        match self {
            Self::Filler => "filler",
            Self::MangaCanon => "manga canon",
            Self::AnimeCanon => "anime canon",
            Self::Mixed => "mixed canon/filler",
        }
    }

    /// Short key used on the command line and in the failure log.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Filler => "filler",
            Self::MangaCanon => "manga",
            Self::AnimeCanon => "anime",
            Self::Mixed => "mixed",
        }
    }

    /// Parse a roster table label (case-insensitive).
    pub fn from_roster_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.roster_label().eq_ignore_ascii_case(label))
    }
}

impl FromStr for EpisodeType {
    type Err = AppError;

    /// Accepts short keys, list labels and roster labels.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        if lowered.starts_with("filler") {
            return Ok(Self::Filler);
        }
        if lowered.starts_with("manga") {
            return Ok(Self::MangaCanon);
        }
        if lowered.starts_with("anime") {
            return Ok(Self::AnimeCanon);
        }
        if lowered.starts_with("mixed") {
            return Ok(Self::Mixed);
        }
        Err(AppError::validation(format!(
            "Unknown episode type '{s}' (expected filler, manga, anime or mixed)"
        )))
    }
}

impl fmt::Display for EpisodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An episode row read from the roster site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedEpisode {
    /// Site-native episode number (not necessarily numeric)
    pub number: String,

    /// Episode title after title-mapping cleanup
    pub name: String,

    /// Roster classification
    #[serde(rename = "type")]
    pub episode_type: EpisodeType,
}

impl ScrapedEpisode {
    pub fn new(number: impl Into<String>, name: impl Into<String>, episode_type: EpisodeType) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            episode_type,
        }
    }
}

/// Opaque identifier of an episode in the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub u64);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog episode that can be referenced from a remote list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEpisodeRecord {
    pub season: u32,
    pub episode: u32,
    pub absolute_number: Option<u32>,
    pub title: String,
    pub remote_id: RemoteId,
}
