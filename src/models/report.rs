//! Match and reconciliation results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{RemoteId, ScrapedEpisode};

/// Which strategies the episode matcher may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Number,
    Title,
    #[default]
    Hybrid,
}

impl MatchMode {
    pub fn allows_number(&self) -> bool {
        matches!(self, Self::Number | Self::Hybrid)
    }

    pub fn allows_title(&self) -> bool {
        matches!(self, Self::Title | Self::Hybrid)
    }
}

impl FromStr for MatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "number" => Ok(Self::Number),
            "title" => Ok(Self::Title),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(AppError::validation(format!(
                "Unknown match mode '{other}' (expected number, title or hybrid)"
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Title => "title",
            Self::Hybrid => "hybrid",
        })
    }
}

/// Strategy that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStrategy {
    Number,
    TitleExact,
    TitleNormalized,
    SpecialPattern,
    Fuzzy,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::TitleExact => "exact title",
            Self::TitleNormalized => "normalized title",
            Self::SpecialPattern => "special pattern",
            Self::Fuzzy => "fuzzy title",
        })
    }
}

/// Outcome of matching one scraped episode against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub episode: ScrapedEpisode,
    pub remote_id: Option<RemoteId>,
    pub strategy: Option<MatchStrategy>,
    pub confidence: f64,
}

impl MatchResult {
    pub fn matched(
        episode: ScrapedEpisode,
        remote_id: RemoteId,
        strategy: MatchStrategy,
        confidence: f64,
    ) -> Self {
        Self {
            episode,
            remote_id: Some(remote_id),
            strategy: Some(strategy),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn unmatched(episode: ScrapedEpisode) -> Self {
        Self {
            episode,
            remote_id: None,
            strategy: None,
            confidence: 0.0,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Identifier reported when the episode is already in the list.
    pub fn skip_identifier(&self) -> String {
        match self.strategy {
            Some(MatchStrategy::Number) => self.episode.number.clone(),
            _ => self.episode.name.to_lowercase(),
        }
    }
}

/// Final classification of every desired episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    /// Names of episodes added to the list during this run
    pub added: Vec<String>,
    /// Identifiers of episodes that were already present
    pub skipped: Vec<String>,
    /// Episodes without a match, or whose batch could not be submitted
    pub failed: Vec<ScrapedEpisode>,
    /// Human-readable reasons for failures
    pub failure_notes: Vec<String>,
}

impl ReconciliationReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.iter().map(|e| e.name.clone()).collect()
    }
}
