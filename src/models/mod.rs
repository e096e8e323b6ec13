// src/models/mod.rs

//! Domain models for list synchronization.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod episode;
mod mapping;
mod report;

// Re-export all public types
pub use catalog::{
    CatalogEpisode, CatalogIds, CatalogSeason, CatalogShow, ListEpisode, ListItem, ListSnapshot,
    RemoteList, SearchResult,
};
pub use config::{
    CatalogConfig, Config, HttpConfig, PathsConfig, RosterConfig, ShowConfig, SyncConfig,
};
pub use episode::{CatalogEpisodeRecord, EpisodeType, RemoteId, ScrapedEpisode};
pub use mapping::TitleMappingRule;
pub use report::{MatchMode, MatchResult, MatchStrategy, ReconciliationReport};
