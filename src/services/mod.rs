//! Service layer for list synchronization.
//!
//! This module contains the remote clients:
//! - Roster scraping (`RosterScraper`)
//! - Catalog API access (`CatalogClient`)

mod catalog;
mod roster;

pub use catalog::{CatalogClient, CatalogListWriter};
pub use roster::{RosterScraper, parse_episode_table, parse_show_index};
