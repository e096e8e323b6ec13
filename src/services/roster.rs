// src/services/roster.rs

//! Roster scraper service.
//!
//! Reads the show index and per-show episode tables from the filler-list
//! site. Parsing is split from fetching so it can be tested on fixtures.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, EpisodeType, ScrapedEpisode, TitleMappingRule};
use crate::utils::http::{create_client, fetch_page};
use crate::utils::resolve_url;

const SHOWS_PATH: &str = "/shows/";

/// Service for reading show and episode data from the roster site.
pub struct RosterScraper {
    config: Arc<Config>,
    client: Client,
    base_url: Url,
}

impl RosterScraper {
    /// Create a new scraper with the given configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = create_client(&config.http)?;
        let base_url = Url::parse(&config.roster.base_url)?;
        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    fn shows_url(&self) -> String {
        resolve_url(&self.base_url, SHOWS_PATH.trim_end_matches('/'))
    }

    fn show_url(&self, show_id: &str) -> String {
        resolve_url(&self.base_url, &format!("{SHOWS_PATH}{show_id}"))
    }

    async fn pause(&self) {
        let delay = Duration::from_millis(self.config.http.request_delay_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Every show id listed on the roster index page.
    pub async fn list_shows(&self) -> Result<Vec<String>> {
        let url = self.shows_url();
        log::info!("Fetching show index from {}", url);

        let shows = {
            let document = fetch_page(&self.client, &url).await?;
            parse_show_index(&document, &self.base_url)?
        };

        log::info!("Found {} shows", shows.len());
        self.pause().await;
        Ok(shows)
    }

    /// Episodes of `show_id`, cleaned with the show's title mapping and
    /// optionally restricted to one type.
    pub async fn fetch_episodes(
        &self,
        show_id: &str,
        filter: Option<EpisodeType>,
    ) -> Result<Vec<ScrapedEpisode>> {
        let url = self.show_url(show_id);
        log::info!("Fetching episode data from {}", url);

        let episodes = {
            let document = fetch_page(&self.client, &url).await?;
            parse_episode_table(&document, filter, self.config.title_mapping(show_id))?
        };

        log::info!(
            "Found {} episodes matching filter: {}",
            episodes.len(),
            filter.map_or("all", |t| t.key())
        );
        self.pause().await;
        Ok(episodes)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Show ids linked from the index page, in page order without duplicates.
pub fn parse_show_index(document: &Html, base_url: &Url) -> Result<Vec<String>> {
    let link_sel = parse_selector("a[href]")?;
    let mut seen = HashSet::new();
    let mut shows = Vec::new();

    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = Url::parse(&resolve_url(base_url, href)) else {
            continue;
        };
        if resolved.host_str() != base_url.host_str() {
            continue;
        }

        let Some(id) = resolved.path().strip_prefix(SHOWS_PATH) else {
            continue;
        };
        let id = id.trim_matches('/');
        if id.is_empty() || id.contains('/') {
            continue;
        }

        if seen.insert(id.to_string()) {
            shows.push(id.to_string());
        }
    }

    Ok(shows)
}

/// Episode rows of a show page.
///
/// Every table row with at least three cells is read as number, name and
/// type label. Rows with an unknown label are skipped.
pub fn parse_episode_table(
    document: &Html,
    filter: Option<EpisodeType>,
    rule: Option<&TitleMappingRule>,
) -> Result<Vec<ScrapedEpisode>> {
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;
    let mut episodes = Vec::new();

    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 3 {
            continue;
        }

        let Some(episode_type) = EpisodeType::from_roster_label(&cells[2]) else {
            log::debug!("Skipping row {} with type '{}'", cells[0], cells[2]);
            continue;
        };
        if filter.is_some_and(|f| f != episode_type) {
            continue;
        }

        let name = match rule {
            Some(rule) => rule.apply(&cells[1]),
            None => cells[1].clone(),
        };

        episodes.push(ScrapedEpisode::new(cells[0].clone(), name, episode_type));
    }

    Ok(episodes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const INDEX: &str = r#"
        <html><body>
          <div class="Group">
            <a href="/shows/naruto">Naruto</a>
            <a href="/shows/naruto-shippuden">Naruto Shippuden</a>
            <a href="/shows/naruto">Naruto (again)</a>
            <a href="https://www.animefillerlist.com/shows/bleach/">Bleach</a>
            <a href="https://elsewhere.example/shows/fake">Elsewhere</a>
            <a href="/about">About</a>
            <a href="/shows/">All shows</a>
          </div>
        </body></html>
    "#;

    const SHOW: &str = r#"
        <table class="EpisodeList">
          <thead><tr><th>#</th><th>Title</th><th>Type</th><th>Airdate</th></tr></thead>
          <tbody>
            <tr><td class="Number">1</td><td class="Title"><a>Enter: Naruto Uzumaki!</a></td><td class="Type"><span>Manga Canon</span></td><td>2002-10-03</td></tr>
            <tr><td>26</td><td>Special Report: Live from the Forest of Death!</td><td>FILLER</td><td>2003-04-02</td></tr>
            <tr><td>97</td><td>Kidnapped! Naruto's Hot Spring Adventure!</td><td>Mixed Canon/Filler</td><td></td></tr>
            <tr><td>98</td><td>Broken row</td></tr>
            <tr><td>99</td><td>Unknown type</td><td>Recap</td></tr>
          </tbody>
        </table>
    "#;

    fn base() -> Url {
        Url::parse("https://www.animefillerlist.com").unwrap()
    }

    #[test]
    fn test_parse_show_index() {
        let shows = parse_show_index(&Html::parse_document(INDEX), &base()).unwrap();
        assert_eq!(shows, vec!["naruto", "naruto-shippuden", "bleach"]);
    }

    #[test]
    fn test_parse_episode_table() {
        let episodes = parse_episode_table(&Html::parse_document(SHOW), None, None).unwrap();
        assert_eq!(episodes.len(), 3);
        assert_eq!(
            episodes[0],
            ScrapedEpisode::new("1", "Enter: Naruto Uzumaki!", EpisodeType::MangaCanon)
        );
        assert_eq!(episodes[2].episode_type, EpisodeType::Mixed);
    }

    #[test]
    fn test_type_filter() {
        let episodes =
            parse_episode_table(&Html::parse_document(SHOW), Some(EpisodeType::Filler), None)
                .unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].number, "26");
    }

    #[test]
    fn test_title_mapping_is_applied() {
        let rule = TitleMappingRule {
            remove_patterns: vec!["Special Report: ".to_string()],
            special_matches: HashMap::from([(
                "Enter: Naruto Uzumaki!".to_string(),
                "Enter Naruto".to_string(),
            )]),
            ..Default::default()
        };
        let episodes =
            parse_episode_table(&Html::parse_document(SHOW), None, Some(&rule)).unwrap();
        assert_eq!(episodes[0].name, "Enter Naruto");
        assert_eq!(episodes[1].name, "Live from the Forest of Death!");
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }
}
