//! Scraped episode -> catalog episode matching.
//!
//! Each strategy is a separate function returning `Option<MatchResult>`; the
//! matcher tries them in order and keeps the first hit:
//!
//! | Tier | Strategy          | Requires        |
//! |------|-------------------|-----------------|
//! | 1    | absolute number   | number or hybrid |
//! | 2    | exact title       | title or hybrid |
//! | 3    | normalized title  | title or hybrid |
//! | 4    | special pattern   | title or hybrid, show has a special case |
//! | 5    | fuzzy title       | title or hybrid |

use super::normalize::normalize;
use super::similarity::ratio;
use super::special::SpecialCase;
use crate::models::{
    CatalogEpisodeRecord, MatchMode, MatchResult, MatchStrategy, ScrapedEpisode, TitleMappingRule,
};
use crate::pipeline::index::CatalogIndex;

/// Fuzzy matches must score strictly above this.
pub const FUZZY_THRESHOLD: f64 = 0.85;

pub const NUMBER_CONFIDENCE: f64 = 1.0;
pub const EXACT_TITLE_CONFIDENCE: f64 = 1.0;
pub const NORMALIZED_TITLE_CONFIDENCE: f64 = 0.95;
pub const SPECIAL_PATTERN_CONFIDENCE: f64 = 0.9;

/// Whether a fuzzy similarity score is accepted.
pub fn fuzzy_accepts(score: f64) -> bool {
    score > FUZZY_THRESHOLD
}

/// Title forms shared by the title tiers.
struct TitleForms {
    /// Lower-cased name after special-match substitution
    mapped: String,
    normalized: String,
}

impl TitleForms {
    fn new(name: &str, rule: Option<&TitleMappingRule>) -> Self {
        let lowered = name.to_lowercase();
        let mapped = match rule.and_then(|r| r.special_match(&lowered)) {
            Some(mapped) => {
                log::debug!("Applied mapping: '{}' -> '{}'", lowered, mapped);
                mapped
            }
            None => lowered,
        };
        let normalized = normalize(&mapped);
        Self { mapped, normalized }
    }
}

/// Matches scraped episodes against one show's [`CatalogIndex`].
#[derive(Debug, Clone, Copy)]
pub struct EpisodeMatcher<'a> {
    mode: MatchMode,
    rule: Option<&'a TitleMappingRule>,
    special: Option<&'a SpecialCase>,
}

impl<'a> EpisodeMatcher<'a> {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            rule: None,
            special: None,
        }
    }

    /// Use the show's special-match substitutions for title lookups.
    pub fn with_mapping(mut self, rule: Option<&'a TitleMappingRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Enable the special-pattern tier.
    pub fn with_special_case(mut self, special: Option<&'a SpecialCase>) -> Self {
        self.special = special;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Match one episode; never fails, unmatched episodes are reported as such.
    pub fn match_episode(&self, episode: &ScrapedEpisode, index: &CatalogIndex) -> MatchResult {
        if self.mode.allows_number() {
            if let Some(result) = match_number(episode, index) {
                return result;
            }
        }

        if self.mode.allows_title() {
            let forms = TitleForms::new(&episode.name, self.rule);

            let hit = match_exact_title(episode, &forms, index)
                .or_else(|| match_normalized_title(episode, &forms, index))
                .or_else(|| {
                    self.special
                        .and_then(|special| match_special_pattern(episode, special, index))
                })
                .or_else(|| match_fuzzy(episode, &forms, index));

            if let Some(result) = hit {
                return result;
            }
        }

        log::debug!("No match for episode {} '{}'", episode.number, episode.name);
        MatchResult::unmatched(episode.clone())
    }

    pub fn match_all(&self, episodes: &[ScrapedEpisode], index: &CatalogIndex) -> Vec<MatchResult> {
        episodes
            .iter()
            .map(|episode| self.match_episode(episode, index))
            .collect()
    }
}

fn hit(
    episode: &ScrapedEpisode,
    record: &CatalogEpisodeRecord,
    strategy: MatchStrategy,
    confidence: f64,
) -> MatchResult {
    MatchResult::matched(episode.clone(), record.remote_id, strategy, confidence)
}

/// Tier 1: the roster number as-is, then with every non-digit removed.
pub fn match_number(episode: &ScrapedEpisode, index: &CatalogIndex) -> Option<MatchResult> {
    let number = episode.number.trim();
    let record = index.by_absolute_number(number).or_else(|| {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || digits == number {
            None
        } else {
            index.by_absolute_number(&digits)
        }
    })?;

    Some(hit(episode, record, MatchStrategy::Number, NUMBER_CONFIDENCE))
}

fn match_exact_title(
    episode: &ScrapedEpisode,
    forms: &TitleForms,
    index: &CatalogIndex,
) -> Option<MatchResult> {
    let record = index.by_title(&forms.mapped)?;
    Some(hit(episode, record, MatchStrategy::TitleExact, EXACT_TITLE_CONFIDENCE))
}

fn match_normalized_title(
    episode: &ScrapedEpisode,
    forms: &TitleForms,
    index: &CatalogIndex,
) -> Option<MatchResult> {
    if forms.normalized.is_empty() {
        return None;
    }
    let record = index.by_title(&forms.normalized)?;
    Some(hit(
        episode,
        record,
        MatchStrategy::TitleNormalized,
        NORMALIZED_TITLE_CONFIDENCE,
    ))
}

/// Tier 4: season/episode parsed from the raw name, then the parsed title.
pub fn match_special_pattern(
    episode: &ScrapedEpisode,
    special: &SpecialCase,
    index: &CatalogIndex,
) -> Option<MatchResult> {
    let parsed = special.parse(&episode.name)?;

    if let Some(record) = index.by_season_episode(parsed.season, parsed.episode) {
        log::debug!(
            "Matched '{}' -> S{}E{}",
            episode.name,
            parsed.season,
            parsed.episode
        );
        return Some(hit(
            episode,
            record,
            MatchStrategy::SpecialPattern,
            SPECIAL_PATTERN_CONFIDENCE,
        ));
    }

    let normalized = normalize(&parsed.title);
    let record = index
        .by_title(&normalized)
        .filter(|_| !normalized.is_empty())
        .or_else(|| index.by_title(&parsed.title.to_lowercase()))?;

    log::debug!("Matched '{}' by title '{}'", episode.name, parsed.title);
    Some(hit(
        episode,
        record,
        MatchStrategy::SpecialPattern,
        SPECIAL_PATTERN_CONFIDENCE,
    ))
}

fn match_fuzzy(
    episode: &ScrapedEpisode,
    forms: &TitleForms,
    index: &CatalogIndex,
) -> Option<MatchResult> {
    let mut best: Option<(&str, &CatalogEpisodeRecord, f64)> = None;

    for (key, record) in index.title_entries() {
        let score = ratio(&forms.normalized, key);
        if fuzzy_accepts(score) && best.is_none_or(|(_, _, b)| score > b) {
            best = Some((key, record, score));
        }
    }

    let (key, record, score) = best?;
    log::debug!(
        "Fuzzy matched '{}' to '{}' (score: {:.2})",
        forms.mapped,
        key,
        score
    );
    Some(hit(episode, record, MatchStrategy::Fuzzy, score))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::matching::special;
    use crate::models::{EpisodeType, RemoteId};
    use crate::pipeline::index::IndexBuilder;

    fn record(season: u32, episode: u32, abs: Option<u32>, title: &str, id: u64) -> CatalogEpisodeRecord {
        CatalogEpisodeRecord {
            season,
            episode,
            absolute_number: abs,
            title: title.to_string(),
            remote_id: RemoteId(id),
        }
    }

    fn index(records: Vec<CatalogEpisodeRecord>) -> CatalogIndex {
        let mut builder = IndexBuilder::new();
        for r in records {
            builder.add_record(r);
        }
        builder.build()
    }

    fn scraped(number: &str, name: &str) -> ScrapedEpisode {
        ScrapedEpisode::new(number, name, EpisodeType::AnimeCanon)
    }

    #[test]
    fn test_number_first_precedence() {
        let index = index(vec![
            record(1, 1, Some(1), "Title A", 10),
            record(1, 2, Some(2), "Title B", 20),
        ]);
        let episode = scraped("1", "Title B");

        let result = EpisodeMatcher::new(MatchMode::Hybrid).match_episode(&episode, &index);
        assert_eq!(result.remote_id, Some(RemoteId(10)));
        assert_eq!(result.strategy, Some(MatchStrategy::Number));
        assert_eq!(result.confidence, 1.0);

        let result = EpisodeMatcher::new(MatchMode::Title).match_episode(&episode, &index);
        assert_eq!(result.remote_id, Some(RemoteId(20)));
        assert_eq!(result.strategy, Some(MatchStrategy::TitleExact));
    }

    #[test]
    fn test_number_with_non_digits() {
        let index = index(vec![record(1, 7, Some(7), "Seven", 70)]);
        let result = EpisodeMatcher::new(MatchMode::Number).match_episode(&scraped("7a", "x"), &index);
        assert_eq!(result.remote_id, Some(RemoteId(70)));
    }

    #[test]
    fn test_number_mode_never_uses_titles() {
        let index = index(vec![record(1, 1, Some(1), "Pilot", 1)]);
        let result = EpisodeMatcher::new(MatchMode::Number).match_episode(&scraped("99", "Pilot"), &index);
        assert!(!result.is_matched());
        assert_eq!(result.strategy, None);
    }

    #[test]
    fn test_normalized_title() {
        let index = index(vec![record(1, 1, None, "Enter: Naruto Uzumaki!", 555)]);
        let result = EpisodeMatcher::new(MatchMode::Hybrid)
            .match_episode(&scraped("1", "Enter, Naruto Uzumaki"), &index);
        assert_eq!(result.remote_id, Some(RemoteId(555)));
        assert_eq!(result.strategy, Some(MatchStrategy::TitleNormalized));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_special_match_substitution() {
        let rule = TitleMappingRule {
            special_matches: HashMap::from([(
                "The Recap".to_string(),
                "Episode: Looking Back".to_string(),
            )]),
            ..Default::default()
        };
        let index = index(vec![record(1, 5, None, "Looking Back", 50)]);

        let result = EpisodeMatcher::new(MatchMode::Title)
            .with_mapping(Some(&rule))
            .match_episode(&scraped("5", "The Recap"), &index);
        assert_eq!(result.remote_id, Some(RemoteId(50)));
        assert_eq!(result.strategy, Some(MatchStrategy::TitleExact));
    }

    #[test]
    fn test_special_pattern_by_season_and_episode() {
        let index = index(vec![
            record(1, 3, None, "The Black Knights", 303),
            record(2, 3, None, "Imprisoned in Campus", 403),
        ]);
        let matcher = EpisodeMatcher::new(MatchMode::Hybrid)
            .with_special_case(special::lookup("code-geass"));

        let result = matcher.match_episode(&scraped("3", "Stage 3 - The Black Knights"), &index);
        assert_eq!(result.remote_id, Some(RemoteId(303)));
        assert_eq!(result.strategy, Some(MatchStrategy::SpecialPattern));
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_special_pattern_by_parsed_title() {
        let index = index(vec![record(1, 1, None, "The Day a New Demon was Born", 1)]);
        let matcher = EpisodeMatcher::new(MatchMode::Title)
            .with_special_case(special::lookup("code-geass"));

        let result =
            matcher.match_episode(&scraped("1", "Stage 40 - The Day a New Demon was Born"), &index);
        assert_eq!(result.remote_id, Some(RemoteId(1)));
        assert_eq!(result.strategy, Some(MatchStrategy::SpecialPattern));
    }

    #[test]
    fn test_special_pattern_requires_special_case() {
        let index = index(vec![record(1, 3, None, "Unrelated", 303)]);
        let result = EpisodeMatcher::new(MatchMode::Title)
            .match_episode(&scraped("3", "Stage 3 - The Black Knights"), &index);
        assert!(!result.is_matched());
    }

    #[test]
    fn test_fuzzy_threshold_is_strict() {
        assert!(!fuzzy_accepts(0.85));
        assert!(fuzzy_accepts(0.851));

        let index = index(vec![record(1, 1, None, "abcdefghijklmnopqrst", 1)]);
        let matcher = EpisodeMatcher::new(MatchMode::Title);

        // ratio is exactly 0.85
        let result = matcher.match_episode(&scraped("", "abcdefghijklmnopqxyz"), &index);
        assert!(!result.is_matched());

        let result = matcher.match_episode(&scraped("", "abcdefghijklmnopqrsz"), &index);
        assert_eq!(result.strategy, Some(MatchStrategy::Fuzzy));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_unmatched_result() {
        let result = EpisodeMatcher::new(MatchMode::Hybrid)
            .match_episode(&scraped("1", "Nothing"), &CatalogIndex::default());
        assert!(!result.is_matched());
        assert_eq!(result.confidence, 0.0);
    }
}
