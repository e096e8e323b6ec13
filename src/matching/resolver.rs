//! Library title -> roster show id resolution.
//!
//! Roster show ids are lower-case and hyphenated (`naruto-shippuden`); their
//! display form replaces hyphens with spaces. Resolution runs three tiers and
//! the first tier that succeeds wins:
//!
//! 1. exact match of the folded full title,
//! 2. exact match of a title variation, longest variation first, unless a
//!    longer candidate containing the hit is itself a close match,
//! 3. best score over every (candidate, variation) pair.

use std::collections::HashSet;

use super::normalize::fold_diacritics;
use super::similarity::ratio;
use super::variations;

/// Minimum tier-3 score for [`ShowResolver::resolve`] (inclusive).
pub const SHOW_MATCH_THRESHOLD: f64 = 0.7;
/// A longer candidate above this ratio suppresses a tier-2 hit it contains.
pub const LONGER_NAME_THRESHOLD: f64 = 0.8;
/// Minimum score for [`ShowResolver::suggest`] (exclusive).
pub const SUGGESTION_THRESHOLD: f64 = 0.4;
/// Default number of suggestions.
pub const DEFAULT_SUGGESTIONS: usize = 5;

/// Score for a library title equal to the query's part before a colon.
pub const LIBRARY_PREFIX_SCORE: f64 = 0.95;
/// Minimum ratio for a library title to be offered (exclusive).
pub const LIBRARY_SUGGESTION_THRESHOLD: f64 = 0.6;

const WORD_BONUS_STEP: f64 = 0.1;
const WORD_BONUS_CAP: f64 = 0.3;
const MULTI_WORD_BONUS: f64 = 0.1;
const SUBSET_SCORE_CAP: f64 = 0.99;

/// How a show match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowMatchKind {
    ExactTitle,
    ExactVariation,
    WordSubset,
    Similarity,
}

/// A resolved roster show.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowMatch {
    pub id: String,
    pub score: f64,
    pub kind: ShowMatchKind,
    pub variation: String,
}

/// Whether a tier-3 score is good enough to resolve without asking.
pub fn accepts_show_score(score: f64) -> bool {
    score >= SHOW_MATCH_THRESHOLD
}

/// Human-readable form of a roster show id.
pub fn display_form(show_id: &str) -> String {
    show_id.replace('-', " ")
}

/// Maps library titles onto roster show ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowResolver;

impl ShowResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `library_title` to one of `candidates`, or `None` when no
    /// candidate is a confident match.
    pub fn resolve<S: AsRef<str>>(&self, library_title: &str, candidates: &[S]) -> Option<ShowMatch> {
        let displays: Vec<(&str, String)> = candidates
            .iter()
            .map(|c| (c.as_ref(), display_form(c.as_ref())))
            .collect();

        let folded_title = fold_diacritics(library_title);
        for (id, display) in &displays {
            if folded_title == fold_diacritics(display) {
                log::debug!("Exact title match: {}", id);
                return Some(ShowMatch {
                    id: id.to_string(),
                    score: 1.0,
                    kind: ShowMatchKind::ExactTitle,
                    variation: folded_title,
                });
            }
        }

        let variations = variations::generate(library_title);
        log::debug!("Trying variations: {}", variations.join(", "));

        if let Some(hit) = self.exact_variation(library_title, &variations, &displays) {
            return Some(hit);
        }

        let best = self.best_scored(&variations, &displays)?;
        if accepts_show_score(best.score) {
            log::debug!(
                "Scored match: {} ({:.0}%, variation '{}')",
                best.id,
                best.score * 100.0,
                best.variation
            );
            Some(best)
        } else {
            log::debug!(
                "Best candidate {} scored {:.2}, below {:.2}",
                best.id,
                best.score,
                SHOW_MATCH_THRESHOLD
            );
            None
        }
    }

    /// Top `limit` candidates scoring above the suggestion threshold, best first.
    pub fn suggest<S: AsRef<str>>(
        &self,
        library_title: &str,
        candidates: &[S],
        limit: usize,
    ) -> Vec<(String, f64)> {
        let variations = variations::generate(library_title);

        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .filter_map(|candidate| {
                let display = display_form(candidate.as_ref());
                let best = variations
                    .iter()
                    .map(|v| ratio(&display, v))
                    .fold(0.0, f64::max);
                (best > SUGGESTION_THRESHOLD).then(|| (candidate.as_ref().to_string(), best))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        scored
    }

    fn exact_variation(
        &self,
        library_title: &str,
        variations: &[String],
        displays: &[(&str, String)],
    ) -> Option<ShowMatch> {
        let mut by_length: Vec<&String> = variations.iter().collect();
        by_length.sort_by_key(|v| std::cmp::Reverse(v.chars().count()));

        let lowered_title = library_title.to_lowercase();

        for variation in by_length {
            for (id, display) in displays {
                if variation != display {
                    continue;
                }

                let shadowed_by = displays.iter().find(|(_, other)| {
                    other != display
                        && other.contains(display.as_str())
                        && ratio(&lowered_title, other) > LONGER_NAME_THRESHOLD
                });

                match shadowed_by {
                    Some((longer, _)) => {
                        log::debug!("Skipping '{}': longer candidate '{}' fits better", id, longer);
                    }
                    None => {
                        return Some(ShowMatch {
                            id: id.to_string(),
                            score: 1.0,
                            kind: ShowMatchKind::ExactVariation,
                            variation: variation.clone(),
                        });
                    }
                }
            }
        }

        None
    }

    fn best_scored(&self, variations: &[String], displays: &[(&str, String)]) -> Option<ShowMatch> {
        let mut best: Option<ShowMatch> = None;

        for (id, display) in displays {
            let candidate_words: HashSet<&str> = display.split_whitespace().collect();
            let mut candidate_best: Option<ShowMatch> = None;
            let mut candidate_score = 0.0;

            for variation in variations {
                let variation_words: HashSet<&str> = variation.split_whitespace().collect();
                let shared = candidate_words.intersection(&variation_words).count();
                let is_subset = shared >= 2
                    && (candidate_words.is_subset(&variation_words)
                        || variation_words.is_subset(&candidate_words));

                let similarity = ratio(display, variation);

                let (score, kind) = if is_subset {
                    let mut adjusted =
                        similarity + (shared as f64 * WORD_BONUS_STEP).min(WORD_BONUS_CAP);
                    if variation_words.len() >= 2 && candidate_words.len() >= 2 {
                        adjusted += MULTI_WORD_BONUS;
                    }
                    (adjusted.min(SUBSET_SCORE_CAP), ShowMatchKind::WordSubset)
                } else {
                    (similarity, ShowMatchKind::Similarity)
                };

                if score > candidate_score {
                    candidate_score = score;
                    candidate_best = Some(ShowMatch {
                        id: id.to_string(),
                        score,
                        kind,
                        variation: variation.clone(),
                    });
                }
            }

            if let Some(candidate) = candidate_best {
                if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}

/// Rank local library titles against a free-text query, best first.
///
/// Exact (case-insensitive) titles score 1.0, titles whose part before a
/// colon equals the query score [`LIBRARY_PREFIX_SCORE`], anything else keeps
/// its similarity ratio when above [`LIBRARY_SUGGESTION_THRESHOLD`].
pub fn rank_library_titles<S: AsRef<str>>(query: &str, titles: &[S]) -> Vec<(String, f64)> {
    let query = query.trim().to_lowercase();

    let mut ranked: Vec<(String, f64)> = titles
        .iter()
        .filter_map(|title| {
            let title = title.as_ref();
            let lowered = title.to_lowercase();
            if lowered == query {
                return Some((title.to_string(), 1.0));
            }
            if let Some((before, _)) = lowered.split_once(':') {
                if before.trim() == query {
                    return Some((title.to_string(), LIBRARY_PREFIX_SCORE));
                }
            }
            let similarity = ratio(&query, &lowered);
            (similarity > LIBRARY_SUGGESTION_THRESHOLD).then(|| (title.to_string(), similarity))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}
