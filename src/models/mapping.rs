//! Per-show title cleanup rules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Title cleanup applied to roster episode names before matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMappingRule {
    /// Literal substrings removed from every title
    #[serde(default)]
    pub remove_patterns: Vec<String>,

    /// Numbers removed in their zero-padded two-digit form
    #[serde(default)]
    pub remove_numbers: Vec<u32>,

    /// Drop every `-`
    #[serde(default)]
    pub remove_dashes: bool,

    /// Raw roster name -> catalog title
    #[serde(default)]
    pub special_matches: HashMap<String, String>,
}

impl TitleMappingRule {
    /// Apply the scraper-side cleanup to a roster episode name.
    pub fn apply(&self, name: &str) -> String {
        let mut name = name.trim().to_string();

        for pattern in self.remove_patterns.iter().filter(|p| !p.is_empty()) {
            name = name.replace(pattern.as_str(), "").trim().to_string();
        }

        for number in &self.remove_numbers {
            name = name.replace(&format!("{number:02}"), "").trim().to_string();
        }

        if self.remove_dashes {
            name = name.replace('-', "").trim().to_string();
        }

        match self.special_matches.get(&name) {
            Some(mapped) => mapped.clone(),
            None => name,
        }
    }

    /// Look up a special match for an already lower-cased title.
    ///
    /// The mapped value is lower-cased and a leading `episode: ` is dropped.
    pub fn special_match(&self, lowered_title: &str) -> Option<String> {
        let mapped = self
            .special_matches
            .iter()
            .find(|(raw, _)| raw.to_lowercase() == lowered_title)
            .map(|(_, mapped)| mapped.to_lowercase())?;

        Some(match mapped.strip_prefix("episode: ") {
            Some(rest) => rest.to_string(),
            None => mapped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> TitleMappingRule {
        TitleMappingRule {
            remove_patterns: vec!["[Recap]".to_string()],
            remove_numbers: vec![7],
            remove_dashes: true,
            special_matches: HashMap::from([
                ("Kakashi Chronicles".to_string(), "Episode: Boys' Life on the Battlefield".to_string()),
                ("The Ninja".to_string(), "A Ninja Mapped".to_string()),
            ]),
        }
    }

    #[test]
    fn apply_removes_patterns_numbers_and_dashes() {
        assert_eq!(
            rule().apply("[Recap] Road to 07 Home-coming"),
            "Road to  Homecoming"
        );
    }

    #[test]
    fn apply_substitutes_special_matches_after_cleanup() {
        assert_eq!(rule().apply(" The Ninja "), "A Ninja Mapped");
    }

    #[test]
    fn special_match_strips_episode_prefix() {
        assert_eq!(
            rule().special_match("kakashi chronicles").as_deref(),
            Some("boys' life on the battlefield")
        );
        assert_eq!(rule().special_match("unmapped"), None);
    }

    #[test]
    fn default_rule_is_identity() {
        assert_eq!(TitleMappingRule::default().apply("Enter: Naruto"), "Enter: Naruto");
    }
}
