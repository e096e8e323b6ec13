//! Alternate spellings of a library title, in matching precedence order.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::fold_diacritics;

/// Substrings that mark a title as the sequel of another series.
const SEQUEL_MARKERS: &[&str] = &[
    " shippuden",
    " shippūden",
    " boruto",
    ": boruto",
    " next generations",
    " the next generation",
    ": brotherhood",
    " brotherhood",
    " season 2",
    " 2nd season",
    " second season",
    " part 2",
    " part ii",
];

/// First words shared by a parent series and its sequels.
const FRANCHISE_ROOTS: &[&str] = &["naruto", "boruto", "dragon", "one", "my", "attack", "demon"];

/// Short words dropped from the key-words variation.
const KEY_WORD_STOP_LIST: &[&str] = &["with", "from", "that", "this", "what"];

static ARTICLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:the|a|an|of|and)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Variations of a title plus whether it was detected as a sequel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleVariations {
    pub variations: Vec<String>,
    pub is_sequel: bool,
}

/// Generate unique variations of `title`, highest precedence first.
pub fn generate(title: &str) -> Vec<String> {
    generate_detailed(title).variations
}

/// Like [`generate`], also reporting sequel detection.
pub fn generate_detailed(title: &str) -> TitleVariations {
    let clean = fold_diacritics(title);
    let mut variations = vec![clean.clone()];

    let is_sequel = SEQUEL_MARKERS.iter().any(|marker| clean.contains(marker));
    if is_sequel {
        let sequel_name = clean.replace(':', " ").replace("  ", " ").trim().to_string();
        if sequel_name != clean {
            variations.insert(1, sequel_name);
        }
    } else {
        // Parent-series variations; sequels never get these.
        if let Some((before, after)) = clean.split_once(':') {
            variations.push(before.trim().to_string());
            variations.push(after.trim().to_string());
            variations.push(clean.replace(':', " ").trim().to_string());
            variations.push(clean.replace(':', "").trim().to_string());
        }

        let words: Vec<&str> = clean.split_whitespace().collect();
        if words.len() >= 3 {
            variations.push(words[..3].join(" "));
        }
        if words.len() >= 2 {
            variations.push(words[..2].join(" "));
        }
        if let Some(first) = words.first() {
            if !FRANCHISE_ROOTS.contains(first) {
                variations.push(first.to_string());
            }
        }
    }

    let simplified = ARTICLES.replace_all(&clean, "");
    let simplified = WHITESPACE.replace_all(&simplified, " ").trim().to_string();
    if simplified != clean {
        variations.push(simplified);
    }

    let key_words: Vec<&str> = clean
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && !KEY_WORD_STOP_LIST.contains(w))
        .collect();
    if !key_words.is_empty() {
        let key_words = key_words.join(" ");
        if key_words != clean {
            variations.push(key_words);
        }
    }

    let mut unique: Vec<String> = Vec::with_capacity(variations.len());
    for variation in variations {
        if !variation.is_empty() && !unique.contains(&variation) {
            unique.push(variation);
        }
    }

    if is_sequel && unique.first() != Some(&clean) {
        unique.retain(|v| v != &clean);
        unique.insert(0, clean);
    }

    TitleVariations {
        variations: unique,
        is_sequel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_title_comes_first() {
        let variations = generate("Attack on Titan");
        assert_eq!(variations[0], "attack on titan");
    }

    #[test]
    fn sequel_never_yields_base_name() {
        let detailed = generate_detailed("Naruto: Shippūden");
        assert!(detailed.is_sequel);
        assert_eq!(
            detailed.variations,
            vec!["naruto: shippuden".to_string(), "naruto shippuden".to_string()]
        );
        assert!(!detailed.variations.iter().any(|v| v == "naruto"));
    }

    #[test]
    fn brotherhood_is_a_sequel() {
        let variations = generate("Fullmetal Alchemist: Brotherhood");
        assert_eq!(variations[0], "fullmetal alchemist: brotherhood");
        assert_eq!(variations[1], "fullmetal alchemist brotherhood");
        assert!(!variations.iter().any(|v| v == "fullmetal alchemist"));
        assert!(!variations.iter().any(|v| v == "fullmetal"));
    }

    #[test]
    fn colon_titles_split_for_non_sequels() {
        let variations = generate("Code Geass: Lelouch of the Rebellion");
        assert_eq!(
            variations,
            vec![
                "code geass: lelouch of the rebellion",
                "code geass",
                "lelouch of the rebellion",
                "code geass  lelouch of the rebellion",
                "code geass lelouch of the rebellion",
                "code geass: lelouch",
                "code geass:",
                "code",
                "code geass: lelouch rebellion",
            ]
        );
    }

    #[test]
    fn franchise_roots_do_not_become_single_word_variations() {
        let variations = generate("Demon Slayer");
        assert!(variations.contains(&"demon slayer".to_string()));
        assert!(!variations.contains(&"demon".to_string()));

        let variations = generate("Bleach Thousand Year");
        assert!(variations.contains(&"bleach".to_string()));
    }

    #[test]
    fn variations_are_unique() {
        let variations = generate("One Piece");
        let mut sorted = variations.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), variations.len());
        assert_eq!(variations, vec!["one piece".to_string(), "piece".to_string()]);
    }
}
