//! Episode title normalization.

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static PART_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:part\s+)+(\d+)").unwrap());
static PAREN_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());
static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+x\d+\s*").unwrap());
static STOP_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:episode|ep|the|and)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize a title for comparison.
///
/// `Part 2`, `part  2` and `(2)` all collapse to `2`; `1x22` markers and the
/// words `episode`, `ep`, `the`, `and` disappear; punctuation becomes
/// whitespace and whitespace is collapsed. The result is a fixed point:
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(title: &str) -> String {
    // After the first pass every further pass only deletes text.
    let mut current = single_pass(title);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn single_pass(title: &str) -> String {
    let title = NON_WORD.replace_all(title, " ").to_lowercase();
    let title = PART_NUMBER.replace_all(&title, "$1");
    let title = PAREN_NUMBER.replace_all(&title, "$1");
    let title = SEASON_EPISODE.replace_all(&title, "");
    let title = STOP_WORDS.replace_all(&title, "");
    WHITESPACE.replace_all(&title, " ").trim().to_string()
}

/// Lower-case a title and fold the long vowels used in romanized titles.
pub fn fold_diacritics(title: &str) -> String {
    title.to_lowercase().replace('ū', "u").replace('ō', "o")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("Enter: Naruto Uzumaki!"), "enter naruto uzumaki");
    }

    #[test]
    fn part_and_parenthesized_numbers_agree() {
        assert_eq!(normalize("The Battle, Part 2"), "battle 2");
        assert_eq!(normalize("The Battle (2)"), "battle 2");
    }

    #[test]
    fn drops_episode_markers_and_stop_words() {
        assert_eq!(normalize("1x22 Episode of the Hunt"), "of hunt");
        assert_eq!(normalize("Ep and Theory"), "theory");
    }

    #[test]
    fn stop_words_are_whole_words_only() {
        assert_eq!(normalize("Theater of Epic Andromeda"), "theater of epic andromeda");
    }

    #[test]
    fn repeated_part_markers_collapse() {
        assert_eq!(normalize(&format!("{}2", "part ".repeat(12))), "2");
        assert_eq!(normalize("Part Part 3"), "3");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  !!  "), "");
    }

    #[test]
    fn normalization_is_stable() {
        let samples = [
            "Enter: Naruto Uzumaki!",
            "part part 2",
            "Part the 3",
            "The Battle, Part 2",
            "1x1x2 Prologue",
            "Stage 3 - The Black Knights",
            "Kakashi: Shadow of the ANBU Black Ops - The Night of the Full Moon",
            "episode: boys' life on the battlefield",
            "",
        ];
        let repeated_parts = format!("{}2", "part ".repeat(12));
        let samples = samples
            .into_iter()
            .chain([repeated_parts.as_str(), "Part (Part 2)"]);
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "unstable for {sample:?}");
        }
    }

    #[test]
    fn folds_long_vowels() {
        assert_eq!(fold_diacritics("Naruto Shippūden"), "naruto shippuden");
        assert_eq!(fold_diacritics("Kōtetsujō"), "kotetsujo");
    }
}
