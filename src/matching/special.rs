//! Per-show episode numbering overrides.
//!
//! Some roster sites number episodes with their own in-show scheme ("Stage 3",
//! "Turn 12") that does not line up with catalog absolute numbers. Each
//! [`SpecialCase`] maps such titles onto catalog season/episode pairs. New
//! shows are added by extending [`SPECIAL_CASES`].

use std::sync::LazyLock;

use regex::Regex;

/// How the episode number is obtained from a title prefix.
#[derive(Debug, Clone, Copy)]
pub enum EpisodeNumbering {
    /// The prefix is followed by the episode number.
    Captured,
    /// The prefix always denotes this episode, with a fallback title.
    Fixed { episode: u32, title: &'static str },
}

/// One prefix rule, e.g. `Stage <n>` → season 1.
#[derive(Debug, Clone, Copy)]
pub struct PrefixRule {
    pub prefix: &'static str,
    pub season: u32,
    pub numbering: EpisodeNumbering,
}

/// Rules applying to a group of roster show ids.
#[derive(Debug)]
pub struct SpecialCase {
    pub show_ids: &'static [&'static str],
    pub rules: &'static [PrefixRule],
}

/// Season/episode extracted from a title, plus the remaining title text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialEpisode {
    pub season: u32,
    pub episode: u32,
    pub title: String,
}

pub static SPECIAL_CASES: &[SpecialCase] = &[SpecialCase {
    show_ids: &["code-geass", "code-geass-lelouch-of-the-rebellion"],
    rules: &[
        PrefixRule {
            prefix: "Stage",
            season: 1,
            numbering: EpisodeNumbering::Captured,
        },
        PrefixRule {
            prefix: "Turn",
            season: 2,
            numbering: EpisodeNumbering::Captured,
        },
        PrefixRule {
            prefix: "Final Turn",
            season: 2,
            numbering: EpisodeNumbering::Fixed {
                episode: 25,
                title: "Re;",
            },
        },
    ],
}];

struct CompiledRule {
    rule: PrefixRule,
    pattern: Regex,
}

static COMPILED: LazyLock<Vec<Vec<CompiledRule>>> = LazyLock::new(|| {
    SPECIAL_CASES
        .iter()
        .map(|case| case.rules.iter().filter_map(compile).collect())
        .collect()
});

fn compile(rule: &PrefixRule) -> Option<CompiledRule> {
    let prefix = regex::escape(rule.prefix);
    let source = match rule.numbering {
        EpisodeNumbering::Captured => format!(r"^{prefix}\s+(\d+)(?:\s*-\s*)?(.+)?"),
        EpisodeNumbering::Fixed { .. } => format!(r"^{prefix}(?:\s*-\s*)?(.+)?"),
    };
    match Regex::new(&source) {
        Ok(pattern) => Some(CompiledRule {
            rule: *rule,
            pattern,
        }),
        Err(e) => {
            log::error!("Invalid special-case pattern for '{}': {}", rule.prefix, e);
            None
        }
    }
}

/// The special case registered for `show_id`, if any (case-insensitive).
pub fn lookup(show_id: &str) -> Option<&'static SpecialCase> {
    let show_id = show_id.to_lowercase();
    SPECIAL_CASES
        .iter()
        .find(|case| case.show_ids.contains(&show_id.as_str()))
}

impl SpecialCase {
    fn position(&self) -> Option<usize> {
        SPECIAL_CASES.iter().position(|case| std::ptr::eq(case, self))
    }

    /// Extract season and episode from `title`.
    ///
    /// Without a suffix the title falls back to `Episode <n>` (or the rule's
    /// fixed title).
    pub fn parse(&self, title: &str) -> Option<SpecialEpisode> {
        let rules = COMPILED.get(self.position()?)?;

        rules.iter().find_map(|compiled| {
            let captures = compiled.pattern.captures(title)?;
            match compiled.rule.numbering {
                EpisodeNumbering::Captured => {
                    let episode: u32 = captures.get(1)?.as_str().parse().ok()?;
                    if episode == 0 {
                        return None;
                    }
                    let title = captures
                        .get(2)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| format!("Episode {episode}"));
                    Some(SpecialEpisode {
                        season: compiled.rule.season,
                        episode,
                        title,
                    })
                }
                EpisodeNumbering::Fixed { episode, title: fallback } => {
                    let title = captures
                        .get(1)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| fallback.to_string());
                    Some(SpecialEpisode {
                        season: compiled.rule.season,
                        episode,
                        title,
                    })
                }
            }
        })
    }
}
