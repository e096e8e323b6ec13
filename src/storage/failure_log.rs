//! Persisted log of episodes that could not be matched.
//!
//! The file is line-oriented so it can be read and edited by hand:
//!
//! ```text
//! --- 2026-10-16 12:00:00 ---
//! Show: naruto
//! Episode Type: filler
//! Failed Episodes: 2
//! 1. The Search for the Rare Bikochu Beetle
//! 2. Kurenai's Decision
//! ---
//! ```
//!
//! Each run keeps one entry per show and episode type; `clean-failures`
//! rewrites the file without the
//! episodes that have since been mapped by hand.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::EpisodeType;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One failure block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub timestamp: String,
    pub show: String,
    /// Short type key (`filler`, `manga`, `anime`, `mixed`) or the raw label
    pub episode_type: String,
    pub episodes: Vec<String>,
}

impl FailureEntry {
    pub fn new(show: impl Into<String>, episode_type: EpisodeType, episodes: Vec<String>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            show: show.into(),
            episode_type: episode_type.key().to_string(),
            episodes,
        }
    }

    /// Whether this entry is about `show` (or one of its aliases) and `episode_type`.
    pub fn concerns(&self, shows: &[&str], episode_type: &str) -> bool {
        let show = base_show_name(&self.show);
        shows.iter().any(|s| s.trim().to_lowercase() == show)
            && type_key(&self.episode_type) == type_key(episode_type)
    }

    /// Render as a block, preceded by a blank line.
    pub fn render(&self) -> String {
        let mut out = format!(
            "\n--- {} ---\nShow: {}\nEpisode Type: {}\nFailed Episodes: {}\n",
            self.timestamp,
            self.show,
            self.episode_type,
            self.episodes.len()
        );
        for (i, name) in self.episodes.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, name));
        }
        out.push_str("---\n");
        out
    }
}

/// Show names may carry a parenthesized suffix, e.g. `naruto (Naruto)`.
fn base_show_name(raw: &str) -> String {
    raw.split(" (").next().unwrap_or(raw).trim().to_lowercase()
}

/// Canonical type key; spelled-out labels such as `manga canon` map to `manga`.
fn type_key(raw: &str) -> String {
    raw.parse::<EpisodeType>()
        .map(|t| t.key().to_string())
        .unwrap_or_else(|_| raw.trim().to_lowercase())
}

/// Parse every entry of a failure log.
///
/// `#` comment lines are ignored, the legacy `Anime:` key is read as
/// `Show:`, and `Details:` sections are skipped. An entry cut off at the end
/// of the file is kept.
pub fn parse(text: &str) -> Vec<FailureEntry> {
    let mut entries = Vec::new();
    let mut current: Option<FailureEntry> = None;
    let mut in_list = false;
    let mut in_details = false;

    for line in text.lines() {
        let trimmed = line.trim_end();

        if trimmed.starts_with("---") {
            match current.take() {
                Some(entry) => entries.push(entry),
                None => {
                    current = Some(FailureEntry {
                        timestamp: trimmed.trim_matches(|c| c == '-' || c == ' ').to_string(),
                        show: String::new(),
                        episode_type: String::new(),
                        episodes: Vec::new(),
                    });
                }
            }
            in_list = false;
            in_details = false;
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };

        if in_details || trimmed.starts_with('#') {
            continue;
        }

        if let Some(show) = trimmed
            .strip_prefix("Show:")
            .or_else(|| trimmed.strip_prefix("Anime:"))
        {
            entry.show = show.trim().to_string();
        } else if let Some(kind) = trimmed.strip_prefix("Episode Type:") {
            entry.episode_type = type_key(kind);
        } else if trimmed.starts_with("Failed Episodes:") {
            in_list = true;
        } else if trimmed.starts_with("Details:") {
            in_details = true;
        } else if in_list {
            if let Some(name) = numbered_name(trimmed) {
                entry.episodes.push(name.to_string());
            }
        }
    }

    if let Some(entry) = current {
        if !entry.show.is_empty() {
            entries.push(entry);
        }
    }

    entries
}

/// Comment lines before the first entry, newline-terminated.
fn leading_comments(text: &str) -> String {
    text.lines()
        .take_while(|line| !line.starts_with("---"))
        .filter(|line| line.starts_with('#'))
        .map(|line| format!("{line}\n"))
        .collect()
}

fn numbered_name(line: &str) -> Option<&str> {
    let (number, name) = line.split_once(". ")?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(name.trim())
}

/// Failure log file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write the whole file atomically (write to temp, then rename).
    async fn write_all(&self, contents: &str) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Store `entry` as the only entry for its show and episode type.
    ///
    /// Older entries with the same key are replaced; an entry without
    /// episodes only removes them. Leading `#` comment lines are kept.
    pub async fn record(&self, entry: &FailureEntry) -> Result<()> {
        let existing = self.read().await?;
        if existing.is_none() && entry.episodes.is_empty() {
            return Ok(());
        }

        let text = existing.unwrap_or_default();
        let mut entries = parse(&text);
        let before = entries.len();
        entries.retain(|e| !e.concerns(&[entry.show.as_str()], &entry.episode_type));
        let replaced = before - entries.len();

        if replaced == 0 && entry.episodes.is_empty() {
            return Ok(());
        }
        if !entry.episodes.is_empty() {
            entries.push(entry.clone());
        }

        let mut contents = leading_comments(&text);
        if contents.is_empty() {
            contents = format!(
                "# Mapping errors log - Created {}\n",
                Local::now().format(TIMESTAMP_FORMAT)
            );
        }
        for e in &entries {
            contents.push_str(&e.render());
        }

        self.write_all(&contents).await?;
        log::debug!(
            "Recorded {} failure(s) for {} ({}), replacing {} entr{}",
            entry.episodes.len(),
            entry.show,
            entry.episode_type,
            replaced,
            if replaced == 1 { "y" } else { "ies" }
        );
        Ok(())
    }

    /// All entries; a missing file has none.
    pub async fn load(&self) -> Result<Vec<FailureEntry>> {
        Ok(self.read().await?.map(|text| parse(&text)).unwrap_or_default())
    }

    /// Remove `fixed` episode names from entries about `shows` / `episode_type`.
    ///
    /// The previous file is kept as `<name>.bak`. Remaining entries are
    /// renumbered and entries left empty are dropped. Returns the number of
    /// removed episodes plus dropped entries.
    pub async fn remove_fixed(
        &self,
        shows: &[&str],
        episode_type: &str,
        fixed: &[String],
    ) -> Result<usize> {
        let Some(text) = self.read().await? else {
            log::warn!("Failure log not found: {}", self.path.display());
            return Ok(0);
        };

        tokio::fs::copy(&self.path, self.backup_path()).await?;

        let mut removed = 0;
        let mut kept = Vec::new();

        for mut entry in parse(&text) {
            if !entry.concerns(shows, episode_type) {
                kept.push(entry);
                continue;
            }

            let before = entry.episodes.len();
            entry.episodes.retain(|name| !fixed.contains(name));
            removed += before - entry.episodes.len();

            if entry.episodes.is_empty() {
                removed += 1;
            } else {
                kept.push(entry);
            }
        }

        let show = shows.first().copied().unwrap_or_default();
        let mut contents = format!(
            "# Mapping errors log - Updated {}\n# Removed {} fixed entries for {} ({})\n\n",
            Local::now().format(TIMESTAMP_FORMAT),
            removed,
            show,
            episode_type
        );
        for entry in &kept {
            contents.push_str(&entry.render());
        }

        self.write_all(&contents).await?;
        log::info!(
            "Removed {} fixed entries for {} ({}) from {}",
            removed,
            show,
            episode_type,
            self.path.display()
        );
        Ok(removed)
    }

    /// Truncate the log to a single header line.
    pub async fn clear(&self) -> Result<()> {
        let header = format!(
            "# Mapping errors log - Created {}\n",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        self.write_all(&header).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# Mapping errors log - Created 2026-01-01 00:00:00

--- 2026-01-02 10:00:00 ---
Anime: naruto (Naruto)
Episode Type: FILLER
Failed Episodes: 2
1. Kakashi's Return
2. The Lost Story
Details:
- Failed to find match for kakashi's return
---

--- 2026-01-03 10:00:00 ---
Show: bleach
Episode Type: manga canon
Failed Episodes: 1
1. The Day I Became a Shinigami
---
";

    #[test]
    fn test_parse_tolerates_legacy_shapes() {
        let entries = parse(SAMPLE);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].timestamp, "2026-01-02 10:00:00");
        assert_eq!(entries[0].show, "naruto (Naruto)");
        assert_eq!(entries[0].episode_type, "filler");
        assert_eq!(entries[0].episodes, vec!["Kakashi's Return", "The Lost Story"]);

        assert_eq!(entries[1].show, "bleach");
        assert_eq!(entries[1].episode_type, "manga");
    }

    #[test]
    fn test_render_parses_back() {
        let entry = FailureEntry::new(
            "one-piece",
            EpisodeType::Mixed,
            vec!["Romance Dawn".to_string(), "1. Numbered Title".to_string()],
        );
        let parsed = parse(&entry.render());
        assert_eq!(parsed, vec![entry]);
    }

    #[test]
    fn test_truncated_entry_is_kept() {
        let entries = parse("--- 2026-01-01 ---\nShow: naruto\nEpisode Type: anime\nFailed Episodes: 1\n1. A");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].episodes, vec!["A"]);
    }

    #[tokio::test]
    async fn test_record_and_load() {
        let dir = TempDir::new().unwrap();
        let log = FailureLog::new(dir.path().join("data/failed_episodes.log"));

        log.record(&FailureEntry::new("naruto", EpisodeType::Filler, vec!["A".into()]))
            .await
            .unwrap();
        log.record(&FailureEntry::new("bleach", EpisodeType::AnimeCanon, vec!["B".into()]))
            .await
            .unwrap();

        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].show, "bleach");
        assert_eq!(entries[1].episode_type, "anime");

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.starts_with("# Mapping errors log - Created"));
    }

    #[tokio::test]
    async fn test_repeated_runs_keep_one_entry_per_show_and_type() {
        let dir = TempDir::new().unwrap();
        let log = FailureLog::new(dir.path().join("failed_episodes.log"));

        for _ in 0..3 {
            log.record(&FailureEntry::new("naruto", EpisodeType::Filler, vec!["Lost".into()]))
                .await
                .unwrap();
        }
        log.record(&FailureEntry::new("naruto", EpisodeType::MangaCanon, vec!["Other".into()]))
            .await
            .unwrap();

        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().filter(|e| e.concerns(&["naruto"], "filler")).count(), 1);
    }

    #[tokio::test]
    async fn test_record_replaces_legacy_entry_and_keeps_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_episodes.log");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let log = FailureLog::new(&path);

        log.record(&FailureEntry::new("naruto", EpisodeType::Filler, vec!["Only This".into()]))
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("# Mapping errors log - Created 2026-01-01 00:00:00\n"));
        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].show, "bleach");
        assert_eq!(entries[1].episodes, vec!["Only This"]);
    }

    #[tokio::test]
    async fn test_empty_record_clears_stale_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_episodes.log");
        let log = FailureLog::new(&path);

        log.record(&FailureEntry::new("naruto", EpisodeType::Filler, vec![]))
            .await
            .unwrap();
        assert!(!path.exists());

        tokio::fs::write(&path, SAMPLE).await.unwrap();
        log.record(&FailureEntry::new("bleach", EpisodeType::MangaCanon, vec![]))
            .await
            .unwrap();
        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].show, "naruto (Naruto)");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let log = FailureLog::new(dir.path().join("missing.log"));
        assert!(log.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_fixed_renumbers_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_episodes.log");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let log = FailureLog::new(&path);

        let removed = log
            .remove_fixed(&["naruto"], "filler", &["Kakashi's Return".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let backup = tokio::fs::read_to_string(dir.path().join("failed_episodes.log.bak"))
            .await
            .unwrap();
        assert_eq!(backup, SAMPLE);

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("# Mapping errors log - Updated"));
        assert!(text.contains("# Removed 1 fixed entries for naruto (filler)"));
        assert!(text.contains("Failed Episodes: 1\n1. The Lost Story\n"));
        assert!(!text.contains("Details:"));

        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].episodes, vec!["The Lost Story"]);
    }

    #[tokio::test]
    async fn test_remove_fixed_drops_empty_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_episodes.log");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let log = FailureLog::new(&path);

        let removed = log
            .remove_fixed(
                &["bleach"],
                "manga",
                &["The Day I Became a Shinigami".to_string()],
            )
            .await
            .unwrap();
        // one episode plus the emptied entry
        assert_eq!(removed, 2);

        let entries = log.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].show, "naruto (Naruto)");
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_episodes.log");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let log = FailureLog::new(&path);

        log.clear().await.unwrap();
        assert!(log.load().await.unwrap().is_empty());
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("# Mapping errors log - Created"));
    }
}
