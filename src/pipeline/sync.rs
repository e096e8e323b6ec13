// src/pipeline/sync.rs

//! Per-show synchronization and the multi-show batch.
//!
//! One run: resolve the roster show, scrape its episodes, index the catalog
//! seasons, snapshot the destination list, reconcile, and record failures.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::matching::resolver::{DEFAULT_SUGGESTIONS, ShowResolver, rank_library_titles};
use crate::matching::{EpisodeMatcher, special};
use crate::models::{Config, EpisodeType, ListSnapshot, MatchMode, ReconciliationReport, ShowConfig};
use crate::pipeline::index::build_index;
use crate::pipeline::reconcile::{ListReconciler, ReconcileOptions, plan};
use crate::services::{CatalogClient, RosterScraper};
use crate::storage::{FailureEntry, FailureLog};
use crate::utils::{display, list_name, list_url, show_slug};

/// Name of the command that removes hand-fixed entries from the failure log.
pub const REMEDIATION_COMMAND: &str = "fillersync clean-failures";

/// Services shared by every run.
pub struct SyncContext {
    pub config: Arc<Config>,
    pub roster: RosterScraper,
    pub catalog: CatalogClient,
    pub failure_log: FailureLog,
}

impl SyncContext {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        Ok(Self {
            roster: RosterScraper::new(Arc::clone(&config))?,
            catalog: CatalogClient::new(Arc::clone(&config))?,
            failure_log: FailureLog::new(config.paths.failure_log_path()),
            config,
        })
    }
}

/// What to synchronize.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Library title or roster show id
    pub show: String,
    pub episode_type: EpisodeType,
    /// Falls back to `sync.match_by`
    pub mode: Option<MatchMode>,
    pub dry_run: bool,
}

/// Result of one show/type run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub roster_id: String,
    pub episode_type: EpisodeType,
    pub list_name: String,
    pub list_url: String,
    pub dry_run: bool,
    /// Episodes that would be added (dry run) or were submitted
    pub planned: usize,
    pub report: ReconciliationReport,
}

/// Pick the roster show for `title` among `candidates`.
///
/// An exact id wins; otherwise the resolver decides, and a miss becomes
/// [`AppError::Resolve`] carrying the closest ids.
pub fn pick_roster_id(title: &str, candidates: &[String]) -> Result<String> {
    let trimmed = title.trim();
    if candidates.iter().any(|c| c == trimmed) {
        return Ok(trimmed.to_string());
    }

    let resolver = ShowResolver::new();
    if let Some(found) = resolver.resolve(trimmed, candidates) {
        log::info!(
            "Resolved '{}' to '{}' ({:.0}%)",
            trimmed,
            found.id,
            found.score * 100.0
        );
        return Ok(found.id);
    }

    let suggestions = resolver
        .suggest(trimmed, candidates, DEFAULT_SUGGESTIONS)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    Err(AppError::resolve(trimmed, suggestions))
}

/// Configured show for `query`: exact roster id or library title first, then
/// the best-ranked library title.
pub fn configured_show<'a>(config: &'a Config, query: &str) -> Option<&'a ShowConfig> {
    if let Some(show) = config.find_show(query) {
        return Some(show);
    }

    let titles: Vec<&str> = config
        .shows
        .iter()
        .map(|s| s.library_title.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    let (best, score) = rank_library_titles(query, &titles).into_iter().next()?;
    log::debug!("'{}' ranked as configured show '{}' ({:.2})", query, best, score);
    config.shows.iter().find(|s| s.library_title == best)
}

/// Roster id for a show without touching the network: the configured id,
/// else the slug of its library title (or of `query` itself).
pub fn local_roster_id(config: &Config, query: &str) -> String {
    match configured_show(config, query) {
        Some(ShowConfig {
            roster_id: Some(id),
            ..
        }) => id.clone(),
        Some(show) if !show.library_title.is_empty() => show_slug(&show.library_title),
        _ => show_slug(query),
    }
}

/// Roster id for `title`: the configured id, else resolved against the
/// roster show index.
pub async fn resolve_roster_id(
    roster: &RosterScraper,
    title: &str,
    show: Option<&ShowConfig>,
) -> Result<String> {
    if let Some(id) = show.and_then(|s| s.roster_id.as_deref()) {
        return Ok(id.to_string());
    }
    let candidates = roster.list_shows().await?;
    pick_roster_id(title, &candidates)
}

/// Synchronize one show's list for one episode type.
pub async fn run_sync(ctx: &SyncContext, request: &SyncRequest) -> Result<SyncOutcome> {
    let show_config = configured_show(&ctx.config, &request.show);
    let roster_id = resolve_roster_id(&ctx.roster, &request.show, show_config).await?;
    sync_resolved(ctx, request, show_config, roster_id).await
}

async fn sync_resolved(
    ctx: &SyncContext,
    request: &SyncRequest,
    show_config: Option<&ShowConfig>,
    roster_id: String,
) -> Result<SyncOutcome> {
    let config = &ctx.config;
    let library_title = show_config
        .map(|s| s.library_title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(&request.show);
    let mode = request.mode.unwrap_or(config.sync.match_by);

    display::header(&format!(
        "Syncing {} episodes of {}{}",
        request.episode_type.list_label(),
        library_title,
        if request.dry_run { " (dry run)" } else { "" }
    ));

    let list_name = list_name(&roster_id, request.episode_type);
    let list_url = list_url(
        &config.catalog.site_url,
        &config.catalog.username,
        &list_name,
    );

    let mut outcome = SyncOutcome {
        roster_id: roster_id.clone(),
        episode_type: request.episode_type,
        list_name: list_name.clone(),
        list_url,
        dry_run: request.dry_run,
        planned: 0,
        report: ReconciliationReport::default(),
    };

    let desired = ctx
        .roster
        .fetch_episodes(&roster_id, Some(request.episode_type))
        .await?;
    if desired.is_empty() {
        log::warn!(
            "No {} episodes listed for {}",
            request.episode_type.list_label(),
            roster_id
        );
        return Ok(outcome);
    }

    let show_id = ctx
        .catalog
        .resolve_show_id(
            show_config.and_then(|s| s.catalog_id.as_deref()),
            show_config.and_then(|s| s.tmdb_id),
            library_title,
        )
        .await?;
    let index = build_index(&ctx.catalog.fetch_seasons(&show_id).await?);
    if index.is_empty() {
        log::warn!("Catalog show {} has no referenceable episodes", show_id);
    }
    log::info!(
        "Indexed {} catalog episodes under {} title keys",
        index.episode_count(),
        index.title_key_count()
    );

    let rule = config.title_mapping(&roster_id);
    let matcher = EpisodeMatcher::new(mode)
        .with_mapping(rule)
        .with_special_case(special::lookup(&roster_id));
    log::info!("Matching {} episodes by {}", desired.len(), matcher.mode());
    let results = matcher.match_all(&desired, &index);

    if request.dry_run {
        let existing = ctx
            .catalog
            .user_lists()
            .await?
            .into_iter()
            .find(|l| l.name == list_name);
        let snapshot = match &existing {
            Some(list) => ctx.catalog.list_snapshot(list).await?,
            None => ListSnapshot::default(),
        };

        let pending = plan(results, &snapshot);
        outcome.planned = pending.pending_count();
        if pending.is_noop() {
            log::info!("'{}' is already up to date", list_name);
        }
        for add in &pending.pending {
            for name in add.names() {
                display::sub_item(&format!("would add {} ({})", name, add.remote_id));
            }
        }
        outcome.report = pending.into_dry_run_report();
    } else {
        let list = ctx.catalog.find_or_create_list(&list_name).await?;
        let snapshot = ctx.catalog.list_snapshot(&list).await?;
        let writer = ctx.catalog.list_writer(&list)?;

        let pending = plan(results, &snapshot);
        outcome.planned = pending.pending_count();
        let reconciler = ListReconciler::new(&writer, ReconcileOptions::from(&config.sync));
        outcome.report = reconciler.apply(pending).await;

        // An empty entry drops whatever an earlier run left for this list.
        let entry = FailureEntry::new(
            &roster_id,
            request.episode_type,
            outcome.report.failed_names(),
        );
        ctx.failure_log.record(&entry).await?;
    }

    print_summary(ctx, &outcome);
    Ok(outcome)
}

fn print_summary(ctx: &SyncContext, outcome: &SyncOutcome) {
    let report = &outcome.report;
    let added_label = if outcome.dry_run { "Would add" } else { "Added" };
    let added = if outcome.dry_run {
        outcome.planned
    } else {
        report.added.len()
    };

    display::summary(
        &outcome.list_name,
        &[
            (added_label, added.to_string()),
            ("Skipped", report.skipped.len().to_string()),
            ("Failed", report.failed.len().to_string()),
            ("List", outcome.list_url.clone()),
        ],
    );

    if report.has_failures() {
        for note in &report.failure_notes {
            display::sub_item(note);
        }
        if !outcome.dry_run {
            log::warn!(
                "Failures logged to {}; fix the mappings, then run `{}`",
                ctx.failure_log.path().display(),
                REMEDIATION_COMMAND
            );
        }
    }
}

/// Totals of a multi-show batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<SyncOutcome>,
    /// (show, episode type, error message)
    pub failed: Vec<(String, EpisodeType, String)>,
}

impl BatchSummary {
    pub fn added(&self) -> usize {
        self.succeeded.iter().map(|o| o.report.added.len()).sum()
    }

    pub fn unmatched(&self) -> usize {
        self.succeeded.iter().map(|o| o.report.failed.len()).sum()
    }
}

/// Synchronize every configured show and episode type, sequentially.
///
/// A failing run is logged and recorded; the remaining runs continue.
pub async fn run_sync_all(ctx: &SyncContext, dry_run: bool) -> Result<BatchSummary> {
    let started = Utc::now();
    let shows = &ctx.config.shows;
    if shows.is_empty() {
        return Err(AppError::config("No shows configured"));
    }

    let delay = Duration::from_millis(ctx.config.http.request_delay_ms);
    let mut summary = BatchSummary::default();

    for (i, show) in shows.iter().enumerate() {
        let name = show
            .roster_id
            .clone()
            .unwrap_or_else(|| show.library_title.clone());

        match resolve_roster_id(&ctx.roster, &name, Some(show)).await {
            Ok(roster_id) => {
                for &episode_type in &show.episode_types {
                    let request = SyncRequest {
                        show: name.clone(),
                        episode_type,
                        mode: None,
                        dry_run,
                    };

                    match sync_resolved(ctx, &request, Some(show), roster_id.clone()).await {
                        Ok(outcome) => summary.succeeded.push(outcome),
                        Err(e) => {
                            log::error!(
                                "Sync failed for {} ({}): {}",
                                show.display_name(),
                                episode_type,
                                e
                            );
                            summary.failed.push((name.clone(), episode_type, e.to_string()));
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("Could not resolve {}: {}", show.display_name(), e);
                for &episode_type in &show.episode_types {
                    summary.failed.push((name.clone(), episode_type, e.to_string()));
                }
            }
        }

        if i + 1 < shows.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let elapsed = Utc::now() - started;
    display::summary(
        "sync-all",
        &[
            ("Runs", (summary.succeeded.len() + summary.failed.len()).to_string()),
            ("Succeeded", summary.succeeded.len().to_string()),
            ("Failed", summary.failed.len().to_string()),
            ("Episodes added", summary.added().to_string()),
            ("Episodes unmatched", summary.unmatched().to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    Ok(summary)
}
