//! fillersync CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fillersync::{
    error::{AppError, Result},
    matching::{ShowResolver, resolver::DEFAULT_SUGGESTIONS},
    models::{Config, EpisodeType, MatchMode},
    pipeline::{self, ListFilter, SyncContext, SyncRequest},
    services::{CatalogClient, RosterScraper},
    storage::FailureLog,
    utils::display,
};

/// fillersync - Filler List Synchronizer
#[derive(Parser, Debug)]
#[command(
    name = "fillersync",
    version,
    about = "Keeps catalog lists of filler and canon episodes in sync with the roster"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every show on the roster
    Shows,

    /// Resolve a library title to a roster show
    Resolve {
        /// Library title, e.g. "Naruto Shippuden"
        title: String,
    },

    /// Print the roster episodes of a show
    Episodes {
        /// Library title or roster show id
        show: String,

        /// Only episodes of this type (filler, manga, anime, mixed)
        #[arg(short = 't', long = "type")]
        episode_type: Option<EpisodeType>,
    },

    /// Synchronize one show's list for one episode type
    Sync {
        /// Library title or roster show id
        show: String,

        /// Episode type (filler, manga, anime, mixed)
        episode_type: EpisodeType,

        /// Matching strategy (number, title, hybrid); defaults to sync.match_by
        #[arg(short, long)]
        match_by: Option<MatchMode>,

        /// Print what would be added without writing the list
        #[arg(long)]
        dry_run: bool,
    },

    /// Synchronize every configured show and episode type
    SyncAll {
        /// Print what would be added without writing any list
        #[arg(long)]
        dry_run: bool,
    },

    /// List the catalog lists kept by this tool
    Lists {
        /// Only lists of this show (library title or roster show id)
        #[arg(short, long)]
        show: Option<String>,

        /// Only lists whose name contains this text
        #[arg(short, long)]
        name: Option<String>,

        /// Include lists not created by this tool
        #[arg(long)]
        all: bool,
    },

    /// Delete a show's synced lists
    Delete {
        /// Library title or roster show id
        show: String,

        /// Episode type (filler, manga, anime, mixed)
        episode_type: Option<EpisodeType>,

        /// Delete the lists of every episode type
        #[arg(long, conflicts_with = "episode_type")]
        all: bool,
    },

    /// Print the failure log
    Failures,

    /// Remove hand-fixed episodes from the failure log
    CleanFailures {
        /// Library title or roster show id
        show: String,

        /// Episode type (filler, manga, anime, mixed)
        episode_type: EpisodeType,

        /// Episode names that were fixed
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Reset the failure log
    ClearFailures,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides();
    log::debug!("Loaded configuration from {}", cli.config.display());

    let config = Arc::new(config);
    let failure_log = FailureLog::new(config.paths.failure_log_path());

    match cli.command {
        Command::Shows => {
            let roster = RosterScraper::new(Arc::clone(&config))?;
            let shows = roster.list_shows().await?;
            for show in &shows {
                println!("{show}");
            }
            log::info!("{} shows on the roster", shows.len());
        }

        Command::Resolve { title } => {
            let roster = RosterScraper::new(Arc::clone(&config))?;
            let candidates = roster.list_shows().await?;
            let resolver = ShowResolver::new();

            match resolver.resolve(&title, &candidates) {
                Some(found) => {
                    println!("{}", found.id);
                    log::info!(
                        "'{}' -> {} ({:?}, {:.0}%)",
                        title,
                        found.id,
                        found.kind,
                        found.score * 100.0
                    );
                }
                None => {
                    let suggestions = resolver.suggest(&title, &candidates, DEFAULT_SUGGESTIONS);
                    for (id, score) in &suggestions {
                        display::sub_item(&format!("{} ({:.0}%)", id, score * 100.0));
                    }
                    return Err(AppError::resolve(
                        title,
                        suggestions.into_iter().map(|(id, _)| id).collect(),
                    ));
                }
            }
        }

        Command::Episodes { show, episode_type } => {
            let roster = RosterScraper::new(Arc::clone(&config))?;
            let configured = pipeline::sync::configured_show(&config, &show);
            let roster_id = pipeline::sync::resolve_roster_id(&roster, &show, configured).await?;
            let episodes = roster.fetch_episodes(&roster_id, episode_type).await?;

            for episode in &episodes {
                println!("{}\t{}\t{}", episode.number, episode.episode_type, episode.name);
            }
        }

        Command::Sync {
            show,
            episode_type,
            match_by,
            dry_run,
        } => {
            let ctx = SyncContext::new(Arc::clone(&config))?;
            let request = SyncRequest {
                show,
                episode_type,
                mode: match_by,
                dry_run,
            };
            let outcome = pipeline::run_sync(&ctx, &request).await?;
            if outcome.report.has_failures() && !dry_run {
                log::warn!(
                    "{} episode(s) could not be synchronized",
                    outcome.report.failed.len()
                );
            }
        }

        Command::SyncAll { dry_run } => {
            let ctx = SyncContext::new(Arc::clone(&config))?;
            let summary = pipeline::run_sync_all(&ctx, dry_run).await?;
            for (show, episode_type, error) in &summary.failed {
                log::error!("{} ({}): {}", show, episode_type, error);
            }
        }

        Command::Lists { show, name, all } => {
            let catalog = CatalogClient::new(Arc::clone(&config))?;
            let filter = ListFilter {
                roster_id: show.map(|s| pipeline::sync::local_roster_id(&config, &s)),
                name,
                include_foreign: all,
            };
            pipeline::run_list_lists(&config, &catalog, &filter).await?;
        }

        Command::Delete {
            show,
            episode_type,
            all,
        } => {
            if episode_type.is_none() && !all {
                return Err(AppError::validation(
                    "Give an episode type or --all to delete every list of the show",
                ));
            }
            let catalog = CatalogClient::new(Arc::clone(&config))?;
            let roster_id = pipeline::sync::local_roster_id(&config, &show);
            let deleted = pipeline::run_delete(&catalog, &roster_id, episode_type).await?;
            log::info!("Deleted {} list(s) for {}", deleted, roster_id);
        }

        Command::Failures => {
            let entries = failure_log.load().await?;
            if entries.is_empty() {
                log::info!("No failures logged in {}", failure_log.path().display());
                return Ok(());
            }
            for entry in &entries {
                print!("{}", entry.render());
            }
            log::info!(
                "{} entries in {}",
                entries.len(),
                failure_log.path().display()
            );
        }

        Command::CleanFailures {
            show,
            episode_type,
            names,
        } => {
            let mut shows = vec![show.as_str()];
            if let Some(configured) = pipeline::sync::configured_show(&config, &show) {
                if let Some(id) = configured.roster_id.as_deref() {
                    shows.push(id);
                }
                shows.push(configured.library_title.as_str());
            }

            let removed = failure_log
                .remove_fixed(&shows, episode_type.key(), &names)
                .await?;
            log::info!("Removed {} fixed entries", removed);
        }

        Command::ClearFailures => {
            failure_log.clear().await?;
            log::info!("Cleared {}", failure_log.path().display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} shows, {} title mappings)",
                config.shows.len(),
                config.title_mappings.len()
            );
        }
    }

    Ok(())
}
