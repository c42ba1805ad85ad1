//! Run coordinator - one pipeline run from listing page to weekly artifact
//!
//! Stages, in order:
//! - Fetch the listing page (cached, throttled, retried)
//! - Resolve the latest completed matchweek, unless one was given
//! - Collect the match report links for that week
//! - Hand each link to the scorer, one at a time
//! - Combine the scorer outputs into `<prefix><week>.csv`
//!
//! A stage with nothing to work on ends the run as `Aborted`, which is a normal
//! outcome and not an error.

use crate::config::{Config, FailurePolicy};
use crate::fetch::{source_request, FetchEngine, FetchOutcome, ResourceRequest};
use crate::run::merge::merge_tables;
use crate::run::report::{AbortReason, ItemOutput, ItemStatus, RunReport};
use crate::run::scorer::{CommandScorer, Scorer};
use crate::run::RunState;
use crate::schedule::{latest_completed_period, links_for_period, ScheduleLayout};
use crate::MatchweekError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Everything the coordinator needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub request: ResourceRequest,
    pub layout: ScheduleLayout,

    /// Directory receiving `match_<i>.csv` files
    pub item_dir: PathBuf,
    pub on_failure: FailurePolicy,

    /// Directory receiving the weekly artifact
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

impl RunSettings {
    /// Derives the settings from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `bypass_cache` - Force a network fetch of the listing page
    pub fn from_config(config: &Config, bypass_cache: bool) -> Self {
        Self {
            request: source_request(config, bypass_cache),
            layout: ScheduleLayout::from(&config.schedule),
            item_dir: PathBuf::from(&config.scorer.output_dir),
            on_failure: config.scorer.on_failure,
            output_dir: PathBuf::from(&config.output.directory),
            file_prefix: config.output.file_prefix.clone(),
        }
    }

    /// Path of the weekly artifact for `period`
    pub fn artifact_path(&self, period: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.csv", self.file_prefix, period))
    }
}

/// Drives the fetch engine, the extractor and the scorer through one run
pub struct RunCoordinator {
    engine: FetchEngine,
    scorer: Box<dyn Scorer>,
    settings: RunSettings,
}

impl RunCoordinator {
    pub fn new(engine: FetchEngine, scorer: Box<dyn Scorer>, settings: RunSettings) -> Self {
        Self {
            engine,
            scorer,
            settings,
        }
    }

    /// Builds a coordinator with the configured transport, cache and scorer
    ///
    /// # Returns
    ///
    /// * `Ok(RunCoordinator)` - Ready to run
    /// * `Err(MatchweekError)` - The HTTP client or cache could not be set up
    pub fn from_config(config: &Config, bypass_cache: bool) -> Result<Self, MatchweekError> {
        Ok(Self::new(
            FetchEngine::from_config(config)?,
            Box::new(CommandScorer::from_config(&config.scorer)),
            RunSettings::from_config(config, bypass_cache),
        ))
    }

    pub fn engine(&self) -> &FetchEngine {
        &self.engine
    }

    /// Runs the pipeline once
    ///
    /// # Arguments
    ///
    /// * `period_override` - Use this matchweek instead of detecting one
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run finished as `Done` or `Aborted`
    /// * `Err(MatchweekError)` - A scorer failed under the abort policy, or
    ///   the filesystem refused a write
    pub async fn run(&mut self, period_override: Option<u32>) -> Result<RunReport, MatchweekError> {
        let mut report = RunReport::new();

        let content = match self.engine.fetch(&self.settings.request).await {
            FetchOutcome::Success {
                content,
                served_from,
                attempts,
            } => {
                report.served_from = Some(served_from);
                report.fetch_attempts = attempts;
                content
            }
            FetchOutcome::Failure { kind, attempts } => {
                report.fetch_attempts = attempts;
                tracing::warn!(error = %kind, attempts, "No content returned, exiting");
                abort(&mut report, AbortReason::NoContent(kind))?;
                return Ok(report);
            }
        };
        advance(&mut report, RunState::Fetched)?;

        let period = match period_override {
            Some(period) => {
                tracing::info!(period, "Using requested matchweek");
                Some(period)
            }
            None => latest_completed_period(&content, &self.settings.layout),
        };
        let Some(period) = period else {
            abort(&mut report, AbortReason::NoPeriod)?;
            return Ok(report);
        };
        report.period = Some(period);
        advance(&mut report, RunState::PeriodResolved)?;

        let links = links_for_period(&content, period, &self.settings.layout);
        if links.is_empty() {
            abort(&mut report, AbortReason::NoLinks { period })?;
            return Ok(report);
        }
        report.links = links.len();
        advance(&mut report, RunState::LinksResolved)?;

        self.dispatch(&links, &mut report).await?;
        advance(&mut report, RunState::Dispatched)?;

        let inputs: Vec<PathBuf> = report
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Scored)
            .map(|item| item.destination.clone())
            .collect();

        let artifact = self.settings.artifact_path(period);
        let Some(summary) = merge_tables(&inputs, &artifact)? else {
            tracing::warn!("No outputs found to combine");
            abort(&mut report, AbortReason::NoOutputs)?;
            return Ok(report);
        };
        report.artifact = Some(summary.path);
        report.merged_rows = summary.rows;
        advance(&mut report, RunState::Merged)?;

        advance(&mut report, RunState::Done)?;
        Ok(report)
    }

    /// Scores every link in order into `item_dir/match_<i>.csv`
    async fn dispatch(&self, links: &[String], report: &mut RunReport) -> Result<(), MatchweekError> {
        let item_dir = prepare_item_dir(&self.settings.item_dir)?;
        let total = links.len();

        for (i, link) in links.iter().enumerate() {
            let destination = item_dir.join(format!("match_{}.csv", i));
            remove_stale(&destination)?;

            tracing::info!(item = i + 1, total, link = %link, "Processing match");

            let status = match self.scorer.score(link, &destination).await {
                Ok(()) => ItemStatus::Scored,
                Err(e) => match self.settings.on_failure {
                    FailurePolicy::Abort => {
                        tracing::error!(
                            link = %link,
                            class = ?e.class(),
                            error = %e,
                            "Scorer failed, stopping run"
                        );
                        return Err(e.into());
                    }
                    FailurePolicy::Skip => {
                        tracing::warn!(
                            link = %link,
                            class = ?e.class(),
                            error = %e,
                            "Scorer failed, skipping match"
                        );
                        ItemStatus::Skipped {
                            error: e.to_string(),
                        }
                    }
                },
            };

            report.items.push(ItemOutput {
                link: link.clone(),
                destination,
                status,
            });
        }

        Ok(())
    }
}

/// Moves `report` to `to`, refusing anything but the next stage or an abort
fn advance(report: &mut RunReport, to: RunState) -> Result<(), MatchweekError> {
    if !report.state.can_transition_to(to) {
        return Err(MatchweekError::InvalidTransition {
            from: report.state,
            to,
        });
    }
    tracing::debug!(from = %report.state, to = %to, "Run state");
    report.state = to;
    Ok(())
}

fn abort(report: &mut RunReport, reason: AbortReason) -> Result<(), MatchweekError> {
    tracing::warn!(
        stage = %report.state,
        class = ?reason.class(),
        reason = %reason,
        "Run stopped"
    );
    advance(report, RunState::Aborted)?;
    report.abort_reason = Some(reason);
    Ok(())
}

/// Creates the per-item directory and returns its absolute path
///
/// The scorer runs in its own working directory, so it must get absolute paths.
fn prepare_item_dir(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    dir.canonicalize()
}

/// Deletes an output left behind by an earlier run
fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
