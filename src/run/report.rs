//! Run summary
//!
//! The coordinator fills a [`RunReport`] as it goes; the binary prints it at
//! the end of a run.

use crate::fetch::{ErrorClass, FailureKind, ServedFrom};
use crate::run::RunState;
use std::fmt;
use std::path::PathBuf;

/// Why a run stopped without producing an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The listing page could not be obtained
    NoContent(FailureKind),
    /// No matchweek has a result yet
    NoPeriod,
    /// The matchweek has no detail links
    NoLinks { period: u32 },
    /// No scorer output existed to merge
    NoOutputs,
}

impl AbortReason {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoContent(kind) => kind.class(),
            Self::NoPeriod | Self::NoLinks { .. } | Self::NoOutputs => ErrorClass::NoData,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContent(kind) => write!(f, "no content returned: {}", kind),
            Self::NoPeriod => write!(f, "no completed matchweek detected"),
            Self::NoLinks { period } => write!(f, "no match reports found for week {}", period),
            Self::NoOutputs => write!(f, "no scorer outputs to combine"),
        }
    }
}

/// Outcome of scoring one detail link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Scored,
    /// Scorer failed and the run was configured to continue
    Skipped { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutput {
    pub link: String,
    pub destination: PathBuf,
    pub status: ItemStatus,
}

/// Everything a finished run found out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub state: RunState,
    pub abort_reason: Option<AbortReason>,

    /// Where the listing page came from (absent when the fetch failed)
    pub served_from: Option<ServedFrom>,
    pub fetch_attempts: u32,

    pub period: Option<u32>,
    pub links: usize,
    pub items: Vec<ItemOutput>,

    /// Path of the weekly artifact, once written
    pub artifact: Option<PathBuf>,
    pub merged_rows: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            state: RunState::Start,
            abort_reason: None,
            served_from: None,
            fetch_attempts: 0,
            period: None,
            links: 0,
            items: Vec::new(),
            artifact: None,
            merged_rows: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }

    /// Number of items the scorer completed
    pub fn scored(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Scored)
            .count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints the report to stdout
///
/// # Arguments
///
/// * `report` - The finished run
pub fn print_report(report: &RunReport) {
    println!("=== Matchweek Run ===\n");

    println!("State: {}", report.state);
    if let Some(reason) = &report.abort_reason {
        println!("Stopped: {}", reason);
    }

    match report.served_from {
        Some(source) => println!(
            "Schedule: {} ({} network attempts)",
            source, report.fetch_attempts
        ),
        None => println!("Schedule: unavailable"),
    }

    if let Some(period) = report.period {
        println!("Matchweek: {}", period);
    }

    if report.links > 0 {
        println!();
        println!("Matches ({} scored / {} found):", report.scored(), report.links);
        for item in &report.items {
            match &item.status {
                ItemStatus::Scored => println!("  - {}", item.link),
                ItemStatus::Skipped { error } => {
                    println!("  - {} (skipped: {})", item.link, error)
                }
            }
        }
    }

    if let Some(artifact) = &report.artifact {
        println!();
        println!(
            "Output: {} ({} rows)",
            artifact.display(),
            report.merged_rows
        );
    }
}
