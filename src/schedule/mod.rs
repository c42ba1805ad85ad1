//! Fixtures table extraction
//!
//! Pure functions over a fetched listing page. Nothing here touches the
//! network or the filesystem, and a page without the expected table is
//! reported as "no data" rather than as an error.

mod extractor;

pub use extractor::{latest_completed_period, links_for_period, parse_schedule};

use crate::config::ScheduleConfig;

/// Where the fixtures table and its cells live in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleLayout {
    /// The container `div` id must start with this
    pub container_id_prefix: String,

    /// ... and contain this
    pub container_id_contains: String,

    /// `data-stat` value of the period cell
    pub period_stat: String,

    /// `data-stat` value of the result cell
    pub result_stat: String,

    /// Exact (trimmed) text of the detail link anchor
    pub link_text: String,

    /// Base URL relative detail links are resolved against
    pub link_base: String,
}

impl From<&ScheduleConfig> for ScheduleLayout {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            container_id_prefix: config.container_id_prefix.clone(),
            container_id_contains: config.container_id_contains.clone(),
            period_stat: config.period_stat.clone(),
            result_stat: config.result_stat.clone(),
            link_text: config.link_text.clone(),
            link_base: config.link_base.clone(),
        }
    }
}

impl Default for ScheduleLayout {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

/// One fixture row of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Matchweek number
    pub period: u32,

    /// Whether the result cell is filled in
    pub has_result: bool,

    /// Absolute URL of the detail page, if the row links one
    pub detail_link: Option<String>,
}
