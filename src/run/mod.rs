//! Pipeline run: coordination, scoring, merging and reporting

mod coordinator;
mod csv;
mod merge;
mod report;
mod scorer;
mod state;

pub use coordinator::{RunCoordinator, RunSettings};
pub use merge::{merge_tables, MergeError, MergeSummary};
pub use report::{print_report, AbortReason, ItemOutput, ItemStatus, RunReport};
pub use scorer::{CollaboratorError, CommandScorer, Scorer};
pub use state::RunState;
