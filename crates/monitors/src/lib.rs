//! Reconciles monitor definitions against an ownership-reassignment workbook
//! and the live monitoring platform, and rewrites the notification directives
//! embedded in each monitor's message to route to its new owners.
//!
//! The pipeline is:
//!
//! - `AlertDefinition`s (local truth) and `OwnershipIntent`s (workbook rows)
//!   are merged into a `ReconciledAlert`, resolving its new owner and the
//!   chat and paging targets that owner should be routed to.
//! - `ReconciledAlert::reprocess` rewrites the message, when that's safe.
//! - `Plan::build` classifies every alert into exactly one `Bucket`.
//! - `batch::apply` writes `AutoUpdatable` alerts to the live platform,
//!   re-checking live state immediately before each write.

mod alert;
pub mod batch;
mod classify;
pub mod conditional;
mod diagnostic;
pub mod diff;
pub mod directive;
pub mod ownership;
mod plan;
pub mod report;
pub mod rewrite;
mod settings;
pub mod summary;
pub mod targets;

pub use alert::{
    columns, index_intents, AlertDefinition, LoadError, OwnershipIntent, ReconciledAlert,
    RecordedAlert,
};
pub use classify::{classify, terraform_marker, Bucket, TerraformMarker, SHARED_TEAMS};
pub use diagnostic::Diagnostic;
pub use directive::{Directive, Kind};
pub use ownership::ResolvedOwnership;
pub use plan::{Classified, Plan};
pub use settings::{Settings, DEFAULT_EXCLUDED_ID};
