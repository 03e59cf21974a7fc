use crate::conditional::in_conditionals;
use crate::directive::Kind;
use crate::{diff, rewrite, ReconciledAlert, Settings};
use serde::Serialize;
use std::collections::BTreeSet;

/// Placeholder teams of alerts which still lack a real owner.
pub const SHARED_TEAMS: &[&str] = &["shared-monolith", "service-owner"];

/// Tag asserting that an alert is managed by terraform.
pub const TERRAFORM_FLAG: &str = "terraform:true";
/// Tag fragment of a repository pointer to terraform sources.
pub const TERRAFORM_REPOSITORY: &str = "repo:terraform";

/// Why an alert is considered to be managed by terraform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TerraformMarker {
    Flag,
    /// Inferred from a repository tag, without the explicit flag.
    Repository { tag: String },
}

pub fn terraform_marker(tags: &BTreeSet<String>) -> Option<TerraformMarker> {
    if tags.contains(TERRAFORM_FLAG) {
        return Some(TerraformMarker::Flag);
    }
    tags.iter()
        .find(|t| t.contains(TERRAFORM_REPOSITORY))
        .map(|tag| TerraformMarker::Repository { tag: tag.clone() })
}

/// Mutually exclusive outcome category of a reconciled alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    DeleteRequested,
    TerraformManaged,
    Unowned,
    SharedUnowned,
    MultiChannelManual,
    NoDiffNeeded,
    AutoUpdatable,
}

impl Bucket {
    /// All buckets, in classification precedence order.
    pub const ALL: [Bucket; 7] = [
        Bucket::DeleteRequested,
        Bucket::TerraformManaged,
        Bucket::Unowned,
        Bucket::SharedUnowned,
        Bucket::MultiChannelManual,
        Bucket::NoDiffNeeded,
        Bucket::AutoUpdatable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::DeleteRequested => "delete-requested",
            Bucket::TerraformManaged => "terraform-managed",
            Bucket::Unowned => "unowned",
            Bucket::SharedUnowned => "shared-unowned",
            Bucket::MultiChannelManual => "multi-channel-manual",
            Bucket::NoDiffNeeded => "no-diff-needed",
            Bucket::AutoUpdatable => "auto-updatable",
        }
    }

    /// Title of the report table of this bucket.
    pub fn title(self) -> &'static str {
        match self {
            Bucket::DeleteRequested => "Alerts to Remove",
            Bucket::TerraformManaged => "Terraform Alerts to Fix",
            Bucket::Unowned => "Completely Unowned Alerts - No Updates",
            Bucket::SharedUnowned => "Shared Alerts - No Updates",
            Bucket::MultiChannelManual => "Multi-Channel Alerts to Fix",
            Bucket::NoDiffNeeded => "Alerts Without Changes",
            Bucket::AutoUpdatable => "Alerts that will be Automatically Changed",
        }
    }

    /// Alerts of this bucket must be fixed by hand, so their rewritten
    /// messages are only suggestions.
    pub fn is_manual_fix(self) -> bool {
        matches!(self, Bucket::TerraformManaged | Bucket::MultiChannelManual)
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a reconciled alert. Rules are evaluated in `Bucket::ALL` order
/// and the first match wins, so buckets are disjoint.
pub fn classify(alert: &ReconciledAlert, settings: &Settings) -> Bucket {
    let team = alert.team();

    if alert.ownership.as_ref().map_or(false, |o| o.is_delete()) {
        Bucket::DeleteRequested
    } else if alert.terraform.is_some() {
        Bucket::TerraformManaged
    } else if team.is_none() && !has_team_tag(&alert.definition.tags) {
        Bucket::Unowned
    } else if team.map_or(false, |t| SHARED_TEAMS.contains(&t)) {
        Bucket::SharedUnowned
    } else if is_multi_channel(&alert.definition.message, settings) {
        Bucket::MultiChannelManual
    } else if !diff::full(&alert.definition, &alert.snapshot()).differs() {
        Bucket::NoDiffNeeded
    } else {
        Bucket::AutoUpdatable
    }
}

fn has_team_tag(tags: &BTreeSet<String>) -> bool {
    tags.iter().any(|t| t.starts_with("team:"))
}

// Several chat targets, some of which may be governed by conditional blocks.
fn is_multi_channel(message: &str, settings: &Settings) -> bool {
    rewrite::countable(message, Kind::Chat).len() > 1
        && (in_conditionals(message, Kind::Chat)
            || (settings.pagerduty && in_conditionals(message, Kind::Paging)))
}
