use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier of the platform-generated NTP monitor, which is never reconciled.
pub const DEFAULT_EXCLUDED_ID: i64 = 3618226;

/// Settings of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Validate updates without saving them.
    pub dry_run: bool,
    /// Remap paging directives, in addition to chat directives.
    pub pagerduty: bool,
    /// Surface diagnostics as warnings rather than debug events.
    pub verbose: bool,
    /// Only reconcile alerts resolved to this team.
    pub team: Option<String>,
    /// Pause between successive alerts of the write phase.
    #[serde(with = "humantime_serde")]
    pub pause: Duration,
    /// Alerts which are removed from consideration entirely.
    pub excluded_ids: Vec<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: true,
            pagerduty: false,
            verbose: false,
            team: None,
            pause: Duration::from_secs(1),
            excluded_ids: vec![DEFAULT_EXCLUDED_ID],
        }
    }
}

impl Settings {
    pub fn is_excluded(&self, id: i64) -> bool {
        self.excluded_ids.contains(&id)
    }

    /// Returns true if alerts of `team` are within the team filter.
    pub fn includes_team(&self, team: Option<&str>) -> bool {
        match &self.team {
            Some(filter) => team == Some(filter.as_str()),
            None => true,
        }
    }
}
