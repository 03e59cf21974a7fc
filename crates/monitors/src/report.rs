//! Tables of the report written for each run.

use crate::batch::Applied;
use crate::rewrite::Outcome;
use crate::{Bucket, Plan, ReconciledAlert};
use itertools::Itertools;
use serde::Serialize;

/// Buckets in the order their tables are reported.
pub const REPORT_ORDER: [Bucket; 7] = [
    Bucket::AutoUpdatable,
    Bucket::TerraformManaged,
    Bucket::MultiChannelManual,
    Bucket::DeleteRequested,
    Bucket::SharedUnowned,
    Bucket::Unowned,
    Bucket::NoDiffNeeded,
];

pub const APPLIED_TITLE: &str = "Alerts that have been updated";

const NEW_MESSAGE: &str = "New Message";
const SUGGESTED_MESSAGE: &str = "Proposed New Message (SUGGESTION ONLY)";

/// A row of a report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub team: Option<String>,
    pub squad: Option<String>,
    pub name: String,
    pub new_chat: Option<String>,
    pub new_paging: Option<String>,
    pub update_chat: bool,
    pub update_paging: bool,
    /// Directive kinds with several current directives, which must be
    /// remapped by hand.
    pub manual_handling: String,
    pub original_message: String,
    pub new_message: String,
}

impl Row {
    pub fn new(alert: &ReconciledAlert, status: Option<String>) -> Self {
        Self {
            id: alert.id(),
            status,
            team: alert.team().map(str::to_string),
            squad: alert.squad().map(str::to_string),
            name: alert.name().to_string(),
            new_chat: alert.new_chat.clone(),
            new_paging: alert.new_paging.clone(),
            update_chat: alert.updates_chat(),
            update_paging: alert.updates_paging(),
            manual_handling: manual_handling(alert),
            original_message: alert.definition.message.clone(),
            new_message: alert.proposed_message().to_string(),
        }
    }
}

fn manual_handling(alert: &ReconciledAlert) -> String {
    [(alert.chat_outcome, "Slack"), (alert.paging_outcome, "Pagerduty")]
        .into_iter()
        .filter(|(outcome, _)| *outcome == Some(Outcome::Ambiguous))
        .map(|(_, kind)| kind)
        .join(", ")
}

/// A titled report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub title: &'static str,
    /// Heading of the new message column.
    pub message_header: &'static str,
    pub with_status: bool,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn headers(&self) -> Vec<&'static str> {
        let mut out = vec!["Datadog Alert ID"];
        if self.with_status {
            out.push("Status");
        }
        out.extend([
            "New Team",
            "New Squad",
            "Alert Name",
            "New Alert Slack Channel",
            "New Pagerduty Service",
            "Update Slack?",
            "Update Pagerduty?",
            "Needs Manual Handling",
            "Original Message",
            self.message_header,
        ]);
        out
    }

    /// Rows as cells aligned with `headers()`.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(move |row| {
            let mut out = vec![row.id.to_string()];
            if self.with_status {
                out.push(row.status.clone().unwrap_or_default());
            }
            out.extend([
                row.team.clone().unwrap_or_default(),
                row.squad.clone().unwrap_or_default(),
                row.name.clone(),
                row.new_chat.clone().unwrap_or_default(),
                row.new_paging.clone().unwrap_or_default(),
                row.update_chat.to_string(),
                row.update_paging.to_string(),
                row.manual_handling.clone(),
                row.original_message.clone(),
                row.new_message.clone(),
            ]);
            out
        })
    }

    /// File-system friendly name of the table.
    pub fn slug(&self) -> String {
        self.title
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// One table for each bucket of `plan`, in `REPORT_ORDER`.
pub fn plan_tables(plan: &Plan) -> Vec<Table> {
    REPORT_ORDER
        .iter()
        .map(|bucket| Table {
            title: bucket.title(),
            message_header: if bucket.is_manual_fix() {
                SUGGESTED_MESSAGE
            } else {
                NEW_MESSAGE
            },
            with_status: false,
            rows: plan.bucket(*bucket).map(|a| Row::new(a, None)).collect(),
        })
        .collect()
}

/// Table of the statuses of applied alerts.
pub fn applied_table(plan: &Plan, applied: &[Applied]) -> Table {
    let rows = applied
        .iter()
        .filter_map(|Applied { id, status }| {
            let index = plan
                .alerts
                .binary_search_by_key(id, |c| c.alert.id())
                .ok()?;
            Some(Row::new(&plan.alerts[index].alert, Some(status.to_string())))
        })
        .collect();

    Table {
        title: APPLIED_TITLE,
        message_header: NEW_MESSAGE,
        with_status: true,
        rows,
    }
}
