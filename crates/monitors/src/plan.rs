use crate::{
    classify, AlertDefinition, Bucket, Diagnostic, OwnershipIntent, ReconciledAlert, Settings,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A reconciled alert and the bucket it was classified into.
#[derive(Debug, Clone, Serialize)]
pub struct Classified {
    pub bucket: Bucket,
    pub alert: ReconciledAlert,
}

/// Every alert of a run, reconciled and classified, along with sanity
/// checks of the workbook it was reconciled against.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Plan {
    /// Classified alerts, ordered by identifier.
    pub alerts: Vec<Classified>,
    /// Alerts which were removed from consideration by identifier.
    pub excluded: Vec<i64>,
    /// Alerts which were outside of the team filter.
    pub filtered: usize,
    /// Alerts which exist locally but aren't in the workbook.
    pub missing_intents: Vec<i64>,
    /// Alerts whose workbook copy is inconsistent with local truth.
    pub inconsistent: Vec<i64>,
    /// Complete set of resolved `team > squad` owners.
    pub owners: BTreeSet<String>,
    /// Lower-cased raw owners which couldn't be resolved to a team.
    pub unmapped_owners: BTreeSet<String>,
}

impl Plan {
    /// Reconcile and classify `definitions` against workbook `intents`.
    pub fn build(
        mut definitions: Vec<AlertDefinition>,
        intents: &BTreeMap<i64, OwnershipIntent>,
        settings: &Settings,
    ) -> Self {
        definitions.sort_by_key(|d| d.id);
        definitions.dedup_by_key(|d| d.id);

        let mut plan = Plan::default();

        for definition in definitions {
            let id = definition.id;
            if settings.is_excluded(id) {
                plan.excluded.push(id);
                continue;
            }
            let intent = intents.get(&id);
            if intent.is_none() {
                plan.missing_intents.push(id);
            }

            let mut alert = ReconciledAlert::merge(definition, intent, settings);
            if !settings.includes_team(alert.team()) {
                plan.filtered += 1;
                continue;
            }

            match &alert.ownership {
                Some(ownership) if ownership.is_delete() => (),
                Some(ownership) => {
                    plan.owners.insert(ownership.label());
                }
                None => {
                    if let Some(raw) = intent.and_then(|i| i.raw_owner.as_deref()) {
                        plan.unmapped_owners.insert(raw.to_lowercase());
                    }
                }
            }
            if alert
                .diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::StaleWorkbookEntry { .. }))
            {
                plan.inconsistent.push(id);
            }

            if alert.ownership.as_ref().map_or(false, |o| o.is_delete()) {
                // Alerts to remove are reported verbatim.
            } else if alert.terraform.is_some() {
                alert.suggest();
            } else {
                alert.reprocess();
            }

            let bucket = classify(&alert, settings);
            tracing::debug!(alert_id = id, %bucket, "classified alert");

            plan.alerts.push(Classified { bucket, alert });
        }
        plan
    }

    /// Alerts of `bucket`, ordered by identifier.
    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = &ReconciledAlert> + '_ {
        self.alerts
            .iter()
            .filter(move |c| c.bucket == bucket)
            .map(|c| &c.alert)
    }

    /// Number of alerts in each bucket, including empty ones.
    pub fn counts(&self) -> BTreeMap<Bucket, usize> {
        let mut out: BTreeMap<_, _> = Bucket::ALL.iter().map(|b| (*b, 0)).collect();
        for c in &self.alerts {
            *out.entry(c.bucket).or_default() += 1;
        }
        out
    }

    /// Emit every diagnostic of the plan as a tracing event.
    pub fn log_diagnostics(&self, settings: &Settings) {
        for Classified { alert, .. } in &self.alerts {
            for diagnostic in &alert.diagnostics {
                if settings.verbose {
                    tracing::warn!(alert_id = alert.id(), %diagnostic, "alert diagnostic");
                } else {
                    tracing::debug!(alert_id = alert.id(), %diagnostic, "alert diagnostic");
                }
            }
        }
    }
}
