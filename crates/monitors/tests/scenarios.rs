use monitors::batch::{self, ApiError, Applied, LiveMonitor, MonitorApi, Status};
use monitors::{
    index_intents, report, AlertDefinition, Bucket, OwnershipIntent, Plan, Settings,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// In-memory monitoring API, which records the calls made of it.
#[derive(Default)]
struct FakeApi {
    monitors: Mutex<BTreeMap<i64, Value>>,
    invalid: Vec<i64>,
    /// Calls which fail with a transport error, as `(id, call)`.
    broken: Vec<(i64, &'static str)>,
    /// Fetches of this alert never complete, and notify `stalled`.
    stall: Option<i64>,
    stalled: Notify,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn with(definitions: &[AlertDefinition]) -> Self {
        let monitors = definitions
            .iter()
            .map(|d| {
                let mut body = serde_json::to_value(d).unwrap();
                body["options"] = json!({"notify_no_data": false});
                (d.id, body)
            })
            .collect();
        Self {
            monitors: Mutex::new(monitors),
            ..Default::default()
        }
    }

    fn edit_message(&self, id: i64, message: &str) {
        self.monitors.lock().unwrap().get_mut(&id).unwrap()["message"] = message.into();
    }

    fn record(&self, call: &'static str, id: i64) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("{call} {id}"));

        if self.broken.contains(&(id, call)) {
            Err(ApiError::Other(format!("503 Service Unavailable: {call} timed out")))
        } else {
            Ok(())
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn message(&self, id: i64) -> String {
        self.monitors.lock().unwrap()[&id]["message"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

impl MonitorApi for FakeApi {
    async fn fetch(&self, id: i64) -> Result<LiveMonitor, ApiError> {
        self.record("fetch", id)?;

        if self.stall == Some(id) {
            self.stalled.notify_one();
            std::future::pending::<()>().await;
        }
        let body = self.monitors.lock().unwrap().get(&id).cloned();
        match body {
            Some(body) => Ok(LiveMonitor::from_body(body).unwrap()),
            None => Err(ApiError::NotFound),
        }
    }

    async fn validate<'s>(&'s self, body: &'s Value) -> Result<(), ApiError> {
        let id = body["id"].as_i64().unwrap();
        self.record("validate", id)?;

        if self.invalid.contains(&id) {
            Err(ApiError::Invalid("message is too long".to_string()))
        } else {
            Ok(())
        }
    }

    async fn update<'s>(&'s self, id: i64, body: &'s Value) -> Result<(), ApiError> {
        self.record("update", id)?;
        self.monitors.lock().unwrap().insert(id, body.clone());
        Ok(())
    }
}

fn definition(id: i64, message: &str, tags: &[&str]) -> AlertDefinition {
    AlertDefinition {
        id,
        name: format!("alert {id}"),
        message: message.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        query: "avg(last_5m):avg:system.load.1{*} > 4".to_string(),
    }
}

fn intent(id: i64, owner: &str) -> OwnershipIntent {
    let id = id.to_string();
    OwnershipIntent::from_row(&[id.as_str(), owner]).unwrap().unwrap()
}

fn live_settings() -> Settings {
    Settings {
        dry_run: false,
        pause: Duration::ZERO,
        ..Default::default()
    }
}

async fn run(plan: &Plan, api: &FakeApi, settings: &Settings) -> Vec<Applied> {
    batch::apply(
        api,
        plan.bucket(Bucket::AutoUpdatable),
        settings,
        std::future::pending(),
    )
    .await
}

#[tokio::test]
async fn scenario_tag_owned_alert_without_workbook_row() {
    let definitions = vec![definition(
        100,
        "alert @slack-incidents-uk @slack-old-team",
        &["team:devx"],
    )];
    let api = FakeApi::with(&definitions);
    let settings = live_settings();

    let plan = Plan::build(definitions, &BTreeMap::new(), &settings);
    let alert = &plan.alerts[0];

    assert_eq!(alert.bucket, Bucket::AutoUpdatable);
    assert_eq!(alert.alert.team(), Some("infrastructure"));
    assert_eq!(alert.alert.squad(), Some("devx"));
    assert_eq!(
        alert.alert.new_chat.as_deref(),
        Some("@slack-incidents-dev-experience")
    );
    assert_eq!(
        alert.alert.message,
        "alert @slack-incidents-uk @slack-old-team,@slack-incidents-dev-experience"
    );

    let applied = run(&plan, &api, &settings).await;
    assert_eq!(
        applied,
        vec![Applied {
            id: 100,
            status: Status::Updated
        }]
    );
    assert_eq!(api.calls(), vec!["fetch 100", "validate 100", "update 100"]);
    assert_eq!(api.message(100), alert.alert.message);
}

#[tokio::test]
async fn scenario_deletion_request() {
    let definitions = vec![definition(7, "@slack-old @pagerduty-Old", &["team:devx"])];
    let intents = index_intents([intent(7, "delete")]);
    let api = FakeApi::with(&definitions);
    let settings = live_settings();

    let plan = Plan::build(definitions, &intents, &settings);
    let alert = &plan.alerts[0];

    assert_eq!(alert.bucket, Bucket::DeleteRequested);
    assert_eq!(alert.alert.team(), Some("delete"));
    assert_eq!(alert.alert.squad(), None);
    assert_eq!(alert.alert.message, "@slack-old @pagerduty-Old");

    let tables = report::plan_tables(&plan);
    let with_rows: Vec<_> = tables
        .iter()
        .filter(|t| !t.rows.is_empty())
        .map(|t| t.title)
        .collect();
    assert_eq!(with_rows, vec!["Alerts to Remove"]);

    assert!(run(&plan, &api, &settings).await.is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn scenario_live_edit_aborts_write() {
    let definitions = vec![
        definition(1, "@slack-old", &["team:humans"]),
        definition(2, "@slack-old", &["team:data"]),
    ];
    let api = FakeApi::with(&definitions);
    api.edit_message(1, "@slack-old edited by hand");
    let settings = live_settings();

    let plan = Plan::build(definitions, &BTreeMap::new(), &settings);
    let applied = run(&plan, &api, &settings).await;

    assert_eq!(
        applied,
        vec![
            Applied {
                id: 1,
                status: Status::LiveDifferences
            },
            Applied {
                id: 2,
                status: Status::Updated
            },
        ]
    );
    assert_eq!(
        applied[0].status.to_string(),
        "Live differences, needs reprocessing"
    );
    assert_eq!(
        api.calls(),
        vec!["fetch 1", "fetch 2", "validate 2", "update 2"]
    );
    assert_eq!(api.message(1), "@slack-old edited by hand");
}

#[tokio::test]
async fn failures_are_recorded_and_the_batch_continues() {
    let definitions = vec![
        definition(1, "@slack-old", &["team:humans"]),
        definition(2, "@slack-old", &["team:humans"]),
        definition(3, "@slack-old", &["team:humans"]),
    ];
    let mut api = FakeApi::with(&definitions[1..]);
    api.invalid.push(2);

    // Dry runs validate without saving.
    let dry = Settings {
        pause: Duration::ZERO,
        ..Default::default()
    };
    let plan = Plan::build(definitions.clone(), &BTreeMap::new(), &dry);
    let statuses: Vec<_> = run(&plan, &api, &dry)
        .await
        .into_iter()
        .map(|a| a.status.to_string())
        .collect();
    assert_eq!(
        statuses,
        vec![
            "Alert not found, potentially deleted",
            "Failed validation in dry run mode",
            "Validated successfully in dry run mode",
        ]
    );
    assert!(!api.calls().iter().any(|c| c.starts_with("update")));

    let live = live_settings();
    let statuses: Vec<_> = run(&plan, &api, &live)
        .await
        .into_iter()
        .map(|a| a.status)
        .collect();
    assert_eq!(
        statuses,
        vec![Status::NotFound, Status::FailedValidation, Status::Updated]
    );
}

#[tokio::test]
async fn transport_errors_are_recorded_and_the_batch_continues() {
    let definitions: Vec<_> = (1..=4)
        .map(|id| definition(id, "@slack-old", &["team:humans"]))
        .collect();
    let mut api = FakeApi::with(&definitions);
    api.broken = vec![(1, "fetch"), (2, "validate"), (3, "update")];
    let settings = live_settings();

    let plan = Plan::build(definitions, &BTreeMap::new(), &settings);
    let applied = run(&plan, &api, &settings).await;

    let statuses: Vec<_> = applied.iter().map(|a| a.status.to_string()).collect();
    assert_eq!(
        statuses,
        vec![
            "Unknown failure retrieving alert: 503 Service Unavailable: fetch timed out",
            "Unknown API error: 503 Service Unavailable: validate timed out",
            "Unknown API error: 503 Service Unavailable: update timed out",
            "Updated successfully",
        ]
    );
    assert_eq!(api.message(3), "@slack-old");
    assert_eq!(api.message(4), "@slack-old,@slack-incidents-humans");

    let table = report::applied_table(&plan, &applied);
    assert_eq!(table.rows.len(), 4);
}

#[tokio::test]
async fn interruption_of_an_alert_in_flight() {
    let definitions: Vec<_> = (1..=3)
        .map(|id| definition(id, "@slack-old", &["team:humans"]))
        .collect();
    let mut api = FakeApi::with(&definitions);
    api.stall = Some(2);
    let settings = live_settings();
    let plan = Plan::build(definitions, &BTreeMap::new(), &settings);

    // Shutdown fires while the second alert is being fetched.
    let applied = batch::apply(
        &api,
        plan.bucket(Bucket::AutoUpdatable),
        &settings,
        api.stalled.notified(),
    )
    .await;

    assert_eq!(
        applied,
        vec![
            Applied {
                id: 1,
                status: Status::Updated
            },
            Applied {
                id: 2,
                status: Status::Interrupted
            },
        ]
    );
    assert_eq!(
        api.calls(),
        vec!["fetch 1", "validate 1", "update 1", "fetch 2"]
    );

    let table = report::applied_table(&plan, &applied);
    let statuses: Vec<_> = table.rows.iter().map(|r| r.status.as_deref()).collect();
    assert_eq!(
        statuses,
        vec![
            Some("Updated successfully"),
            Some("Interrupted before completion")
        ]
    );
}

#[tokio::test]
async fn interruption_keeps_completed_statuses() {
    let definitions: Vec<_> = (1..=3)
        .map(|id| definition(id, "@slack-old", &["team:humans"]))
        .collect();
    let api = FakeApi::with(&definitions);
    let settings = Settings {
        dry_run: false,
        pause: Duration::from_secs(3600),
        ..Default::default()
    };
    let plan = Plan::build(definitions, &BTreeMap::new(), &settings);

    // Shutdown fires while pausing after the first alert.
    let applied = batch::apply(
        &api,
        plan.bucket(Bucket::AutoUpdatable),
        &settings,
        tokio::time::sleep(Duration::from_millis(50)),
    )
    .await;

    assert_eq!(
        applied,
        vec![Applied {
            id: 1,
            status: Status::Updated
        }]
    );
    let table = report::applied_table(&plan, &applied);
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].status.as_deref(), Some("Updated successfully"));
}

#[test]
fn buckets_partition_alerts() {
    let definitions = vec![
        definition(1, "@slack-a", &["env:prod"]),
        definition(2, "@slack-a", &[]),
        definition(3, "@slack-a", &["terraform:true", "team:data"]),
        definition(4, "@slack-a", &[]),
        definition(5, "{{#is_alert}}@slack-a{{/is_alert}} @slack-b", &["team:data"]),
        definition(6, "@slack-incidents-data", &["team:data"]),
        definition(7, "@slack-a", &["team:data"]),
        definition(3618226, "@slack-a", &["team:data"]),
    ];
    let intents = index_intents([intent(2, "Delete"), intent(4, "Shared Monolith")]);

    for pagerduty in [false, true] {
        let settings = Settings {
            pagerduty,
            ..Default::default()
        };
        let plan = Plan::build(definitions.clone(), &intents, &settings);

        let mut ids: Vec<i64> = Bucket::ALL
            .iter()
            .flat_map(|b| plan.bucket(*b).map(|a| a.id()))
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);

        let counts = plan.counts();
        assert!(counts.values().all(|n| *n == 1), "{counts:?}");
    }
}

#[test]
fn rerun_after_update_is_a_fixed_point() {
    let settings = Settings {
        pagerduty: true,
        ..Default::default()
    };
    let definitions = vec![definition(
        1,
        "{{#is_alert}}Load is high{{/is_alert}} @slack-old @pagerduty-Old",
        &["team:data", "squad:engineering"],
    )];

    let first = Plan::build(definitions.clone(), &BTreeMap::new(), &settings);
    let updated = first.alerts[0].alert.snapshot();
    assert_eq!(first.alerts[0].bucket, Bucket::AutoUpdatable);
    assert_eq!(
        updated.message,
        "{{#is_alert}}Load is high{{/is_alert}} @slack-old,@slack-incidents-data \
         @pagerduty-Squad-DataEngineering"
    );

    let second = Plan::build(vec![updated.clone()], &BTreeMap::new(), &settings);
    assert_eq!(second.alerts[0].bucket, Bucket::NoDiffNeeded);
    assert_eq!(second.alerts[0].alert.message, updated.message);
}
