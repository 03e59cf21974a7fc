//! Write phase of a run: auto-updatable alerts are re-checked against the
//! live platform and then validated, and updated unless running dry.

use crate::{diff, AlertDefinition, LoadError, ReconciledAlert, Settings};
use serde::Serialize;
use std::future::Future;

/// Error of a remote monitoring API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("monitor not found")]
    NotFound,
    #[error("monitor is invalid: {0}")]
    Invalid(String),
    #[error("{0}")]
    Other(String),
}

/// Monitor as currently stored by the live platform.
#[derive(Debug, Clone)]
pub struct LiveMonitor {
    pub definition: AlertDefinition,
    /// Complete monitor body, including fields which aren't modeled.
    pub body: serde_json::Value,
}

impl LiveMonitor {
    pub fn from_body(body: serde_json::Value) -> Result<Self, LoadError> {
        Ok(Self {
            definition: AlertDefinition::from_live(&body)?,
            body,
        })
    }

    /// Body of this monitor with its message replaced by `message`.
    pub fn with_message(&self, message: &str) -> serde_json::Value {
        let mut body = self.body.clone();
        if let Some(fields) = body.as_object_mut() {
            fields.insert("message".to_string(), message.into());
        }
        body
    }
}

/// Remote monitoring API which alerts are reconciled against.
pub trait MonitorApi: Send + Sync {
    /// Fetch the current state of monitor `id`.
    fn fetch(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<LiveMonitor, ApiError>> + Send + '_;

    /// Validate a proposed monitor body, without saving it.
    fn validate<'s>(
        &'s self,
        body: &'s serde_json::Value,
    ) -> impl Future<Output = Result<(), ApiError>> + Send + 's;

    /// Replace monitor `id` with `body`.
    fn update<'s>(
        &'s self,
        id: i64,
        body: &'s serde_json::Value,
    ) -> impl Future<Output = Result<(), ApiError>> + Send + 's;
}

/// Outcome of applying a single alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Updated,
    Validated,
    FailedValidation,
    FailedValidationDryRun,
    LiveDifferences,
    NotFound,
    FetchFailed(String),
    ApiFailed(String),
    Interrupted,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Updated | Status::Validated)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Updated => f.write_str("Updated successfully"),
            Status::Validated => f.write_str("Validated successfully in dry run mode"),
            Status::FailedValidation => f.write_str("Failed validation, update not saved"),
            Status::FailedValidationDryRun => f.write_str("Failed validation in dry run mode"),
            Status::LiveDifferences => f.write_str("Live differences, needs reprocessing"),
            Status::NotFound => f.write_str("Alert not found, potentially deleted"),
            Status::FetchFailed(detail) => write!(f, "Unknown failure retrieving alert: {detail}"),
            Status::ApiFailed(detail) => write!(f, "Unknown API error: {detail}"),
            Status::Interrupted => f.write_str("Interrupted before completion"),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Status of an applied alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub id: i64,
    pub status: Status,
}

/// Apply `alerts` in order, pausing between them. When `shutdown` resolves
/// the remaining alerts are skipped, but every alert which was started has
/// a returned status. Failures of individual alerts don't stop the batch.
pub async fn apply<'a, C, I, S>(
    client: &C,
    alerts: I,
    settings: &Settings,
    shutdown: S,
) -> Vec<Applied>
where
    C: MonitorApi,
    I: IntoIterator<Item = &'a ReconciledAlert>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut out = Vec::new();
    let mut alerts = alerts.into_iter().peekable();

    while let Some(alert) = alerts.next() {
        let id = alert.id();

        let status = tokio::select! {
            biased;
            () = &mut shutdown => Status::Interrupted,
            status = apply_one(client, alert, settings) => status,
        };
        tracing::info!(alert_id = id, %status, "applied alert");

        let interrupted = status == Status::Interrupted;
        out.push(Applied { id, status });

        if interrupted {
            break;
        } else if alerts.peek().is_some() {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(settings.pause) => (),
            }
        }
    }
    out
}

async fn apply_one<C: MonitorApi>(client: &C, alert: &ReconciledAlert, settings: &Settings) -> Status {
    let id = alert.id();

    let live = match client.fetch(id).await {
        Ok(live) => live,
        Err(ApiError::NotFound) => return Status::NotFound,
        Err(err) => return Status::FetchFailed(err.to_string()),
    };

    // Abort if the alert was edited since local truth was captured.
    let live_diff = diff::full(&alert.definition, &live.definition);
    if live_diff.differs() {
        tracing::debug!(alert_id = id, fields = ?live_diff.fields, "live alert differs from local definition");
        return Status::LiveDifferences;
    }

    let body = live.with_message(&alert.message);
    match client.validate(&body).await {
        Ok(()) => (),
        Err(ApiError::Invalid(detail)) => {
            tracing::debug!(alert_id = id, %detail, "alert failed validation");
            return if settings.dry_run {
                Status::FailedValidationDryRun
            } else {
                Status::FailedValidation
            };
        }
        Err(ApiError::NotFound) => return Status::NotFound,
        Err(err) => return Status::ApiFailed(err.to_string()),
    }

    if settings.dry_run {
        return Status::Validated;
    }
    match client.update(id, &body).await {
        Ok(()) => Status::Updated,
        Err(ApiError::NotFound) => Status::NotFound,
        Err(err) => Status::ApiFailed(err.to_string()),
    }
}
