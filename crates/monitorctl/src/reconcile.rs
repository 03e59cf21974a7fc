use crate::output::{BucketCount, Output};
use crate::{datadog, local, workbook};
use anyhow::Context;
use monitors::{batch, report, Bucket, Plan, Settings};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct Reconcile {
    /// Directory of exported monitor definitions, as `*.json` files.
    #[clap(long)]
    definitions: PathBuf,
    /// Filled-in workbook sheets, as CSV files. An alert is looked up in
    /// each sheet in the given order.
    #[clap(long, required = true, num_args = 1..)]
    workbook: Vec<PathBuf>,
    /// Directory into which the report directory is written.
    #[clap(long, default_value = ".")]
    output_dir: PathBuf,
    /// Only reconcile alerts owned by this team.
    #[clap(long, env = "TEAM")]
    team: Option<String>,
    /// Also remap paging directives.
    #[clap(long, env = "PAGERDUTY")]
    pagerduty: bool,
    /// Alert identifiers which are never reconciled.
    #[clap(long = "exclude", default_values_t = [monitors::DEFAULT_EXCLUDED_ID])]
    excluded_ids: Vec<i64>,

    #[clap(flatten)]
    output: Output,
}

#[derive(Debug, clap::Args)]
pub struct Apply {
    #[clap(flatten)]
    reconcile: Reconcile,
    /// Validate updates without saving them. Pass `--dry-run false` to save.
    #[clap(long, env = "DRY_RUN", default_value_t = true, action = clap::ArgAction::Set)]
    dry_run: bool,
    /// Pause between successive monitors.
    #[clap(long, default_value = "1s")]
    pause: humantime::Duration,

    #[clap(flatten)]
    datadog: datadog::DatadogArgs,
}

impl Reconcile {
    fn settings(&self, verbose: bool) -> Settings {
        Settings {
            pagerduty: self.pagerduty,
            verbose,
            team: self.team.clone(),
            excluded_ids: self.excluded_ids.clone(),
            ..Default::default()
        }
    }

    pub fn run(&self, verbose: bool) -> anyhow::Result<()> {
        let settings = self.settings(verbose);
        let (plan, dir) = self.build(&settings)?;

        self.output.write_all(bucket_counts(&plan))?;
        tracing::info!(dir = %dir.display(), "wrote report");
        Ok(())
    }

    /// Build and report the plan of a run.
    fn build(&self, settings: &Settings) -> anyhow::Result<(Plan, PathBuf)> {
        let definitions = local::load_definitions(&self.definitions)?;
        let intents = workbook::read_intents(&self.workbook)?;

        let plan = Plan::build(definitions, &intents, settings);
        plan.log_diagnostics(settings);
        log_sanity_checks(&plan);

        let dir = workbook::report_dir(
            &self.output_dir,
            chrono::Utc::now(),
            settings.team.as_deref(),
        );
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating report directory {}", dir.display()))?;

        for table in report::plan_tables(&plan) {
            workbook::write_table(&dir, &table)?;
        }
        Ok((plan, dir))
    }
}

impl Apply {
    pub async fn run(&self, verbose: bool) -> anyhow::Result<()> {
        let settings = Settings {
            dry_run: self.dry_run,
            pause: self.pause.into(),
            ..self.reconcile.settings(verbose)
        };
        let (plan, dir) = self.reconcile.build(&settings)?;
        let client = datadog::Client::new(&self.datadog);

        let shutdown = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("caught shutdown signal, stopping...");
                }
                Err(err) => {
                    tracing::error!(?err, "error subscribing to shutdown signal");
                    std::future::pending::<()>().await;
                }
            }
        };

        tracing::info!(
            alerts = plan.bucket(Bucket::AutoUpdatable).count(),
            dry_run = settings.dry_run,
            "applying alert updates"
        );
        let applied = batch::apply(
            &client,
            plan.bucket(Bucket::AutoUpdatable),
            &settings,
            shutdown,
        )
        .await;

        // The applied table is written even if the batch was interrupted.
        let path = workbook::write_table(&dir, &report::applied_table(&plan, &applied))?;
        tracing::info!(
            path = %path.display(),
            succeeded = applied.iter().filter(|a| a.status.is_success()).count(),
            failed = applied.iter().filter(|a| !a.status.is_success()).count(),
            "wrote applied alert statuses"
        );

        self.reconcile.output.write_all(applied)
    }
}

fn bucket_counts(plan: &Plan) -> Vec<BucketCount> {
    plan.counts()
        .into_iter()
        .map(|(bucket, alerts)| BucketCount {
            bucket,
            title: bucket.title(),
            alerts,
        })
        .collect()
}

fn log_sanity_checks(plan: &Plan) {
    let join = |items: Vec<String>| items.join(", ");

    tracing::info!(
        owners = %join(plan.owners.iter().cloned().collect()),
        "complete set of new alert owners"
    );
    if !plan.unmapped_owners.is_empty() {
        tracing::warn!(
            owners = %join(plan.unmapped_owners.iter().cloned().collect()),
            "raw owners which still need to be mapped to teams"
        );
    }
    if !plan.missing_intents.is_empty() {
        tracing::info!(
            count = plan.missing_intents.len(),
            ids = ?plan.missing_intents,
            "alerts missing from the workbook"
        );
    }
    if !plan.inconsistent.is_empty() {
        tracing::warn!(
            ids = ?plan.inconsistent,
            "workbook entries are inconsistent with current alerts"
        );
    }
    if plan.filtered != 0 {
        tracing::info!(count = plan.filtered, "alerts outside of the team filter");
    }
}
