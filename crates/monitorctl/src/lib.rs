use clap::Parser;

pub mod datadog;
pub mod local;
mod output;
mod reconcile;
mod summarize;
pub mod workbook;

/// A command-line tool for reassigning the ownership of Datadog monitors.
///
/// Monitors are summarized into a workbook which their owners fill in.
/// The filled-in workbook is then reconciled with the monitors, and their
/// notification directives are rewritten to route to their new owners.
#[derive(Debug, Parser)]
#[clap(author, about, version)]
pub struct Cli {
    /// Surface per-alert diagnostics as warnings, and log at debug level.
    #[clap(long, global = true, env = "VERBOSE")]
    pub verbose: bool,

    /// Format of logs written to stderr.
    #[clap(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::ValueEnum, Debug, Copy, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable text logs.
    Text,
    /// Newline-delimited JSON logs.
    Json,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Summarize local monitor definitions into a workbook sheet.
    ///
    /// The sheet lists, for each monitor, the environments, teams, runbooks
    /// and notification directives it has. Owners fill in its new owner
    /// and product area columns, or "delete" to have a monitor removed.
    Summarize(summarize::Summarize),
    /// Reconcile monitor definitions with a filled-in workbook, and write
    /// a report of the changes which would be made.
    Plan(reconcile::Reconcile),
    /// Reconcile monitor definitions with a filled-in workbook, and apply
    /// automatically-updatable changes to Datadog.
    ///
    /// Each monitor is re-fetched immediately before it's updated, and is
    /// skipped if it was edited since its definition was exported.
    /// Stop with CTRL-C: the statuses of completed monitors are still reported.
    Apply(reconcile::Apply),
}

impl Cli {
    pub async fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Summarize(summarize) => summarize.run(),
            Command::Plan(reconcile) => reconcile.run(self.verbose),
            Command::Apply(apply) => apply.run(self.verbose).await,
        }
    }
}
