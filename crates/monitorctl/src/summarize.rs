use crate::{local, workbook};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct Summarize {
    /// Directory of exported monitor definitions, as `*.json` files.
    #[clap(long)]
    definitions: PathBuf,
    /// Workbook sheets whose declared owners are carried into the summary.
    #[clap(long)]
    workbook: Vec<PathBuf>,
    /// Path of the CSV summary to write.
    #[clap(long)]
    output: PathBuf,
}

impl Summarize {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut definitions = local::load_definitions(&self.definitions)?;
        definitions.sort_by_key(|d| d.id);
        let intents = workbook::read_intents(&self.workbook)?;

        let rows: Vec<_> = definitions
            .iter()
            .map(|d| monitors::summary::summarize(d, intents.get(&d.id)))
            .collect();
        workbook::write_summary(&self.output, &rows)?;

        tracing::info!(alerts = rows.len(), path = %self.output.display(), "wrote alert summary");
        Ok(())
    }
}
