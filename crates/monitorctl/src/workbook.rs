use anyhow::Context;
use monitors::report::Table;
use monitors::summary::SummaryRow;
use monitors::{columns, index_intents, OwnershipIntent};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read ownership intents from workbook sheets, each a CSV file.
/// Sheets are searched in the given order, and the first row of an alert wins.
pub fn read_intents(sheets: &[PathBuf]) -> anyhow::Result<BTreeMap<i64, OwnershipIntent>> {
    let mut intents = Vec::new();

    for sheet in sheets {
        let before = intents.len();
        read_sheet(sheet, &mut intents)
            .with_context(|| format!("reading workbook sheet {}", sheet.display()))?;
        tracing::debug!(sheet = %sheet.display(), rows = intents.len() - before, "read workbook sheet");
    }
    let index = index_intents(intents);
    tracing::info!(alerts = index.len(), sheets = sheets.len(), "read workbook");

    Ok(index)
}

fn read_sheet(path: &Path, into: &mut Vec<OwnershipIntent>) -> anyhow::Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let cells: Vec<&str> = record.iter().collect();

        if let Some(intent) =
            OwnershipIntent::from_row(&cells).with_context(|| format!("row {}", index + 1))?
        {
            into.push(intent);
        }
    }
    Ok(())
}

/// Write the alert summary export, which is the workbook's initial sheet.
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating summary {}", path.display()))?;

    writer.write_record(columns::HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a report table into `dir`, returning the path of the written file.
pub fn write_table(dir: &Path, table: &Table) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{}.csv", table.slug()));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating report table {}", path.display()))?;

    writer.write_record(table.headers())?;
    for record in table.records() {
        writer.write_record(record)?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = table.rows.len(), title = table.title, "wrote report table");
    Ok(path)
}

/// Directory of the report of a run started at `started`.
pub fn report_dir(
    base: &Path,
    started: chrono::DateTime<chrono::Utc>,
    team: Option<&str>,
) -> PathBuf {
    let mut name = format!("report-update-summary-{}", started.format("%Y-%m-%d-%H%M%S"));
    if let Some(team) = team {
        name = format!("{name}-{team}");
    }
    base.join(name)
}
