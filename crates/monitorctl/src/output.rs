use serde::Serialize;
use std::io::{self, Write};

#[derive(clap::Args, Clone, Debug, Default)]
pub struct Output {
    /// How to format command output
    #[clap(short, long, value_enum, default_value_t = OutputType::Table)]
    pub output: OutputType,
}

#[derive(clap::ValueEnum, Debug, Default, Copy, Clone, PartialEq)]
pub enum OutputType {
    /// Format output as compact JSON with items separated by newlines
    Json,
    /// Format output as YAML
    Yaml,
    /// Format the output as a pretty-printed table
    #[default]
    Table,
}

/// Things that can be output as either JSON, YAML, or a table.
/// JSON and YAML are handled by `Serialize`, so this trait covers tables.
pub trait CliOutput: Serialize {
    /// Returns the column headers of the table.
    fn table_headers() -> Vec<&'static str>;

    /// Converts this item into a row, with cells in the order of `table_headers`.
    fn into_table_row(self) -> Vec<String>;
}

impl Output {
    pub fn write_all<T, I>(&self, items: I) -> anyhow::Result<()>
    where
        T: CliOutput,
        I: IntoIterator<Item = T>,
    {
        match self.output {
            OutputType::Json => print_json(items),
            OutputType::Yaml => print_yaml(items),
            OutputType::Table => print_table(items),
        }
    }
}

pub fn print_yaml(items: impl IntoIterator<Item = impl CliOutput>) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    for item in items {
        serde_yaml::to_writer(&mut stdout, &item)?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

pub fn print_json(items: impl IntoIterator<Item = impl CliOutput>) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    for item in items {
        serde_json::to_writer(&mut stdout, &item)?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

pub fn print_table<T: CliOutput>(items: impl IntoIterator<Item = T>) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    let mut table = new_table(T::table_headers());

    for item in items {
        table.add_row(item.into_table_row());
    }

    for line in table.lines() {
        stdout.write_all(line.as_bytes())?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

// new_table builds a comfy_table with UTF8 styling.
fn new_table(headers: Vec<&str>) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .apply_modifier(comfy_table::modifiers::UTF8_SOLID_INNER_BORDERS);

    table.set_header(headers);
    table
}

/// Number of alerts classified into a bucket.
#[derive(Debug, Serialize)]
pub struct BucketCount {
    pub bucket: monitors::Bucket,
    pub title: &'static str,
    pub alerts: usize,
}

impl CliOutput for BucketCount {
    fn table_headers() -> Vec<&'static str> {
        vec!["Bucket", "Report Table", "Alerts"]
    }

    fn into_table_row(self) -> Vec<String> {
        vec![
            self.bucket.to_string(),
            self.title.to_string(),
            self.alerts.to_string(),
        ]
    }
}

impl CliOutput for monitors::batch::Applied {
    fn table_headers() -> Vec<&'static str> {
        vec!["Datadog Alert ID", "Status"]
    }

    fn into_table_row(self) -> Vec<String> {
        vec![self.id.to_string(), self.status.to_string()]
    }
}
