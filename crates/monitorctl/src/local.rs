use anyhow::Context;
use monitors::AlertDefinition;
use std::path::{Path, PathBuf};

/// Load every monitor definition from `*.json` files of directory `dir`.
/// A file holds either a single monitor, or an array of monitors.
pub fn load_definitions(dir: &Path) -> anyhow::Result<Vec<AlertDefinition>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading definitions directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .with_context(|| format!("listing definitions directory {}", dir.display()))?;

    paths.retain(|p| p.extension().map_or(false, |ext| ext == "json"));
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        let loaded = load_file(&path).with_context(|| format!("loading {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = loaded.len(), "loaded definitions");
        out.extend(loaded);
    }
    tracing::info!(count = out.len(), dir = %dir.display(), "loaded local alert definitions");

    Ok(out)
}

fn load_file(path: &Path) -> anyhow::Result<Vec<AlertDefinition>> {
    let content = std::fs::read(path)?;
    let document: serde_json::Value = serde_json::from_slice(&content)?;

    let bodies = match document {
        serde_json::Value::Array(bodies) => bodies,
        body => vec![body],
    };
    let definitions = bodies
        .iter()
        .map(AlertDefinition::from_live)
        .collect::<Result<_, _>>()?;

    Ok(definitions)
}
