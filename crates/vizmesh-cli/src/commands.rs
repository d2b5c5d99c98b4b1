//! Subcommand execution
//!
//! Each command runs against an open registry and yields a JSON value for
//! the caller to print.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;
use vizmesh_core::{DataPoint, DataSource, Visualization};
use vizmesh_registry::Registry;
use vizmesh_storage::KvStore;

use crate::config::Command;

/// Run one command
pub fn execute<S: KvStore>(registry: &Registry<S>, command: Command) -> anyhow::Result<Value> {
    let output = match command {
        Command::AddSource { file } => {
            let source: DataSource = read_json(&file)?;
            let id = source.id.clone();
            let points = source.data_points.len();
            registry.add_data_source(source)?;
            info!(data_source = %id, points, "Registered data source");
            json!({ "added": "data_source", "id": id, "data_points": points })
        }
        Command::AddViz { file } => {
            let viz: Visualization = read_json(&file)?;
            let id = viz.id.clone();
            registry.add_visualization(viz)?;
            info!(visualization = %id, "Registered visualization");
            json!({ "added": "visualization", "id": id })
        }
        Command::Points { id } => serde_json::to_value(registry.get_data_points(&id)?)?,
        Command::Source { id } => serde_json::to_value(registry.get_data_source(&id)?)?,
        Command::Viz { id } => serde_json::to_value(registry.get_visualization(&id)?)?,
        Command::Append { id, file } => {
            let points: Vec<DataPoint> = read_json(&file)?;
            let appended = points.len();
            let source = registry.append_data_points(&id, points)?;
            info!(data_source = %id, appended, "Appended data points");
            json!({
                "id": id,
                "appended": appended,
                "data_points": source.data_points.len(),
                "last_updated": source.last_updated,
            })
        }
        Command::List => json!({
            "data_sources": registry
                .data_sources()
                .into_iter()
                .map(|s| json!({ "id": s.id, "name": s.name, "data_points": s.data_points.len(), "last_updated": s.last_updated }))
                .collect::<Vec<_>>(),
            "visualizations": registry.visualizations(),
        }),
        Command::RemoveSource { id } => {
            let removed = registry.remove_data_source(&id)?;
            json!({ "removed": removed, "id": id })
        }
        Command::RemoveViz { id } => {
            let removed = registry.remove_visualization(&id)?;
            json!({ "removed": removed, "id": id })
        }
    };

    Ok(output)
}

/// Parse JSON from a file, or stdin when the path is `-`
fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}
