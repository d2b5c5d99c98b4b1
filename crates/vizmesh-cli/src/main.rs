use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use vizmesh_cli::commands;
use vizmesh_cli::config::Cli;
use vizmesh_logging::VizmeshSubscriberBuilder;
use vizmesh_registry::Registry;
use vizmesh_storage::RedbStorage;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let _guard = VizmeshSubscriberBuilder::new()
        .with_config(config.logging.clone())
        .init();

    // Store and registry are dropped on every return path, closing the database
    let storage = RedbStorage::open(config.store.to_redb_config())
        .with_context(|| format!("failed to open store at {}", config.store.path.display()))?;
    let registry = Registry::open(Arc::new(storage)).context("failed to load registry")?;

    let output = commands::execute(&registry, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
