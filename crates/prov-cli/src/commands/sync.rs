//! Sync state commands

use colored::{ColoredString, Colorize};
use prov_core::{SyncEntity, SyncEvent, SyncState};
use serde_json::json;

use crate::cli::SyncAction;
use crate::context::ProjectContext;
use crate::error::{CliError, Result};

/// Run a sync subcommand
pub fn run_sync(context: &ProjectContext, action: SyncAction) -> Result<()> {
    let inventory = &context.inventory;

    let (entity, event) = match action {
        SyncAction::Status { entity, json } => return show_status(context, entity.as_deref(), json),
        SyncAction::Track { cloud } => {
            let state = inventory.register_cloud(cloud);
            context.save()?;
            println!("{} Tracking {} ({})", "OK".green().bold(), SyncEntity::cloud(cloud), paint(state));
            return Ok(());
        }
        SyncAction::Untrack { cloud } => {
            inventory.remove_cloud(cloud)?;
            context.save()?;
            println!("{} Stopped tracking {}", "OK".green().bold(), SyncEntity::cloud(cloud));
            return Ok(());
        }
        SyncAction::Begin { entity } => (entity, SyncEvent::BeginSyncing),
        SyncAction::Schedule { entity } => (entity, SyncEvent::ScheduleSyncing),
        SyncAction::InSync { entity } => (entity, SyncEvent::SetInSync),
        SyncAction::Erred { entity } => (entity, SyncEvent::SetErred),
        SyncAction::Reset { entity } => (entity, SyncEvent::Reset),
    };

    let entity = parse_entity(&entity)?;
    let from = inventory.sync_state(&entity)?;
    let to = inventory.apply_sync_event(&entity, event)?;
    context.save()?;

    println!("{} {}: {} -> {}", "OK".green().bold(), entity, paint(from), paint(to));
    Ok(())
}

fn show_status(context: &ProjectContext, entity: Option<&str>, json: bool) -> Result<()> {
    let records = match entity {
        Some(entity) => {
            let entity = parse_entity(entity)?;
            vec![(entity, context.inventory.sync().record(&entity)?)]
        }
        None => context.inventory.sync().records(),
    };

    if json {
        let output: Vec<_> = records
            .iter()
            .map(|(entity, record)| {
                json!({
                    "entity": entity.to_string(),
                    "state": record.state,
                    "stable": record.state.is_stable(),
                    "version": record.version,
                    "changed_at": record.changed_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "Nothing tracked.".dimmed());
    }
    for (entity, record) in records {
        println!(
            "{:<32} {:<10} {}",
            entity.to_string(),
            paint(record.state),
            format!("v{} {}", record.version, record.changed_at.format("%Y-%m-%d %H:%M:%S")).dimmed()
        );
    }
    Ok(())
}

fn parse_entity(value: &str) -> Result<SyncEntity> {
    value
        .parse()
        .map_err(|e: prov_core::Error| CliError::user(e.to_string()))
}

fn paint(state: SyncState) -> ColoredString {
    match state {
        SyncState::Synced => state.as_str().green(),
        SyncState::Erred => state.as_str().red(),
        SyncState::Scheduled | SyncState::Syncing => state.as_str().yellow(),
    }
}
