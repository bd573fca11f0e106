//! Quota commands

use colored::Colorize;
use prov_meta::OwnerType;
use serde_json::json;

use crate::cli::QuotaAction;
use crate::context::ProjectContext;
use crate::error::{CliError, Result};

use super::parse_owner;

/// Run a quota subcommand
pub fn run_quota(context: &ProjectContext, action: QuotaAction) -> Result<()> {
    let inventory = &context.inventory;

    match action {
        QuotaAction::Show { owner, json } => {
            let owner = parse_owner(&owner)?;
            let state = inventory.quota_state(&owner)?;

            if json {
                let output: serde_json::Map<String, serde_json::Value> = state
                    .values()
                    .map(|q| (q.name.clone(), json!({ "limit": q.limit, "usage": q.usage })))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!("{} {}", "Quotas of".bold(), owner.to_string().cyan());
            for quota in state.values() {
                let usage = format!("{}", quota.usage);
                let usage = if quota.usage > quota.limit {
                    usage.red()
                } else {
                    usage.normal()
                };
                println!("   {:<20} {} / {}", quota.name, usage, quota.limit);
            }
        }
        QuotaAction::SetLimit { owner, name, value } => {
            let owner = parse_owner(&owner)?;
            inventory.set_limit(&owner, &name, value)?;
            context.save()?;
            println!("{} {} limit of {} set to {}", "OK".green().bold(), name, owner, value);
        }
        QuotaAction::SetUsage { owner, name, value } => {
            let owner = parse_owner(&owner)?;
            inventory.set_usage(&owner, &name, value)?;
            context.save()?;
            println!("{} {} usage of {} set to {}", "OK".green().bold(), name, owner, value);
        }
        QuotaAction::Sum {
            owner_type,
            ids,
            names,
            json,
        } => {
            let owner_type: OwnerType = owner_type
                .parse()
                .map_err(|e: prov_meta::Error| CliError::user(e.to_string()))?;
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let sums = inventory.sum_across_owners(owner_type, &ids, &names)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&sums.to_flat_map())?);
                return Ok(());
            }

            println!("{} {}", "Totals over".bold(), owner_type.to_string().cyan());
            for (name, sum) in sums.iter() {
                println!("   {:<20} {} / {}", name, sum.usage, sum.limit);
            }
        }
    }
    Ok(())
}
