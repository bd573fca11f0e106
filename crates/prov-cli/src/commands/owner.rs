//! Owner and user role commands

use colored::Colorize;
use serde_json::json;

use crate::cli::{OwnerAction, RoleAction};
use crate::context::ProjectContext;
use crate::error::Result;

use super::parse_owner;

/// Run an owner subcommand
pub fn run_owner(context: &ProjectContext, action: OwnerAction) -> Result<()> {
    let inventory = &context.inventory;

    match action {
        OwnerAction::Add { owner, parent } => {
            let owner = parse_owner(&owner)?;
            let parent = parent.as_deref().map(parse_owner).transpose()?;
            inventory.register_owner(owner, parent)?;
            context.save()?;
            println!("{} Registered {}", "OK".green().bold(), owner.to_string().cyan());
        }
        OwnerAction::Remove { owner } => {
            let owner = parse_owner(&owner)?;
            let removed = inventory.remove_owner(&owner)?;
            context.save()?;
            for key in &removed {
                println!("   {} {}", "-".red(), key);
            }
            println!(
                "{} Removed {} owner(s)",
                "OK".green().bold(),
                removed.len()
            );
        }
        OwnerAction::Chain { owner } => {
            let owner = parse_owner(&owner)?;
            let chain = inventory.resolve_owner_chain(&owner)?;
            let rendered: Vec<String> = chain.iter().map(ToString::to_string).collect();
            println!("{}", rendered.join(" -> "));
        }
        OwnerAction::List { json } => {
            let entries = inventory.hierarchy().entries();
            if json {
                let output: Vec<_> = entries
                    .iter()
                    .map(|(owner, parent)| {
                        json!({
                            "owner": owner.to_string(),
                            "parent": parent.map(|p| p.to_string()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if entries.is_empty() {
                println!("{}", "No owners registered.".dimmed());
            } else {
                for (owner, parent) in entries {
                    match parent {
                        Some(parent) => println!("{} {}", owner.to_string().cyan(), format!("(in {})", parent).dimmed()),
                        None => println!("{}", owner.to_string().cyan()),
                    }
                }
            }
        }
    }
    Ok(())
}

/// Run a role subcommand
pub fn run_role(context: &ProjectContext, action: RoleAction) -> Result<()> {
    let inventory = &context.inventory;

    let (customer, verb) = match action {
        RoleAction::Grant { customer } => {
            let customer = parse_owner(&customer)?;
            inventory.grant_user_role(customer)?;
            (customer, "granted")
        }
        RoleAction::Revoke { customer } => {
            let customer = parse_owner(&customer)?;
            inventory.revoke_user_role(customer)?;
            (customer, "revoked")
        }
    };
    context.save()?;

    let count = inventory.get(&customer, prov_meta::names::NC_USER_COUNT)?;
    println!(
        "{} Role {} under {} (users: {}/{})",
        "OK".green().bold(),
        verb,
        customer,
        count.usage,
        count.limit
    );
    Ok(())
}
