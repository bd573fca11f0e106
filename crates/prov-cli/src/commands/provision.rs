//! Provisioning commands: validate, release and resize

use colored::Colorize;
use prov_core::{Error as CoreError, QuotaDeltas, ResizeRequest};
use serde_json::json;

use crate::cli::ResizeArgs;
use crate::context::ProjectContext;
use crate::error::{CliError, Result};

use super::{parse_deltas, parse_owner};

/// Check deltas and reserve them
///
/// Quota violations are printed in full before the error is returned.
pub fn run_validate(context: &ProjectContext, owner: &str, deltas: &[String], json: bool) -> Result<()> {
    let owner = parse_owner(owner)?;
    let deltas = parse_deltas(deltas)?;

    match context.inventory.validate(owner, deltas) {
        Ok(commitment) => {
            context.save()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&commitment)?);
            } else {
                println!(
                    "{} Reserved for {} (commitment {})",
                    "OK".green().bold(),
                    owner.to_string().cyan(),
                    commitment.id
                );
            }
            Ok(())
        }
        Err(CoreError::QuotaExceeded(violations)) if json => {
            let output = json!({ "error": "quota_exceeded", "violations": violations });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Err(CoreError::QuotaExceeded(violations).into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Return reserved usage
pub fn run_release(context: &ProjectContext, owner: &str, deltas: &[String]) -> Result<()> {
    let owner = parse_owner(owner)?;
    let deltas = parse_deltas(deltas)?;

    context.inventory.ledger().release(&owner, &deltas)?;
    context.save()?;
    println!("{} Released usage of {}", "OK".green().bold(), owner);
    Ok(())
}

/// Check and reserve a resize
pub fn run_resize(context: &ProjectContext, args: &ResizeArgs) -> Result<()> {
    let owner = parse_owner(&args.owner)?;
    let request = ResizeRequest {
        disk_size_delta: args.disk.as_deref().map(parse_change).transpose()?,
        vcpu_delta: args.vcpu.as_deref().map(parse_change).transpose()?,
        ram_delta: args.ram.as_deref().map(parse_change).transpose()?,
    };

    let commitment = context.inventory.validate_resize(owner, &request)?;
    context.save()?;
    println!(
        "{} Resize reserved for {}: {}",
        "OK".green().bold(),
        owner.to_string().cyan(),
        format_deltas(&commitment.deltas)
    );
    Ok(())
}

/// Parse `OLD:NEW` into the difference `NEW - OLD`
fn parse_change(value: &str) -> Result<f64> {
    let invalid = || CliError::user(format!("Expected OLD:NEW, got '{}'", value));
    let (old, new) = value.split_once(':').ok_or_else(invalid)?;
    let old: f64 = old.trim().parse().map_err(|_| invalid())?;
    let new: f64 = new.trim().parse().map_err(|_| invalid())?;
    Ok(new - old)
}

fn format_deltas(deltas: &QuotaDeltas) -> String {
    deltas
        .iter()
        .map(|(name, delta)| format!("{}{:+}", name, delta))
        .collect::<Vec<_>>()
        .join(", ")
}
