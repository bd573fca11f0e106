//! Command implementations for prov-cli

pub mod init;
pub mod owner;
pub mod provision;
pub mod quota;
pub mod sync;

pub use init::run_init;
pub use owner::{run_owner, run_role};
pub use provision::{run_release, run_resize, run_validate};
pub use quota::run_quota;
pub use sync::run_sync;

use prov_core::QuotaDeltas;
use prov_meta::OwnerKey;

use crate::error::{CliError, Result};

/// Parse an owner reference such as `project:1`
pub(crate) fn parse_owner(value: &str) -> Result<OwnerKey> {
    value
        .parse()
        .map_err(|e: prov_meta::Error| CliError::user(e.to_string()))
}

/// Parse `name=value` pairs into quota deltas
pub(crate) fn parse_deltas(pairs: &[String]) -> Result<QuotaDeltas> {
    let mut deltas = QuotaDeltas::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::user(format!("Expected name=value, got '{}'", pair)))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| CliError::user(format!("Invalid number in '{}'", pair)))?;
        *deltas.entry(name.trim().to_string()).or_insert(0.0) += value;
    }
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deltas_sums_repeats() {
        let deltas = parse_deltas(&[
            "storage=10".to_string(),
            "vcpu = 2".to_string(),
            "storage=5.5".to_string(),
        ])
        .unwrap();
        assert_eq!(deltas["storage"], 15.5);
        assert_eq!(deltas["vcpu"], 2.0);
    }

    #[test]
    fn test_parse_deltas_rejects_garbage() {
        assert!(parse_deltas(&["storage".to_string()]).is_err());
        assert!(parse_deltas(&["storage=lots".to_string()]).is_err());
    }

    #[test]
    fn test_parse_owner() {
        assert_eq!(parse_owner("membership:3").unwrap(), OwnerKey::membership(3));
        assert!(matches!(parse_owner("tenant:3"), Err(CliError::User { .. })));
    }
}
