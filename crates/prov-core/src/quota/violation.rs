//! Quota violation reporting
//!
//! A rejected reservation reports every quota it would have pushed over
//! its limit, never just the first one found.

use std::fmt;

use prov_meta::OwnerKey;
use serde::{Deserialize, Serialize};

/// One quota that a reservation would have exceeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaViolation {
    pub owner: OwnerKey,
    pub name: String,
    pub limit: f64,
    pub usage: f64,
    /// Usage the quota would have reached had the delta been applied
    pub requested_total: f64,
}

impl fmt::Display for QuotaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} quota limit: {}, usage: {}, requires {} ({})",
            self.name, self.limit, self.usage, self.requested_total, self.owner
        )
    }
}

/// All violations of a single rejected reservation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaViolations {
    violations: Vec<QuotaViolation>,
}

impl QuotaViolations {
    pub fn new(violations: Vec<QuotaViolation>) -> Self {
        Self { violations }
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuotaViolation> {
        self.violations.iter()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violation for a quota name, if that quota was exceeded
    pub fn get(&self, name: &str) -> Option<&QuotaViolation> {
        self.violations.iter().find(|v| v.name == name)
    }

    /// Names of every exceeded quota
    pub fn names(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.name.as_str()).collect()
    }
}

impl fmt::Display for QuotaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "One or more quotas are over limit:")?;
        for violation in &self.violations {
            write!(f, "\n  {}", violation)?;
        }
        Ok(())
    }
}

impl IntoIterator for QuotaViolations {
    type Item = QuotaViolation;
    type IntoIter = std::vec::IntoIter<QuotaViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}
