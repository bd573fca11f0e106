//! Quota sums across owners, used for reporting

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summed limit and usage of one quota name
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotaSum {
    pub limit: f64,
    pub usage: f64,
}

/// Sums keyed by quota name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotaSums {
    sums: BTreeMap<String, QuotaSum>,
}

impl QuotaSums {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, name: &str, limit: f64, usage: f64) {
        let sum = self.sums.entry(name.to_string()).or_default();
        sum.limit += limit;
        sum.usage += usage;
    }

    pub fn get(&self, name: &str) -> Option<&QuotaSum> {
        self.sums.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QuotaSum)> {
        self.sums.iter()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Flatten into `{name: limit_sum, name_usage: usage_sum}`
    ///
    /// This is the shape dashboards consume.
    pub fn to_flat_map(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        for (name, sum) in &self.sums {
            flat.insert(name.clone(), sum.limit);
            flat.insert(format!("{}_usage", name), sum.usage);
        }
        flat
    }
}
