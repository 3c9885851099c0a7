// ── NVRAM snapshot ──

use chrono::{DateTime, Local};
use serde::Serialize;

use super::variable::Variable;

/// Capacity figures from the `size: N bytes (M left)` usage line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NvramUsage {
    pub total_bytes: u64,
    pub remaining_bytes: u64,
}

impl NvramUsage {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.remaining_bytes)
    }
}

/// Immutable result of one successful dump. A reload builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nvram {
    variables: Vec<Variable>,
    usage: NvramUsage,
    variable_size_bytes: u64,
    retrieved_at: DateTime<Local>,
}

impl Nvram {
    pub fn new(variables: Vec<Variable>, usage: NvramUsage, retrieved_at: DateTime<Local>) -> Self {
        let variable_size_bytes = variables
            .iter()
            .map(|v| v.name().len() + v.original_value().len())
            .map(|n| u64::try_from(n).unwrap_or(u64::MAX))
            .fold(0_u64, u64::saturating_add);
        Self {
            variables,
            usage,
            variable_size_bytes,
            retrieved_at,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn usage(&self) -> NvramUsage {
        self.usage
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.usage.total_bytes
    }

    pub fn remaining_size_bytes(&self) -> u64 {
        self.usage.remaining_bytes
    }

    /// Sum of `name + original value` lengths over every variable.
    pub fn variable_size_bytes(&self) -> u64 {
        self.variable_size_bytes
    }

    pub fn retrieved_at(&self) -> DateTime<Local> {
        self.retrieved_at
    }
}
