// ── Staged change ──

use serde::Serialize;

use super::variable::Variable;
use crate::error::CoreError;

/// An (original, edited) pair awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDelta {
    original: Variable,
    edited: Variable,
}

impl VariableDelta {
    /// Pair two snapshots of the same variable.
    ///
    /// Both must share the same payload shape; mixing shapes is a
    /// programming error and is rejected immediately.
    pub fn new(original: Variable, edited: Variable) -> Result<Self, CoreError> {
        if original.tag() != edited.tag() {
            return Err(CoreError::VariantMismatch {
                name: original.name().to_owned(),
                original: original.tag(),
                edited: edited.tag(),
            });
        }
        Ok(Self { original, edited })
    }

    pub fn name(&self) -> &str {
        self.original.name()
    }

    pub fn original(&self) -> &Variable {
        &self.original
    }

    pub fn edited(&self) -> &Variable {
        &self.edited
    }

    /// Edited value still differs from what the router holds.
    pub fn is_effective(&self) -> bool {
        self.edited.value_delta() != self.original.original_value()
    }

    pub fn into_parts(self) -> (Variable, Variable) {
        (self.original, self.edited)
    }
}
