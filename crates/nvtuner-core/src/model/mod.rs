// ── Domain model ──
//
// In-memory representation of a router's NVRAM: individual variables,
// the snapshot they belong to, and staged (original, edited) pairs.

pub mod delta;
pub mod nvram;
pub mod variable;

// ── Re-exports ──────────────────────────────────────────────────────

pub use delta::VariableDelta;
pub use nvram::{Nvram, NvramUsage};
pub use variable::{SixTuple, TripleTuple, Variable, VariableKind, VariableKindTag};
