// ── Firmware defaults reference ──
//
// Description and factory default for known variables, extracted from
// the firmware's `defaults.c`. Bundled at build time, parsed once.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;
use tracing::warn;

const BUNDLED: &str = include_str!("../data/firmware_defaults.json");

/// Placeholder for missing or empty reference fields.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    default: String,
    #[serde(default)]
    description: String,
}

/// Lookup table keyed on variable name.
#[derive(Debug, Clone, Default)]
pub struct FirmwareDefaults {
    entries: HashMap<String, Entry>,
}

static BUNDLED_DEFAULTS: LazyLock<FirmwareDefaults> =
    LazyLock::new(|| match FirmwareDefaults::from_json(BUNDLED) {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "bundled firmware defaults are unreadable; descriptions disabled");
            FirmwareDefaults::default()
        }
    });

impl FirmwareDefaults {
    /// The table shipped with the crate.
    pub fn bundled() -> &'static Self {
        &BUNDLED_DEFAULTS
    }

    /// Parse `{ "<name>": { "default": "...", "description": "..." } }`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Description for `name`, or [`UNKNOWN`].
    pub fn description(&self, name: &str) -> &str {
        self.entries
            .get(name)
            .map(|e| e.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN)
    }

    /// Factory default for `name`, or [`UNKNOWN`].
    pub fn default_value(&self, name: &str) -> &str {
        self.entries
            .get(name)
            .map(|e| e.default.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_parses() {
        let table = FirmwareDefaults::from_json(BUNDLED).unwrap();
        assert!(!table.is_empty());
        assert_eq!(FirmwareDefaults::bundled().len(), table.len());
    }

    #[test]
    fn known_entries() {
        let table = FirmwareDefaults::bundled();
        assert_eq!(table.default_value("restore_defaults"), "0");
        assert_eq!(
            table.description("restore_defaults"),
            "Set to 0 to not restore defaults on boot"
        );
        assert_eq!(table.default_value("sw_mode"), "1");
        assert_eq!(table.description("sw_mode"), "big switch for different mode");
    }

    #[test]
    fn empty_and_missing_fields_are_unknown() {
        let table = FirmwareDefaults::from_json(
            r#"{"a": {"default": "", "description": ""}, "b": {"default": "7"}}"#,
        )
        .unwrap();
        assert_eq!(table.description("a"), UNKNOWN);
        assert_eq!(table.default_value("a"), UNKNOWN);
        assert_eq!(table.default_value("b"), "7");
        assert_eq!(table.description("b"), UNKNOWN);
        assert_eq!(table.description("zzz"), UNKNOWN);
    }
}
