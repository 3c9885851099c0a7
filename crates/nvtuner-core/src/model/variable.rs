// ── NVRAM variable ──

use serde::Serialize;
use strum::{Display, EnumDiscriminants};

/// One `<a>b>c>` record of an `nc_setting_conf`-style value.
pub type TripleTuple = (String, String, String);

/// One `<name>mac>...>` record of a `custom_clientlist`-style value.
pub type SixTuple = [String; 6];

/// Payload shape of a variable, chosen once at parse time from the
/// reserved-name table.
///
/// The decoded records always describe the *original* value; edits are
/// carried as raw text in [`Variable::value_delta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, EnumDiscriminants)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
#[strum_discriminants(name(VariableKindTag), derive(Display, Hash))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
pub enum VariableKind {
    /// Opaque string.
    Plain,
    TripleTuple(Vec<TripleTuple>),
    SixTuple(Vec<SixTuple>),
}

/// A single `name=value` entry.
///
/// `size_bytes` always tracks the length of `value_delta`, so it is only
/// reachable through [`Variable::set_value_delta`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    name: String,
    original_value: String,
    value_delta: String,
    size_bytes: usize,
    description: String,
    default_value: String,
    kind: VariableKind,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        kind: VariableKind,
        description: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            size_bytes: value.len(),
            value_delta: value.clone(),
            original_value: value,
            description: description.into(),
            default_value: default_value.into(),
            kind,
        }
    }

    /// Plain variable with no reference metadata.
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, VariableKind::Plain, "Unknown", "Unknown")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    pub fn value_delta(&self) -> &str {
        &self.value_delta
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn tag(&self) -> VariableKindTag {
        VariableKindTag::from(&self.kind)
    }

    /// Tuple-encoded variables get dedicated rendering.
    pub fn is_special(&self) -> bool {
        !matches!(self.kind, VariableKind::Plain)
    }

    pub fn is_modified(&self) -> bool {
        self.value_delta != self.original_value
    }

    pub fn set_value_delta(&mut self, value: impl Into<String>) {
        self.value_delta = value.into();
        self.size_bytes = self.value_delta.len();
    }

    pub fn rollback(&mut self) {
        self.value_delta.clone_from(&self.original_value);
        self.size_bytes = self.value_delta.len();
    }

    /// Copy of this variable as it was loaded, edits discarded.
    pub fn original_snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.rollback();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_starts_equal_to_original() {
        let var = Variable::plain("lan_ipaddr", "192.168.1.1");
        assert_eq!(var.value_delta(), var.original_value());
        assert_eq!(var.size_bytes(), 11);
        assert!(!var.is_modified());
        assert!(!var.is_special());
    }

    #[test]
    fn size_tracks_edited_value() {
        let mut var = Variable::plain("lan_ipaddr", "192.168.1.1");
        var.set_value_delta("10.0.0.1");
        assert_eq!(var.size_bytes(), 8);
        assert!(var.is_modified());
        assert_eq!(var.original_value(), "192.168.1.1");
    }

    #[test]
    fn rollback_restores_original() {
        let mut var = Variable::plain("wl0_ssid", "home");
        var.set_value_delta("home-5g");
        var.rollback();
        assert_eq!(var.value_delta(), "home");
        assert_eq!(var.size_bytes(), 4);
        assert!(!var.is_modified());
    }

    #[test]
    fn original_snapshot_keeps_edit_on_source() {
        let mut var = Variable::plain("wl0_ssid", "home");
        var.set_value_delta("away");
        let snap = var.original_snapshot();
        assert_eq!(snap.value_delta(), "home");
        assert_eq!(var.value_delta(), "away");
    }

    #[test]
    fn tuple_kinds_are_special() {
        let var = Variable::new(
            "nc_setting_conf",
            "<a>b>c>",
            VariableKind::TripleTuple(vec![("a".into(), "b".into(), "c".into())]),
            "Unknown",
            "Unknown",
        );
        assert!(var.is_special());
        assert_eq!(var.tag(), VariableKindTag::TripleTuple);
        assert_eq!(var.tag().to_string(), "triple_tuple");
    }
}
