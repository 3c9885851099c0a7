// ── Commit script builder ──
//
// Renders staged deltas into the shell script the committer uploads.

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::model::VariableDelta;

/// Flushes pending `nvram set`s to flash.
pub const COMMIT_COMMAND: &str = "nvram commit";

/// Characters that force a value into double quotes.
const SHELL_SPECIAL: &[char] = &[
    '<', '>', ';', '&', '|', '\'', '"', '$', '`', '\\', '(', ')', '*', '?', '[', ']', '#', '~',
];

/// Render the script for `deltas`.
///
/// Deltas whose edited value equals the original are skipped. The
/// output is deterministic for a given `generated_at`.
pub fn build_script(deltas: &[VariableDelta], generated_at: NaiveDateTime) -> String {
    let effective: Vec<&VariableDelta> = deltas.iter().filter(|d| d.is_effective()).collect();

    let mut script = String::new();
    script.push_str("#!/bin/sh\n#\n# nvtuner commit script\n");
    let _ = writeln!(
        script,
        "# Generated on {}",
        generated_at.format("%A %-d %B %Y at %H:%M:%S")
    );
    script.push_str("#\n");
    let _ = writeln!(script, "# {} staged change(s)", effective.len());
    script.push_str("#\n\n");

    for delta in &effective {
        script.push_str(&set_line(delta.name(), delta.edited().value_delta()));
        script.push('\n');
    }

    script.push('\n');
    script.push_str(COMMIT_COMMAND);
    script.push('\n');
    script
}

/// Remote file name for a script generated at `generated_at`.
pub fn script_file_name(generated_at: NaiveDateTime) -> String {
    format!("nvtuner_{}.sh", generated_at.format("%Y%m%d_%H%M%S"))
}

/// `nvram set name=value`, quoting the value when the shell would
/// otherwise split or interpret it.
pub fn set_line(name: &str, value: &str) -> String {
    format!("nvram set {name}={}", quote_value(value))
}

fn quote_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || SHELL_SPECIAL.contains(&c));
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '$' | '`' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
