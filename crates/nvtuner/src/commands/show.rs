//! Show: list variables, or one variable in detail.

use std::fmt::Write as _;

use tabled::Tabled;

use nvtuner_core::{Variable, VariableKind};

use crate::cli::{GlobalOpts, ShowArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

use super::util::{self, Session};

const VALUE_COLUMN_WIDTH: usize = 60;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct VariableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Bytes")]
    size: usize,
}

impl From<&&Variable> for VariableRow {
    fn from(v: &&Variable) -> Self {
        Self {
            name: v.name().to_owned(),
            value: truncate(v.original_value(), VALUE_COLUMN_WIDTH),
            kind: v.tag().to_string(),
            size: v.size_bytes(),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn matches(variable: &Variable, args: &ShowArgs) -> bool {
    let name_ok = args
        .filter
        .as_deref()
        .is_none_or(|needle| variable.name().contains(needle));
    name_ok && (!args.special || variable.is_special())
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(variable: &Variable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:        {}", variable.name());
    let _ = writeln!(out, "Value:       {}", variable.original_value());
    let _ = writeln!(out, "Bytes:       {}", variable.size_bytes());
    let _ = writeln!(out, "Kind:        {}", variable.tag());
    let _ = writeln!(out, "Default:     {}", variable.default_value());
    let _ = write!(out, "Description: {}", variable.description());

    match variable.kind() {
        VariableKind::Plain => {}
        VariableKind::TripleTuple(records) => {
            let _ = write!(out, "\n\nRecords ({}):", records.len());
            for (i, (a, b, c)) in records.iter().enumerate() {
                let _ = write!(out, "\n  {:>3}. {a} | {b} | {c}", i + 1);
            }
        }
        VariableKind::SixTuple(records) => {
            let _ = write!(out, "\n\nRecords ({}):", records.len());
            for (i, fields) in records.iter().enumerate() {
                let _ = write!(out, "\n  {:>3}. {}", i + 1, fields.join(" | "));
            }
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(target: &Target, args: ShowArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(target, global).await?;
    let loaded = util::load_variables(&session, target).await;
    session.close().await;
    let nvram = loaded?;

    let out = if let Some(ref name) = args.name {
        let variable = nvram
            .get(name)
            .ok_or_else(|| CliError::VariableNotFound { name: name.clone() })?;
        output::render_single(&global.output, variable, detail, |v| {
            v.original_value().to_owned()
        })
    } else {
        let selected: Vec<&Variable> = nvram
            .variables()
            .iter()
            .filter(|v| matches(v, &args))
            .collect();
        output::render_list(&global.output, &selected, |v| VariableRow::from(v), |v| {
            format!("{}={}", v.name(), v.original_value())
        })
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
