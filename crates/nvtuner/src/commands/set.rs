//! Set: stage edits, preview them, confirm, commit.

use std::fmt::Write as _;

use chrono::Local;
use serde::Serialize;

use nvtuner_core::{
    CommitOutcome, Committer, DiffDelimiter, DiffLine, VariableDelta, Workspace, build_script,
    diff_delta,
};

use crate::cli::{GlobalOpts, SetArgs, SplitMode};
use crate::config::Target;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{self, Session};

// ── Plan ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PlannedChange {
    name: String,
    original: String,
    edited: String,
    diff: Vec<DiffLine>,
}

impl PlannedChange {
    fn new(delta: &VariableDelta, delimiter: DiffDelimiter) -> Self {
        Self {
            name: delta.name().to_owned(),
            original: delta.original().original_value().to_owned(),
            edited: delta.edited().value_delta().to_owned(),
            diff: diff_delta(delta, delimiter),
        }
    }
}

/// What `set` is about to push.
#[derive(Debug, Serialize)]
struct Plan {
    router: String,
    changes: Vec<PlannedChange>,
    script: String,
}

fn delimiter(mode: SplitMode) -> DiffDelimiter {
    match mode {
        SplitMode::NoSplit => DiffDelimiter::NoSplit,
        SplitMode::Comma => DiffDelimiter::Comma,
        SplitMode::LessThan => DiffDelimiter::LessThan,
    }
}

fn render_diff(changes: &[PlannedChange], painter: Painter) -> String {
    let mut out = String::new();
    for change in changes {
        let _ = writeln!(out, "{}", painter.heading(&change.name));
        for line in &change.diff {
            let _ = match line {
                DiffLine::Unchanged(text) => writeln!(out, "{}", painter.dim(&format!("  {text}"))),
                DiffLine::Removed(text) => writeln!(out, "{}", painter.removed(&format!("- {text}"))),
                DiffLine::Added(text) => writeln!(out, "{}", painter.added(&format!("+ {text}"))),
            };
        }
        out.push('\n');
    }
    out
}

fn detail(plan: &Plan, painter: Painter) -> String {
    format!("{}{}", render_diff(&plan.changes, painter), plan.script.trim_end())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(target: &Target, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let edits = args
        .assignments
        .iter()
        .map(|raw| util::parse_assignment(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let session = Session::open(target, global).await?;
    let result = apply(&session, target, &edits, &args, global).await;
    session.close().await;
    result
}

async fn apply(
    session: &Session,
    target: &Target,
    edits: &[(&str, &str)],
    args: &SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let nvram = util::load_variables(session, target).await?;
    let mut workspace = Workspace::new(session.bus.clone());
    workspace.load(&nvram);

    for &(name, value) in edits {
        if workspace.staged().iter().any(|d| d.name() == name) {
            return Err(CliError::Validation {
                field: name.into(),
                reason: "assigned more than once".into(),
            });
        }
        workspace.edit(name, value)?;
        if !workspace.stage(name)? && !global.quiet {
            session.suspend(|| eprintln!("'{name}' already holds that value; skipped"));
        }
    }

    if workspace.staged_count() == 0 {
        if !global.quiet {
            session.suspend(|| eprintln!("Nothing to commit"));
        }
        return Ok(());
    }

    let split = delimiter(args.split);
    let generated_at = Local::now().naive_local();
    let plan = Plan {
        router: target.router.display_name().to_owned(),
        changes: workspace
            .staged()
            .iter()
            .map(|d| PlannedChange::new(d, split))
            .collect(),
        script: build_script(workspace.staged(), generated_at),
    };
    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &plan,
        |p| detail(p, painter),
        |p| p.script.clone(),
    );
    session.suspend(|| output::print_output(&out, global.quiet));

    if args.dry_run {
        workspace.unstage_all(true);
        return Ok(());
    }

    let prompt = format!(
        "Commit {} change(s) to {}?",
        workspace.staged_count(),
        plan.router
    );
    if !session.suspend(|| util::confirm(&prompt, global.yes))? {
        workspace.unstage_all(true);
        if !global.quiet {
            eprintln!("Aborted; nothing was written to the router");
        }
        return Ok(());
    }

    session.status("Committing");
    let committer = Committer::new(
        session.manager.clone(),
        session.bus.clone(),
        target.session.scratch_dir.clone(),
    );
    match workspace.commit_at(&committer, generated_at).await {
        CommitOutcome::Applied {
            script_path,
            output,
        } => {
            if !global.quiet {
                session.suspend(|| {
                    eprintln!("✓ Executed {script_path}");
                    if !output.trim().is_empty() {
                        println!("{}", output.trim_end());
                    }
                });
            }
            Ok(())
        }
        CommitOutcome::NothingToCommit => {
            if !global.quiet {
                session.suspend(|| eprintln!("Nothing to commit"));
            }
            Ok(())
        }
        CommitOutcome::Failed { reason } => Err(CliError::CommitFailed { reason }),
    }
}
