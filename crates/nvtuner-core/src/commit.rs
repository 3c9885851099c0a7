// ── Committer ──
//
// Pushes a rendered script to the router and runs it: write, chmod,
// execute, strictly in that order. A failure part-way leaves whatever was
// already done on the router; nothing is rolled back.

use chrono::{Local, NaiveDateTime};
use nvtuner_ssh::CommandOutput;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::event::NotificationBus;
use crate::model::VariableDelta;
use crate::runner::CommandRunner;
use crate::script::{build_script, script_file_name};

const HEREDOC_MARKER: &str = "NVTUNER_EOF";

/// What a commit attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Script ran; `output` is its stdout.
    Applied { script_path: String, output: String },
    /// No staged delta actually changes anything.
    NothingToCommit,
    /// A step failed; already reported as a dialog error.
    Failed { reason: String },
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct Committer<R> {
    runner: R,
    bus: NotificationBus,
    scratch_dir: String,
}

impl<R: CommandRunner> Committer<R> {
    pub fn new(runner: R, bus: NotificationBus, scratch_dir: impl Into<String>) -> Self {
        Self {
            runner,
            bus,
            scratch_dir: scratch_dir.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Render `deltas` into a script and run it on the router.
    ///
    /// Never fails: step errors are reported on the bus as a dialog error
    /// and returned as [`CommitOutcome::Failed`].
    pub async fn commit(&self, deltas: &[VariableDelta]) -> CommitOutcome {
        self.commit_at(deltas, Local::now().naive_local()).await
    }

    /// [`commit`](Self::commit) with the timestamp used for the script
    /// header and file name, so the uploaded script is byte-identical to
    /// one rendered earlier with [`build_script`] for the same instant.
    pub async fn commit_at(
        &self,
        deltas: &[VariableDelta],
        generated_at: NaiveDateTime,
    ) -> CommitOutcome {
        if !deltas.iter().any(VariableDelta::is_effective) {
            self.bus.log("No staged changes to commit");
            return CommitOutcome::NothingToCommit;
        }

        let script = build_script(deltas, generated_at);
        let script_path = format!("{}/{}", self.scratch_dir, script_file_name(generated_at));

        match self.push(&script_path, &script).await {
            Ok(output) => {
                info!(script = %script_path, "commit script executed");
                self.bus.log(format!("Executed {script_path}"));
                if !output.trim().is_empty() {
                    self.bus.log(output.trim_end().to_owned());
                }
                CommitOutcome::Applied {
                    script_path,
                    output,
                }
            }
            Err(e) => {
                warn!(script = %script_path, error = %e, "commit failed");
                let reason = e.to_string();
                self.bus
                    .dialog_error(format!("Failed to commit changes to the router: {reason}"));
                CommitOutcome::Failed { reason }
            }
        }
    }

    async fn push(&self, script_path: &str, script: &str) -> Result<String, CoreError> {
        let marker = heredoc_marker(script);
        let upload = format!(
            "mkdir -p '{dir}' && cat > '{script_path}' << '{marker}'\n{script}{marker}\n",
            dir = self.scratch_dir,
        );
        check("write", &self.runner.run_command(&upload).await?)?;
        check(
            "chmod",
            &self
                .runner
                .run_command(&format!("chmod +x '{script_path}'"))
                .await?,
        )?;

        let executed = self.runner.run_command(&format!("sh '{script_path}'")).await?;
        check("execute", &executed)?;
        Ok(executed.stdout)
    }
}

/// Heredoc terminator that no line of `script` matches; a value spanning
/// several lines must not close the heredoc early.
fn heredoc_marker(script: &str) -> String {
    let mut marker = HEREDOC_MARKER.to_owned();
    while script.lines().any(|line| line == marker) {
        marker.push('_');
    }
    marker
}

/// A reported non-zero exit fails the step. A missing status means the
/// runner swallowed a transport error; the sequence carries on.
fn check(step: &'static str, output: &CommandOutput) -> Result<(), CoreError> {
    match output.exit_status {
        Some(code) if code != 0 => Err(CoreError::CommitFailed {
            step,
            message: if output.stderr.trim().is_empty() {
                format!("exit status {code}")
            } else {
                output.stderr.trim().to_owned()
            },
        }),
        _ => Ok(()),
    }
}
