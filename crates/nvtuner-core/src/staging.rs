// ── Staging workspace ──
//
// Single writer for the active working set, the staged-changes list and
// the current selection. Every mutation updates state, then publishes the
// new snapshots, then raises bus notifications; readers never observe a
// half-applied change.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tracing::debug;

use crate::commit::{CommitOutcome, Committer};
use crate::error::CoreError;
use crate::event::{Notification, NotificationBus};
use crate::model::{Nvram, Variable, VariableDelta};
use crate::runner::CommandRunner;
use crate::stream::{Snapshot, SnapshotStream};

pub struct Workspace {
    working: Vec<Variable>,
    staged: Vec<VariableDelta>,
    selected: Option<String>,
    working_tx: watch::Sender<Snapshot<Variable>>,
    staged_tx: watch::Sender<Snapshot<VariableDelta>>,
    selection_tx: watch::Sender<Option<Variable>>,
    bus: NotificationBus,
}

impl Workspace {
    pub fn new(bus: NotificationBus) -> Self {
        let (working_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (staged_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (selection_tx, _) = watch::channel(None);
        Self {
            working: Vec::new(),
            staged: Vec::new(),
            selected: None,
            working_tx,
            staged_tx,
            selection_tx,
            bus,
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn working_set(&self) -> &[Variable] {
        &self.working
    }

    pub fn staged(&self) -> &[VariableDelta] {
        &self.staged
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.working.iter().find(|v| v.name() == name)
    }

    pub fn selected(&self) -> Option<&Variable> {
        self.selected.as_deref().and_then(|name| self.get(name))
    }

    // ── Subscriptions ────────────────────────────────────────────

    pub fn working_stream(&self) -> SnapshotStream<Variable> {
        SnapshotStream::new(self.working_tx.subscribe())
    }

    pub fn staged_stream(&self) -> SnapshotStream<VariableDelta> {
        SnapshotStream::new(self.staged_tx.subscribe())
    }

    /// Follows whichever variable is selected; switching the selection
    /// replaces what the receiver sees, so no callback outlives it.
    pub fn selection(&self) -> watch::Receiver<Option<Variable>> {
        self.selection_tx.subscribe()
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Replace the working set with a fresh snapshot. Staged edits are
    /// discarded; the previous selection survives if the name still
    /// exists, otherwise the first variable is selected.
    pub fn load(&mut self, nvram: &Nvram) {
        let dropped = self.staged.len();
        self.working = nvram.variables().to_vec();
        self.staged.clear();
        self.selected = self
            .selected
            .take()
            .filter(|name| self.working.iter().any(|v| v.name() == name))
            .or_else(|| self.working.first().map(|v| v.name().to_owned()));

        self.publish_all();
        if dropped > 0 {
            debug!(dropped, "staged changes discarded by reload");
            self.bus
                .log(format!("{dropped} staged change(s) abandoned by refresh"));
        }
    }

    /// Forget everything, e.g. after the router disconnects.
    pub fn clear(&mut self) {
        self.working.clear();
        self.staged.clear();
        self.selected = None;
        self.publish_all();
    }

    // ── Selection and editing ────────────────────────────────────

    pub fn select(&mut self, name: &str) -> Result<(), CoreError> {
        self.index_of(name)?;
        self.selected = Some(name.to_owned());
        self.publish_selection();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.publish_selection();
    }

    /// Set the edited value of `name`. Nothing is staged yet.
    pub fn edit(&mut self, name: &str, value: impl Into<String>) -> Result<(), CoreError> {
        let idx = self.index_of(name)?;
        self.working[idx].set_value_delta(value);
        self.publish_working();
        if self.selected.as_deref() == Some(name) {
            self.publish_selection();
        }
        Ok(())
    }

    pub fn edit_selected(&mut self, value: impl Into<String>) -> Result<(), CoreError> {
        let name = self.selected_name()?;
        self.edit(&name, value)
    }

    /// Discard the pending edit on a still-unstaged variable.
    pub fn rollback(&mut self, name: &str) -> Result<(), CoreError> {
        let idx = self.index_of(name)?;
        self.working[idx].rollback();
        self.publish_working();
        if self.selected.as_deref() == Some(name) {
            self.publish_selection();
        }
        self.bus.publish(Notification::VariableRolledBack {
            name: name.to_owned(),
        });
        Ok(())
    }

    // ── Staging ──────────────────────────────────────────────────

    /// Move an edited variable into the staged list.
    ///
    /// Returns `Ok(false)` when there is no edit to stage. Refuses to
    /// stage the last variable of the working set; that check happens
    /// before anything is touched.
    pub fn stage(&mut self, name: &str) -> Result<bool, CoreError> {
        let idx = self.index_of(name)?;
        let variable = &self.working[idx];
        if !variable.is_modified() {
            return Ok(false);
        }
        if self.working.len() == 1 {
            return Err(CoreError::WorkingSetExhausted {
                name: name.to_owned(),
            });
        }

        let delta = VariableDelta::new(variable.original_snapshot(), variable.clone())?;
        self.working.remove(idx);
        self.staged.push(delta);
        let was_selected = self.selected.as_deref() == Some(name);
        if was_selected {
            self.selected = None;
        }

        self.publish_working();
        self.publish_staged();
        if was_selected {
            self.publish_selection();
        }
        self.bus.publish(Notification::VariableStaged {
            name: name.to_owned(),
        });
        Ok(true)
    }

    pub fn stage_selected(&mut self) -> Result<bool, CoreError> {
        let name = self.selected_name()?;
        self.stage(&name)
    }

    /// Move the named deltas back into the working set.
    ///
    /// With `abandon`, the variable returns with its original value;
    /// otherwise it keeps the edit. Unknown names are ignored. Returns
    /// the names actually unstaged.
    pub fn unstage(&mut self, names: &[&str], abandon: bool) -> Vec<String> {
        let mut restored = Vec::new();
        for name in names {
            let Some(pos) = self.staged.iter().position(|d| d.name() == *name) else {
                continue;
            };
            let (original, edited) = self.staged.remove(pos).into_parts();
            restored.push(if abandon { original } else { edited });
        }
        if restored.is_empty() {
            return Vec::new();
        }

        let names: Vec<String> = restored.iter().map(|v| v.name().to_owned()).collect();
        self.working.extend(restored);

        self.publish_working();
        self.publish_staged();
        self.bus.publish(Notification::VariablesUnstaged {
            names: names.clone(),
            abandoned: abandon,
        });
        let count = names.len();
        self.bus.log(format!(
            "{count} variable{} unstaged",
            if count > 1 { "s" } else { "" }
        ));
        names
    }

    /// Unstage everything. Returns how many deltas were unstaged.
    pub fn unstage_all(&mut self, abandon: bool) -> usize {
        let names: Vec<String> = self.staged.iter().map(|d| d.name().to_owned()).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.unstage(&refs, abandon).len()
    }

    // ── Commit ───────────────────────────────────────────────────

    /// Push the staged list. Deltas leave the list only when the
    /// script was applied.
    pub async fn commit<R: CommandRunner>(&mut self, committer: &Committer<R>) -> CommitOutcome {
        self.commit_at(committer, Local::now().naive_local()).await
    }

    /// [`commit`](Self::commit) with a fixed script timestamp, for callers
    /// that already showed the script rendered at `generated_at`.
    pub async fn commit_at<R: CommandRunner>(
        &mut self,
        committer: &Committer<R>,
        generated_at: NaiveDateTime,
    ) -> CommitOutcome {
        let outcome = committer.commit_at(&self.staged, generated_at).await;
        if outcome.is_applied() {
            let committed = std::mem::take(&mut self.staged);
            self.publish_staged();
            self.bus
                .log(format!("{} change(s) committed", committed.len()));
        }
        outcome
    }

    // ── Internals ────────────────────────────────────────────────

    fn index_of(&self, name: &str) -> Result<usize, CoreError> {
        self.working
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| CoreError::VariableNotFound {
                name: name.to_owned(),
            })
    }

    fn selected_name(&self) -> Result<String, CoreError> {
        self.selected
            .clone()
            .ok_or_else(|| CoreError::ValidationFailed {
                message: "no variable is selected".into(),
            })
    }

    fn publish_all(&self) {
        self.publish_working();
        self.publish_staged();
        self.publish_selection();
    }

    fn publish_working(&self) {
        self.working_tx.send_replace(Arc::new(self.working.clone()));
    }

    fn publish_staged(&self) {
        self.staged_tx.send_replace(Arc::new(self.staged.clone()));
    }

    fn publish_selection(&self) {
        self.selection_tx.send_replace(self.selected().cloned());
    }
}
