//! Run report: per-machine, per-action outcomes

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one run, returned by the engine and rendered by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Archive the run produced
    pub archive: PathBuf,
    pub machines: Vec<MachineReport>,
}

impl RunReport {
    /// Whether every machine connected and every action succeeded
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.machines.iter().all(|machine| {
            machine.connect_error.is_none()
                && machine
                    .actions
                    .iter()
                    .all(|action| matches!(action.status, ActionStatus::Ok))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineReport {
    pub address: String,
    /// Set when the machine could not be dialed; its actions were skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_error: Option<String>,
    pub actions: Vec<ActionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    /// Directive name (CAPTURE, COPY, RUN, KUBEGET)
    pub kind: &'static str,
    /// Script line the action came from
    pub line: usize,
    /// What happened: output file, copied paths, or a result value
    pub detail: String,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Ok,
    Failed { error: String },
}
