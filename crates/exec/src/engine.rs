//! Execution engine: walks machines × actions and archives the result
//!
//! Actions run strictly in script order within a machine; machines run
//! one after another, each with its own context, so nothing is shared
//! across machines except the read-only script. A machine that cannot
//! be dialed is recorded and skipped; the remaining machines still run
//! and the archive is still produced.

use crate::context::ExecutionContext;
use crate::credentials::{self, Credentials};
use crate::kube::{ClusterCollector, KubeParams};
use crate::local::{copy_local, run_local, CommandOutput};
use crate::remote::RemoteExecutor;
use crate::report::{ActionReport, ActionStatus, MachineReport, RunReport};
use crate::retry::RetryPolicy;
use crate::sanitize::{output_file_name, sanitize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use triage_errors::{Error, ExecError};
use triage_script::{
    Action, CommandSpec, CopyCommand, KubeGetCommand, KubeGetWhat, Machine, Script,
};

/// Per-run knobs layered over the script's preambles
pub struct EngineOptions {
    /// Overrides the script's WORKDIR
    pub workdir: Option<PathBuf>,
    /// Overrides the script's OUTPUT
    pub output: Option<PathBuf>,
    /// Extra environment entries appended after the script's ENV
    pub extra_env: Vec<(String, String)>,
    /// Backoff policy for SSH dials and SCP transfers
    pub retry: RetryPolicy,
    /// Cluster collection backend for KUBEGET; absent means skip
    pub collector: Option<Arc<dyn ClusterCollector>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workdir: None,
            output: None,
            extra_env: Vec::new(),
            retry: RetryPolicy::default(),
            collector: None,
        }
    }
}

/// Executes a parsed script against its target machines
pub struct Engine {
    script: Script,
    options: EngineOptions,
}

impl Engine {
    #[must_use]
    pub fn new(script: Script, options: EngineOptions) -> Self {
        Self { script, options }
    }

    /// Run the whole script and package the workdir into the archive.
    ///
    /// # Errors
    ///
    /// Returns an error for credential resolution failures, an
    /// unwritable workdir, or a failed archive step. Per-action and
    /// per-machine failures are recorded in the report instead.
    pub async fn execute(&self) -> Result<RunReport, Error> {
        let credentials = credentials::resolve(&self.script)?;

        let root = self
            .options
            .workdir
            .clone()
            .unwrap_or_else(|| self.script.workdir.path.clone());
        let root = std::path::absolute(&root).map_err(|e| Error::io_with_path(&e, &root))?;
        fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::io_with_path(&e, &root))?;

        let output = self
            .options
            .output
            .clone()
            .unwrap_or_else(|| self.script.output.path.clone());

        let mut machines = Vec::with_capacity(self.script.from.machines.len());
        for machine in &self.script.from.machines {
            tracing::info!(machine = %machine, "collecting");
            machines.push(self.run_machine(machine, &credentials, &root).await);
        }

        triage_archive::create(&root, &output).await?;
        tracing::info!(archive = %output.display(), "archive written");

        Ok(RunReport {
            archive: output,
            machines,
        })
    }

    async fn run_machine(
        &self,
        machine: &Machine,
        credentials: &Credentials,
        root: &Path,
    ) -> MachineReport {
        let address = machine.address();
        let machine_dir = root.join(sanitize(&address));
        if let Err(e) = fs::create_dir_all(&machine_dir).await {
            return MachineReport {
                address,
                connect_error: Some(format!("workdir {}: {e}", machine_dir.display())),
                actions: Vec::new(),
            };
        }

        let mut ctx =
            ExecutionContext::new(machine_dir, &self.script.env, &self.options.extra_env);

        let remote = if machine.is_local() {
            None
        } else {
            match RemoteExecutor::connect(machine, credentials, &self.options.retry).await {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::error!(machine = %address, error = %e, "connection failed, skipping machine");
                    return MachineReport {
                        address,
                        connect_error: Some(e.to_string()),
                        actions: Vec::new(),
                    };
                }
            }
        };

        let mut actions = Vec::with_capacity(self.script.actions.len());
        for action in &self.script.actions {
            let report = self
                .run_action(action, &mut ctx, remote.as_ref(), credentials)
                .await;
            if let ActionStatus::Failed { error } = &report.status {
                tracing::warn!(
                    machine = %address,
                    kind = report.kind,
                    line = report.line,
                    error = %error,
                    "action failed"
                );
            }
            actions.push(report);
        }

        MachineReport {
            address,
            connect_error: None,
            actions,
        }
    }

    async fn run_action(
        &self,
        action: &Action,
        ctx: &mut ExecutionContext,
        remote: Option<&RemoteExecutor>,
        credentials: &Credentials,
    ) -> ActionReport {
        match action {
            Action::Capture(spec) => self.capture(spec, ctx, remote, credentials).await,
            Action::Run(spec) => self.run(spec, ctx, remote, credentials).await,
            Action::Copy(copy) => self.copy(copy, ctx, remote).await,
            Action::KubeGet(kube) => self.kubeget(kube, ctx).await,
        }
    }

    async fn exec_command(
        &self,
        spec: &CommandSpec,
        ctx: &ExecutionContext,
        remote: Option<&RemoteExecutor>,
        credentials: &Credentials,
    ) -> Result<CommandOutput, Error> {
        match remote {
            Some(session) => session.exec(ctx.command_line(spec)).await,
            None => {
                let (program, args) = ctx.resolve_command(spec)?;
                run_local(&program, &args, ctx.env(), credentials.uid, credentials.gid).await
            }
        }
    }

    /// CAPTURE: write combined output (or an error marker) to the
    /// deterministically named file under the machine workdir.
    async fn capture(
        &self,
        spec: &CommandSpec,
        ctx: &ExecutionContext,
        remote: Option<&RemoteExecutor>,
        credentials: &Credentials,
    ) -> ActionReport {
        let file = ctx.workdir().join(output_file_name(&spec.cmd));
        let (detail, status) = match self.exec_command(spec, ctx, remote, credentials).await {
            Ok(result) => {
                if !result.success() {
                    tracing::warn!(cmd = %spec.cmd, code = ?result.exit_code, "captured command exited non-zero");
                }
                match fs::write(&file, result.output.as_bytes()).await {
                    Ok(()) => (file.display().to_string(), ActionStatus::Ok),
                    Err(e) => (
                        file.display().to_string(),
                        ActionStatus::Failed {
                            error: format!("write {}: {e}", file.display()),
                        },
                    ),
                }
            }
            Err(e) => {
                let marker = format!("error executing command: {e}\n");
                if let Err(write_err) = fs::write(&file, marker.as_bytes()).await {
                    tracing::warn!(file = %file.display(), error = %write_err, "marker write failed");
                }
                (
                    file.display().to_string(),
                    ActionStatus::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };
        ActionReport {
            kind: "CAPTURE",
            line: spec.line,
            detail,
            status,
        }
    }

    /// RUN: execute, trim, and store the result for later `${CMD_RESULT}`
    /// expansion on this machine. A failure stores the empty string so
    /// later RUN actions see a defined value.
    async fn run(
        &self,
        spec: &CommandSpec,
        ctx: &mut ExecutionContext,
        remote: Option<&RemoteExecutor>,
        credentials: &Credentials,
    ) -> ActionReport {
        let (detail, status) = match self.exec_command(spec, ctx, remote, credentials).await {
            Ok(result) if result.success() => {
                ctx.set_result(&result.output);
                let stored = ctx.last_result().unwrap_or_default().to_string();
                if spec.echo {
                    tracing::info!(cmd = %spec.cmd, result = %stored, "run result");
                }
                (stored, ActionStatus::Ok)
            }
            Ok(result) => {
                ctx.set_result("");
                (
                    String::new(),
                    ActionStatus::Failed {
                        error: ExecError::NonZeroExit {
                            command: spec.cmd.clone(),
                            code: result.exit_code.unwrap_or(-1),
                        }
                        .to_string(),
                    },
                )
            }
            Err(e) => {
                ctx.set_result("");
                (
                    String::new(),
                    ActionStatus::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };
        ActionReport {
            kind: "RUN",
            line: spec.line,
            detail,
            status,
        }
    }

    /// COPY: fetch each path under the machine workdir. Path failures
    /// are recorded and do not stop the remaining paths or actions.
    async fn copy(
        &self,
        command: &CopyCommand,
        ctx: &ExecutionContext,
        remote: Option<&RemoteExecutor>,
    ) -> ActionReport {
        let mut copied = Vec::new();
        let mut failures = Vec::new();

        for path in &command.paths {
            let expanded = ctx.expand(path);
            let result = match remote {
                Some(session) => {
                    session
                        .fetch(
                            expanded.clone(),
                            ctx.workdir().to_path_buf(),
                            &self.options.retry,
                        )
                        .await
                }
                None => copy_local(&expanded, ctx.workdir()).await,
            };
            match result {
                Ok(files) => copied.extend(files),
                Err(e) => {
                    tracing::warn!(path = %expanded, error = %e, "copy failed");
                    failures.push(format!("{expanded}: {e}"));
                }
            }
        }

        let status = if failures.is_empty() {
            ActionStatus::Ok
        } else {
            ActionStatus::Failed {
                error: failures.join("; "),
            }
        };
        ActionReport {
            kind: "COPY",
            line: command.line,
            detail: format!("{} file(s) copied", copied.len()),
            status,
        }
    }

    /// KUBEGET: one JSON file per fetched kind, one log file per pod.
    /// Missing collector or kubeconfig downgrades to a warning.
    async fn kubeget(&self, command: &KubeGetCommand, ctx: &ExecutionContext) -> ActionReport {
        let Some(collector) = &self.options.collector else {
            tracing::warn!("no cluster collector wired, skipping KUBEGET");
            return kubeget_report(command, "skipped: no cluster collector".to_string(), ActionStatus::Ok);
        };
        let Some(kube_config) = &self.script.kube_config else {
            tracing::warn!("no KUBECONFIG preamble, skipping KUBEGET");
            return kubeget_report(command, "skipped: no kubeconfig".to_string(), ActionStatus::Ok);
        };
        if !kube_config.path.exists() {
            tracing::warn!(path = %kube_config.path.display(), "kubeconfig missing, skipping KUBEGET");
            return kubeget_report(
                command,
                format!("skipped: kubeconfig {} missing", kube_config.path.display()),
                ActionStatus::Ok,
            );
        }

        let params = KubeParams::from(command);
        let mut written = 0usize;

        if matches!(command.what, KubeGetWhat::Objects | KubeGetWhat::All) {
            match collector.fetch_objects(&kube_config.path, &params).await {
                Ok(lists) => {
                    for list in lists {
                        let file = ctx
                            .workdir()
                            .join(format!("kubeget_{}.json", sanitize(&list.kind)));
                        match serde_json::to_vec_pretty(&list.items) {
                            Ok(body) => match fs::write(&file, body).await {
                                Ok(()) => written += 1,
                                Err(e) => {
                                    return kubeget_report(
                                        command,
                                        format!("{written} file(s) written"),
                                        ActionStatus::Failed {
                                            error: format!("write {}: {e}", file.display()),
                                        },
                                    );
                                }
                            },
                            Err(e) => {
                                return kubeget_report(
                                    command,
                                    format!("{written} file(s) written"),
                                    ActionStatus::Failed {
                                        error: format!("encode {}: {e}", list.kind),
                                    },
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    return kubeget_report(
                        command,
                        format!("{written} file(s) written"),
                        ActionStatus::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        if matches!(command.what, KubeGetWhat::Logs | KubeGetWhat::All) {
            let pods = match collector.list_pods(&kube_config.path, &params).await {
                Ok(pods) => pods,
                Err(e) => {
                    return kubeget_report(
                        command,
                        format!("{written} file(s) written"),
                        ActionStatus::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            };
            for pod in pods {
                let containers: Vec<Option<&str>> = if command.containers.is_empty() {
                    vec![None]
                } else {
                    pod.containers
                        .iter()
                        .filter(|c| command.containers.contains(c))
                        .map(|c| Some(c.as_str()))
                        .collect()
                };
                for container in containers {
                    let logs = match collector
                        .pod_logs(&kube_config.path, &pod.namespace, &pod.name, container)
                        .await
                    {
                        Ok(logs) => logs,
                        Err(e) => {
                            tracing::warn!(
                                pod = %pod.name,
                                namespace = %pod.namespace,
                                error = %e,
                                "pod log fetch failed"
                            );
                            continue;
                        }
                    };
                    let mut name = format!("pod_{}_{}", sanitize(&pod.namespace), sanitize(&pod.name));
                    if let Some(container) = container {
                        name.push('_');
                        name.push_str(&sanitize(container));
                    }
                    name.push_str(".log");
                    let file = ctx.workdir().join(name);
                    match fs::write(&file, logs).await {
                        Ok(()) => written += 1,
                        Err(e) => {
                            return kubeget_report(
                                command,
                                format!("{written} file(s) written"),
                                ActionStatus::Failed {
                                    error: format!("write {}: {e}", file.display()),
                                },
                            );
                        }
                    }
                }
            }
        }

        kubeget_report(command, format!("{written} file(s) written"), ActionStatus::Ok)
    }
}

fn kubeget_report(command: &KubeGetCommand, detail: String, status: ActionStatus) -> ActionReport {
    ActionReport {
        kind: "KUBEGET",
        line: command.line,
        detail,
        status,
    }
}
