#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Execution engine for triage scripts
//!
//! Walks the machines a script targets, dispatches each action to the
//! local-process or SSH-remote backend, lays captured output out under a
//! per-machine subdirectory of the workdir, and packages the tree into
//! the final archive. Per-action failures are recorded and recovered so
//! a run always produces a best-effort archive; only parse, credential,
//! and archive failures abort.

pub mod credentials;
pub mod kube;

mod context;
mod engine;
mod local;
mod remote;
mod report;
mod retry;
mod sanitize;

pub use context::ExecutionContext;
pub use credentials::Credentials;
pub use engine::{Engine, EngineOptions};
pub use kube::{ClusterCollector, KubeParams, ObjectList, PodRef};
pub use local::{copy_local, run_local, CommandOutput};
pub use remote::RemoteExecutor;
pub use report::{ActionReport, ActionStatus, MachineReport, RunReport};
pub use retry::RetryPolicy;
pub use sanitize::{output_file_name, sanitize};
