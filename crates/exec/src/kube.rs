//! Cluster collection seam for KUBEGET actions
//!
//! The engine only depends on this trait; wiring an actual Kubernetes
//! client (or a recording stub in tests) is the caller's concern. A
//! missing collector or kubeconfig downgrades KUBEGET to a warning.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use triage_errors::Error;
use triage_script::KubeGetCommand;

/// Selection parameters for one KUBEGET action
#[derive(Debug, Clone, Default)]
pub struct KubeParams {
    pub groups: Vec<String>,
    pub kinds: Vec<String>,
    pub namespaces: Vec<String>,
    pub versions: Vec<String>,
    pub names: Vec<String>,
    pub labels: Vec<String>,
    pub containers: Vec<String>,
}

impl From<&KubeGetCommand> for KubeParams {
    fn from(command: &KubeGetCommand) -> Self {
        Self {
            groups: command.groups.clone(),
            kinds: command.kinds.clone(),
            namespaces: command.namespaces.clone(),
            versions: command.versions.clone(),
            names: command.names.clone(),
            labels: command.labels.clone(),
            containers: command.containers.clone(),
        }
    }
}

/// Objects of one kind, ready to serialize as a JSON dump
#[derive(Debug, Clone, Serialize)]
pub struct ObjectList {
    pub kind: String,
    pub items: serde_json::Value,
}

/// A pod whose logs can be streamed
#[derive(Debug, Clone)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub containers: Vec<String>,
}

/// Fetch cluster objects and pod logs for a kubeconfig
#[async_trait]
pub trait ClusterCollector: Send + Sync {
    /// Fetch the object lists the parameters select.
    ///
    /// # Errors
    ///
    /// Returns an error when the cluster cannot be reached or the
    /// selection is invalid.
    async fn fetch_objects(
        &self,
        kubeconfig: &Path,
        params: &KubeParams,
    ) -> Result<Vec<ObjectList>, Error>;

    /// List the pods the parameters select.
    ///
    /// # Errors
    ///
    /// Returns an error when the cluster cannot be reached.
    async fn list_pods(&self, kubeconfig: &Path, params: &KubeParams)
        -> Result<Vec<PodRef>, Error>;

    /// Stream one pod's logs.
    ///
    /// # Errors
    ///
    /// Returns an error when the pod or container is unknown or the
    /// stream fails.
    async fn pod_logs(
        &self,
        kubeconfig: &Path,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
    ) -> Result<Vec<u8>, Error>;
}
