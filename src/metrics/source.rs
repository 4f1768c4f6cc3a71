//! Where metrics snapshots come from.

use async_trait::async_trait;
use kube::Client;
use tokio::process::Command;
use tracing::debug;

use super::base::{list_pod_metrics_http, parse_snapshot, pod_metrics_path, PodMetricsList};
use crate::error::FetchError;

/// A namespaced pod metrics query.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self, namespace: &str) -> Result<PodMetricsList, FetchError>;
}

/// Queries the metrics API through the in-process Kubernetes client.
pub struct KubeApiSource {
    client: Client,
}

impl KubeApiSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsSource for KubeApiSource {
    async fn fetch(&self, namespace: &str) -> Result<PodMetricsList, FetchError> {
        list_pod_metrics_http(&self.client, namespace).await
    }
}

/// Runs `kubectl get --raw` so credentials come from whatever kubectl is configured with.
pub struct KubectlSource {
    program: String,
}

impl KubectlSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn args(namespace: &str) -> Vec<String> {
        vec!["get".to_string(), "--raw".to_string(), pod_metrics_path(namespace)]
    }
}

#[async_trait]
impl MetricsSource for KubectlSource {
    async fn fetch(&self, namespace: &str) -> Result<PodMetricsList, FetchError> {
        let args = Self::args(namespace);
        debug!(program = %self.program, ?args, "querying metrics");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_snapshot(&output.stdout)
    }
}
