use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerMetrics {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetricsItem {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

impl PodMetricsItem {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// One `metrics.k8s.io` pod list covering a namespace at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetricsList {
    #[serde(default)]
    pub items: Vec<PodMetricsItem>,
}

pub fn pod_metrics_path(namespace: &str) -> String {
    format!("/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods", namespace)
}

pub fn parse_snapshot(body: &[u8]) -> Result<PodMetricsList, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

pub async fn list_pod_metrics_http(client: &Client, namespace: &str) -> Result<PodMetricsList, FetchError> {
    use http::Request as HttpRequest;
    let req = HttpRequest::builder()
        .method("GET")
        .uri(pod_metrics_path(namespace))
        .body(Vec::new())?;
    let list: PodMetricsList = client.request(req).await?;
    Ok(list)
}
