// Metrics snapshot retrieval and normalization
pub mod base;
pub mod extract;
pub mod source;

pub use base::{list_pod_metrics_http, parse_snapshot, ContainerMetrics, PodMetricsItem, PodMetricsList};
pub use extract::extract_usage;
pub use source::{KubeApiSource, KubectlSource, MetricsSource};
