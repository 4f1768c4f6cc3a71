use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized usage of one pod at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PodUsage {
    /// Millicores
    pub cpu: f64,
    /// Mebibytes
    pub memory: f64,
}

/// One line of the sample log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub usage: BTreeMap<String, PodUsage>,
}

impl UsageSample {
    pub fn new(usage: BTreeMap<String, PodUsage>) -> Self {
        Self::at(Utc::now(), usage)
    }

    pub fn at(time: DateTime<Utc>, usage: BTreeMap<String, PodUsage>) -> Self {
        let timestamp = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9;
        Self { timestamp, usage }
    }
}

/// Min/max of each metric for one pod across a sample log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageRange {
    pub min_cpu: f64,
    pub max_cpu: f64,
    pub min_memory: f64,
    pub max_memory: f64,
}

impl UsageRange {
    pub fn from_usage(usage: PodUsage) -> Self {
        Self {
            min_cpu: usage.cpu,
            max_cpu: usage.cpu,
            min_memory: usage.memory,
            max_memory: usage.memory,
        }
    }

    pub fn include(&mut self, usage: PodUsage) {
        self.min_cpu = self.min_cpu.min(usage.cpu);
        self.max_cpu = self.max_cpu.max(usage.cpu);
        self.min_memory = self.min_memory.min(usage.memory);
        self.max_memory = self.max_memory.max(usage.memory);
    }
}

/// Per-pod ranges, ordered by pod name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateUsage {
    pub pods: BTreeMap<String, UsageRange>,
    pub samples: usize,
}

impl AggregateUsage {
    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    pub fn get(&self, pod: &str) -> Option<&UsageRange> {
        self.pods.get(pod)
    }
}

/// Which client the sampler uses to reach the metrics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SourceKind {
    /// In-process Kubernetes client (kubeconfig or in-cluster credentials)
    #[default]
    Api,
    /// `kubectl get --raw`
    Kubectl,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub namespace: String,
    pub pod_filter: Option<BTreeSet<String>>,
    pub interval: Duration,
    pub duration: Duration,
    pub output: PathBuf,
    pub source: SourceKind,
}

/// Process-wide defaults, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub vegeta_rate: String,
    pub vegeta_duration: String,
    pub kubectl: String,
    pub vegeta: String,
}
