use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// A CPU or memory quantity that does not match the metrics-server grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("invalid cpu quantity {0:?}")]
    Cpu(String),
    #[error("invalid memory quantity {0:?}")]
    Memory(String),
}

/// Failure to obtain a metrics snapshot for a namespace.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("build request: {0}")]
    Request(#[from] http::Error),
    #[error("metrics API request failed: {0}")]
    Api(#[from] kube::Error),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("metrics response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to turn a snapshot into per-pod usage. Any of these discards the whole sample.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pod {pod} reports no containers")]
    NoContainers { pod: String },
    #[error("pod {pod}: container {container:?} has no {resource} usage")]
    MissingUsage {
        pod: String,
        container: String,
        resource: &'static str,
    },
    #[error("pod {pod}: {source}")]
    Quantity {
        pod: String,
        #[source]
        source: QuantityError,
    },
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("sample log {path} already has a writer (lock file {lock} exists)")]
    Locked { path: PathBuf, lock: PathBuf },
    #[error("sample log io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode sample: {0}")]
    Encode(#[from] serde_json::Error),
}
