//! Vegeta load tests driven by a YAML target file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::types::Settings;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_OUTPUT_FILE: &str = "results.txt";

/// A YAML scalar that may be written as a number or a string (`rate: 50` or `rate: "50/1s"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(u64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One entry of the load test file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetSpec {
    pub target: Option<String>,
    pub method: Option<String>,
    pub rate: Option<Scalar>,
    pub duration: Option<Scalar>,
}

/// Parse a load test file, keeping entries in file order.
pub fn parse_loadtest_config(yaml: &str) -> Result<Vec<(String, TargetSpec)>> {
    let mapping: serde_yaml::Mapping =
        serde_yaml::from_str(yaml).context("load test config must be a mapping of test names")?;

    mapping
        .into_iter()
        .map(|(key, value)| -> Result<(String, TargetSpec)> {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => serde_yaml::to_string(&other)?.trim().to_string(),
            };
            let spec: TargetSpec = serde_yaml::from_value(value)
                .with_context(|| format!("invalid load test '{}'", name))?;
            Ok((name, spec))
        })
        .collect()
}

pub fn read_loadtest_file(path: &Path) -> Result<Vec<(String, TargetSpec)>> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("read load test config {}", path.display()))?;
    parse_loadtest_config(&yaml)
}

/// A fully resolved load test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestPlan {
    pub name: String,
    pub method: String,
    pub target: String,
    pub rate: String,
    pub duration: String,
}

impl LoadTestPlan {
    pub fn attack_args(&self) -> Vec<String> {
        vec![
            "attack".to_string(),
            "-rate".to_string(),
            self.rate.clone(),
            "-duration".to_string(),
            self.duration.clone(),
        ]
    }

    /// Vegeta's http target format, fed to `attack` on stdin.
    pub fn target_line(&self) -> String {
        format!("{} {}\n", self.method, self.target)
    }

    pub fn header(&self) -> String {
        format!("Load Test Result for {} {}:\n-------------------\n", self.method, self.target)
    }
}

/// Fill defaults and drop entries without a target.
pub fn plan_load_tests(entries: &[(String, TargetSpec)], settings: &Settings) -> Vec<LoadTestPlan> {
    let mut plans = Vec::with_capacity(entries.len());
    for (name, spec) in entries {
        let target = match spec.target.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                warn!("Skipping test '{}' due to missing 'target'", name);
                continue;
            }
        };
        plans.push(LoadTestPlan {
            name: name.clone(),
            method: spec.method.clone().unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            target,
            rate: spec
                .rate
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| settings.vegeta_rate.clone()),
            duration: spec
                .duration
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| settings.vegeta_duration.clone()),
        });
    }
    plans
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadTestSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs `vegeta attack | vegeta report` without a shell.
pub struct VegetaRunner {
    program: String,
}

impl VegetaRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    /// Append the result block for one plan to `output`.
    ///
    /// Vegeta failures are logged and reported as `Ok(false)`; only failing to
    /// write `output` is an error.
    pub async fn run(&self, plan: &LoadTestPlan, output: &Path) -> Result<bool> {
        info!(
            "Running load test on target: {} {} with rate: {} req/s for duration: {}",
            plan.method, plan.target, plan.rate, plan.duration
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .with_context(|| format!("open load test output {}", output.display()))?;
        file.write_all(plan.header().as_bytes())?;

        let ok = match self.attack_and_report(plan).await {
            Ok(report) => {
                file.write_all(&report)?;
                true
            }
            Err(e) => {
                error!("Failed to run vegeta for '{}': {:#}", plan.name, e);
                false
            }
        };

        file.write_all(b"\n")?;
        file.flush()?;
        Ok(ok)
    }

    async fn attack_and_report(&self, plan: &LoadTestPlan) -> Result<Vec<u8>> {
        let mut attack = Command::new(&self.program)
            .args(plan.attack_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn {} attack", self.program))?;

        if let Some(mut stdin) = attack.stdin.take() {
            // attack exiting early closes the pipe; its exit status tells why
            if let Err(e) = stdin.write_all(plan.target_line().as_bytes()).await {
                warn!("Could not write target to vegeta attack: {}", e);
            }
        }
        let attack_stdout: Stdio = attack
            .stdout
            .take()
            .ok_or_else(|| anyhow!("vegeta attack stdout not captured"))?
            .try_into()
            .context("connect vegeta attack to report")?;

        let mut report = Command::new(&self.program);
        report.arg("report").stdin(attack_stdout).kill_on_drop(true);
        // attack is reaped even when report cannot be started
        let (report, attack) = tokio::join!(report.output(), attack.wait_with_output());

        let attack = attack.context("wait for vegeta attack")?;
        let attack_stderr = String::from_utf8_lossy(&attack.stderr);
        if !attack_stderr.trim().is_empty() {
            error!("Error: {}", attack_stderr.trim());
        }
        let report = report.with_context(|| format!("run {} report", self.program))?;

        if !attack.status.success() {
            return Err(anyhow!("vegeta attack exited with {}", attack.status));
        }
        if !report.status.success() {
            return Err(anyhow!(
                "vegeta report exited with {}: {}",
                report.status,
                String::from_utf8_lossy(&report.stderr).trim()
            ));
        }
        Ok(report.stdout)
    }
}

/// Run every plan in order, appending each result to `output`.
pub async fn run_load_tests(runner: &VegetaRunner, plans: &[LoadTestPlan], output: &Path) -> Result<LoadTestSummary> {
    let mut summary = LoadTestSummary::default();
    for plan in plans {
        if runner.run(plan, output).await? {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
    Ok(summary)
}
