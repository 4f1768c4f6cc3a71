use anyhow::{Context, Result};
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::metrics::{extract_usage, MetricsSource};
use crate::sample_log::SampleLog;
use crate::types::{MonitorConfig, UsageSample};

/// Polls a metrics source on a fixed interval until the run duration has elapsed.
pub struct UsageSampler<'a> {
    source: &'a dyn MetricsSource,
    config: &'a MonitorConfig,
}

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Recorded { pods: usize },
    Skipped,
}

/// Counts for a finished sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerSummary {
    pub ticks: usize,
    pub recorded: usize,
    pub skipped: usize,
    /// The run was stopped before its deadline.
    pub interrupted: bool,
}

impl<'a> UsageSampler<'a> {
    pub fn new(source: &'a dyn MetricsSource, config: &'a MonitorConfig) -> Self {
        Self { source, config }
    }

    /// Run until `duration` has elapsed.
    ///
    /// Spacing between samples is `interval` plus the fetch and write time; the
    /// last tick may finish after the deadline. Fetch and extraction failures
    /// skip the tick. Failing to write the log ends the run.
    pub async fn run(&self, log: &mut SampleLog) -> Result<SamplerSummary> {
        self.run_until(log, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stops early once `shutdown` resolves.
    ///
    /// A pending fetch or sleep is abandoned. Samples are written synchronously,
    /// so a stop never leaves a partial line behind.
    pub async fn run_until<F>(&self, log: &mut SampleLog, shutdown: F) -> Result<SamplerSummary>
    where
        F: Future<Output = ()>,
    {
        let deadline = Instant::now() + self.config.duration;
        let mut summary = SamplerSummary::default();
        tokio::pin!(shutdown);

        info!(
            namespace = %self.config.namespace,
            interval_secs = self.config.interval.as_secs(),
            duration_secs = self.config.duration.as_secs(),
            output = %log.path().display(),
            "Starting usage sampling"
        );

        while Instant::now() < deadline {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    summary.interrupted = true;
                    break;
                }
                outcome = self.tick(log) => outcome?,
            };
            summary.ticks += 1;
            match outcome {
                TickOutcome::Recorded { .. } => summary.recorded += 1,
                TickOutcome::Skipped => summary.skipped += 1,
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    summary.interrupted = true;
                    break;
                }
                _ = sleep(self.config.interval) => {}
            }
        }

        info!(
            ticks = summary.ticks,
            recorded = summary.recorded,
            skipped = summary.skipped,
            interrupted = summary.interrupted,
            "Usage sampling finished"
        );
        Ok(summary)
    }

    /// One fetch-extract-record attempt.
    pub async fn tick(&self, log: &mut SampleLog) -> Result<TickOutcome> {
        let snapshot = match self.source.fetch(&self.config.namespace).await {
            Ok(s) => s,
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "Error fetching metrics, skipping tick");
                return Ok(TickOutcome::Skipped);
            }
        };

        let usage = match extract_usage(&snapshot, self.config.pod_filter.as_ref()) {
            Ok(u) => u,
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "Unusable metrics snapshot, skipping tick");
                return Ok(TickOutcome::Skipped);
            }
        };

        let pods = usage.len();
        let sample = UsageSample::new(usage);
        log.append(&sample)
            .with_context(|| format!("write sample to {}", log.path().display()))?;
        debug!(timestamp = sample.timestamp, pods, "Recorded usage sample");

        Ok(TickOutcome::Recorded { pods })
    }
}
