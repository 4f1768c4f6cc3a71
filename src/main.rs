use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kube::Client;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use kube_usage_monitor::config::load_settings;
use kube_usage_monitor::loadtest::{plan_load_tests, read_loadtest_file, run_load_tests, VegetaRunner, DEFAULT_OUTPUT_FILE};
use kube_usage_monitor::report::{aggregate_log, append_usage_report, render_usage_table};
use kube_usage_monitor::{
    KubeApiSource, KubectlSource, MetricsSource, MonitorConfig, SampleLog, Settings, SourceKind, UsageSampler,
};

/// Pod resource sampling and load testing for CI pipelines
#[derive(Parser)]
#[command(name = "kube-usage-monitor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample pod CPU/memory usage into a JSON lines log
    Monitor(MonitorArgs),

    /// Render min/max usage from a sample log as Markdown
    Report {
        /// Sample log written by `monitor`
        log: PathBuf,

        /// Append the report to this file instead of printing it
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run vegeta load tests from a YAML config
    Loadtest {
        /// Path to the YAML config file
        #[arg(long, short)]
        config: PathBuf,

        /// Path to the output file
        #[arg(long, short, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,

        /// Append the resource usage table from this sample log after the results
        #[arg(long)]
        usage_log: Option<PathBuf>,

        /// vegeta binary (defaults to $VEGETA or `vegeta`)
        #[arg(long)]
        vegeta: Option<String>,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Namespace to monitor
    namespace: String,

    /// Interval between queries (seconds)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Duration to monitor (seconds)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    duration: u64,

    /// File to append usage samples to
    output: PathBuf,

    /// Specific pod names to monitor (default: all pods in namespace)
    #[arg(long, num_args = 1..)]
    pods: Option<Vec<String>>,

    /// How to reach the metrics API
    #[arg(long, value_enum, default_value_t = SourceKind::Api)]
    source: SourceKind,

    /// kubectl binary for `--source kubectl` (defaults to $KUBECTL or `kubectl`)
    #[arg(long)]
    kubectl: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings();

    match cli.command {
        Commands::Monitor(args) => monitor(args, &settings).await,
        Commands::Report { log, output } => report(log, output),
        Commands::Loadtest { config, output, usage_log, vegeta } => {
            loadtest(config, output, usage_log, vegeta, &settings).await
        }
    }
}

async fn monitor(args: MonitorArgs, settings: &Settings) -> Result<()> {
    let cfg = MonitorConfig {
        namespace: args.namespace,
        pod_filter: args.pods.map(|p| p.into_iter().collect::<BTreeSet<_>>()),
        interval: Duration::from_secs(args.interval),
        duration: Duration::from_secs(args.duration),
        output: args.output,
        source: args.source,
    };
    cfg.validate()?;

    let source: Box<dyn MetricsSource> = match cfg.source {
        SourceKind::Api => {
            let client = Client::try_default().await.context("create Kubernetes client")?;
            Box::new(KubeApiSource::new(client))
        }
        SourceKind::Kubectl => {
            let program = args.kubectl.unwrap_or_else(|| settings.kubectl.clone());
            Box::new(KubectlSource::new(program))
        }
    };

    let mut log = SampleLog::open(&cfg.output)
        .with_context(|| format!("open sample log {}", cfg.output.display()))?;
    let summary = UsageSampler::new(source.as_ref(), &cfg)
        .run_until(&mut log, shutdown_signal())
        .await?;
    // drops `log` and with it the writer lock
    drop(log);
    if summary.interrupted {
        info!("Sampling stopped early after {} samples", summary.recorded);
    }
    if summary.recorded == 0 {
        warn!("No samples were recorded for namespace {}", cfg.namespace);
    }
    Ok(())
}

fn report(log: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let usage = aggregate_log(&log)?;
    info!("Aggregated {} samples for {} pods", usage.samples, usage.pods.len());
    if usage.is_empty() {
        warn!("No usage recorded in {}, skipping report", log.display());
        return Ok(());
    }

    match output {
        Some(path) => append_usage_report(&path, &usage),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(render_usage_table(&usage).as_bytes())?;
            Ok(())
        }
    }
}

async fn loadtest(
    config: PathBuf,
    output: PathBuf,
    usage_log: Option<PathBuf>,
    vegeta: Option<String>,
    settings: &Settings,
) -> Result<()> {
    let entries = read_loadtest_file(&config)?;
    let plans = plan_load_tests(&entries, settings);
    info!("{} load tests planned from {}", plans.len(), config.display());

    let runner = VegetaRunner::new(vegeta.unwrap_or_else(|| settings.vegeta.clone()));
    let summary = run_load_tests(&runner, &plans, &output).await?;
    info!("Load tests finished: {} succeeded, {} failed", summary.succeeded, summary.failed);

    if let Some(log) = usage_log {
        let usage = aggregate_log(&log)?;
        if usage.is_empty() {
            warn!("No usage recorded in {}, skipping resource usage section", log.display());
        } else {
            append_usage_report(&output, &usage)?;
        }
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, so an interrupted run still unwinds normally.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, stopping"),
        _ = terminate => info!("Received SIGTERM, stopping"),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
