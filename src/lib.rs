// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod metrics;
pub mod sample_log;
pub mod collector;
pub mod report;
pub mod loadtest;

// Re-export commonly used items
pub use types::*;
pub use error::{ExtractError, FetchError, LogError, QuantityError};
pub use config::{load_settings, load_settings_with_env, validate_namespace, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{normalize_cpu, normalize_memory};
pub use metrics::{extract_usage, KubeApiSource, KubectlSource, MetricsSource, PodMetricsList};
pub use sample_log::{SampleLog, SampleReader};
pub use collector::{SamplerSummary, TickOutcome, UsageSampler};
pub use report::{aggregate, aggregate_log, append_usage_report, render_usage_table};
pub use loadtest::{plan_load_tests, read_loadtest_file, run_load_tests, LoadTestPlan, VegetaRunner};
