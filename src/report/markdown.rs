use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::types::AggregateUsage;

pub const USAGE_REPORT_TITLE: &str = "# Resource Usage Report";
pub const USAGE_TABLE_HEADER: &str =
    "| Pod Name | Min CPU (mC) | Max CPU (mC) | Min Memory (MiB) | Max Memory (MiB) |";
const USAGE_TABLE_SEPARATOR: &str = "|----------|--------------|--------------|------------------|------------------|";

/// Render the usage section: title, table header, one row per pod.
pub fn render_usage_table(usage: &AggregateUsage) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(usage.pods.len() + 5);
    lines.push(USAGE_REPORT_TITLE.to_string());
    lines.push(String::new());
    lines.push(USAGE_TABLE_HEADER.to_string());
    lines.push(USAGE_TABLE_SEPARATOR.to_string());

    for (pod, r) in &usage.pods {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            pod, r.min_cpu, r.max_cpu, r.min_memory, r.max_memory
        ));
    }
    lines.push(String::new());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Append the usage section to `path`, creating the file if needed.
pub fn append_usage_report(path: &Path, usage: &AggregateUsage) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open report {}", path.display()))?;
    file.write_all(render_usage_table(usage).as_bytes())
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}
