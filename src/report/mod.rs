// Aggregation of sample logs and Markdown rendering
pub mod aggregate;
pub mod markdown;

pub use aggregate::{aggregate, aggregate_log};
pub use markdown::{append_usage_report, render_usage_table};
