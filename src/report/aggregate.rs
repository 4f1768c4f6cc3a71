use anyhow::{Context, Result};
use std::borrow::Borrow;
use std::collections::btree_map::Entry;
use std::path::Path;
use tracing::info;

use crate::sample_log::SampleReader;
use crate::types::{AggregateUsage, UsageRange, UsageSample};

/// Fold samples into per-pod min/max. A pod is aggregated only over the samples it appears in.
pub fn aggregate<I>(samples: I) -> AggregateUsage
where
    I: IntoIterator,
    I::Item: Borrow<UsageSample>,
{
    let mut result = AggregateUsage::default();
    for sample in samples {
        let sample: &UsageSample = Borrow::borrow(&sample);
        result.samples += 1;
        for (pod, usage) in &sample.usage {
            match result.pods.entry(pod.clone()) {
                Entry::Occupied(mut e) => e.get_mut().include(*usage),
                Entry::Vacant(e) => {
                    e.insert(UsageRange::from_usage(*usage));
                }
            }
        }
    }
    result
}

/// Stream a sample log from disk. A missing or empty log aggregates to nothing.
pub fn aggregate_log(path: impl AsRef<Path>) -> Result<AggregateUsage> {
    let path = path.as_ref();
    let reader = match SampleReader::open(path)
        .with_context(|| format!("open sample log {}", path.display()))?
    {
        Some(r) => r,
        None => {
            info!("Sample log {} does not exist, nothing to aggregate", path.display());
            return Ok(AggregateUsage::default());
        }
    };

    let mut read_error = None;
    let result = aggregate(reader.map_while(|r| r.map_err(|e| read_error = Some(e)).ok()));
    if let Some(e) = read_error {
        return Err(e).with_context(|| format!("read sample log {}", path.display()));
    }
    Ok(result)
}
