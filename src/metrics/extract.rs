use std::collections::{BTreeMap, BTreeSet};

use super::base::PodMetricsList;
use crate::error::{ExtractError, QuantityError};
use crate::parsing::{normalize_cpu, normalize_memory};
use crate::types::PodUsage;

/// Normalized usage of the first container of every pod that passes `pod_filter`.
///
/// One bad pod fails the whole snapshot so that a sample is never recorded with
/// partial data.
pub fn extract_usage(
    snapshot: &PodMetricsList,
    pod_filter: Option<&BTreeSet<String>>,
) -> Result<BTreeMap<String, PodUsage>, ExtractError> {
    let mut usage = BTreeMap::new();

    for item in &snapshot.items {
        let pod = match item.name() {
            Some(n) => n,
            None => continue,
        };
        if let Some(filter) = pod_filter {
            if !filter.contains(pod) {
                continue;
            }
        }

        let container = item.containers.first().ok_or_else(|| ExtractError::NoContainers {
            pod: pod.to_string(),
        })?;
        let raw = |resource: &'static str| {
            container
                .usage
                .get(resource)
                .ok_or_else(|| ExtractError::MissingUsage {
                    pod: pod.to_string(),
                    container: container.name.clone(),
                    resource,
                })
        };
        let quantity = |source: QuantityError| ExtractError::Quantity {
            pod: pod.to_string(),
            source,
        };

        let cpu = normalize_cpu(raw("cpu")?).map_err(quantity)?;
        let memory = normalize_memory(raw("memory")?).map_err(quantity)?;
        usage.insert(pod.to_string(), PodUsage { cpu, memory });
    }

    Ok(usage)
}
