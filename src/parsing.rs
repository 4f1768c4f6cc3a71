use crate::error::QuantityError;

const NANOCORES_PER_MILLICORE: f64 = 1_000_000.0;
const MILLICORES_PER_CORE: f64 = 1_000.0;
const KIB_PER_MIB: f64 = 1024.0;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a metrics-server CPU quantity (`250n`, `12m`, `2`) to millicores.
pub fn normalize_cpu(q: &str) -> Result<f64, QuantityError> {
    let q = q.trim();
    let invalid = || QuantityError::Cpu(q.to_string());

    if let Some(stripped) = q.strip_suffix('n') {
        let nanos = parse_integer(stripped).ok_or_else(invalid)?;
        Ok(nanos / NANOCORES_PER_MILLICORE)
    } else if let Some(stripped) = q.strip_suffix('m') {
        parse_integer(stripped).ok_or_else(invalid)
    } else {
        let cores = parse_integer(q).ok_or_else(invalid)?;
        Ok(cores * MILLICORES_PER_CORE)
    }
}

/// Convert a metrics-server memory quantity (`128Ki`, `64Mi`, `1Gi`, bare bytes) to MiB.
pub fn normalize_memory(q: &str) -> Result<f64, QuantityError> {
    let q = q.trim();
    let invalid = || QuantityError::Memory(q.to_string());

    if let Some(stripped) = q.strip_suffix("Ki") {
        let kib = parse_integer(stripped).ok_or_else(invalid)?;
        Ok(kib / KIB_PER_MIB)
    } else if let Some(stripped) = q.strip_suffix("Mi") {
        parse_integer(stripped).ok_or_else(invalid)
    } else if let Some(stripped) = q.strip_suffix("Gi") {
        let gib = parse_integer(stripped).ok_or_else(invalid)?;
        Ok(gib * KIB_PER_MIB)
    } else {
        let bytes = parse_integer(q).ok_or_else(invalid)?;
        Ok(bytes / BYTES_PER_MIB)
    }
}

// Only whole numbers are accepted; `0.5` or `1e3` are rejected.
fn parse_integer(s: &str) -> Option<f64> {
    s.parse::<i64>().ok().map(|v| v as f64)
}
