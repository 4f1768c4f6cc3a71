use anyhow::{anyhow, Result};
use std::collections::HashMap;
use crate::types::{MonitorConfig, Settings};

pub const DEFAULT_VEGETA_RATE: &str = "10";
pub const DEFAULT_VEGETA_DURATION: &str = "10s";
pub const DEFAULT_KUBECTL: &str = "kubectl";
pub const DEFAULT_VEGETA: &str = "vegeta";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_settings() -> Settings {
    load_settings_with_env(&SystemEnvironment)
}

pub fn load_settings_with_env<E: EnvironmentProvider>(env: &E) -> Settings {
    // CI runners export declared-but-unset inputs as empty strings
    let non_empty = |key: &str, default: &str| {
        env.get_var(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    Settings {
        vegeta_rate: non_empty("VEGETA_RATE", DEFAULT_VEGETA_RATE),
        vegeta_duration: non_empty("VEGETA_DURATION", DEFAULT_VEGETA_DURATION),
        kubectl: non_empty("KUBECTL", DEFAULT_KUBECTL),
        vegeta: non_empty("VEGETA", DEFAULT_VEGETA),
    }
}

/// Namespace names are DNS-1123 labels.
///
/// Anything else is rejected before sampling starts, since every request for it
/// would fail.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(anyhow!("namespace must not be empty"));
    }
    if namespace.len() > 63 {
        return Err(anyhow!("namespace {:?} is longer than 63 characters", namespace));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(anyhow!(
            "namespace {:?} must be lowercase alphanumeric with hyphens",
            namespace
        ));
    }
    if namespace.starts_with('-') || namespace.ends_with('-') {
        return Err(anyhow!("namespace {:?} cannot start or end with a hyphen", namespace));
    }
    Ok(())
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)?;
        if self.interval.is_zero() {
            return Err(anyhow!("interval must be a positive number of seconds"));
        }
        if self.duration.is_zero() {
            return Err(anyhow!("duration must be a positive number of seconds"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(anyhow!("output path must not be empty"));
        }
        if let Some(pods) = &self.pod_filter {
            if pods.iter().any(|p| p.trim().is_empty()) {
                return Err(anyhow!("pod names must not be empty"));
            }
        }
        Ok(())
    }
}
