//! Configuration management for Graphward services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (GRAPHWARD__ prefix, `__` as section separator)
//! 2. Config file (graphward.toml)
//! 3. Defaults

use serde::Deserialize;

use crate::error::GraphwardError;

/// Top-level settings shared by every Graphward component.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// The dataset being edited.
    #[serde(default)]
    pub dataset: EndpointSettings,

    /// Where provenance snapshots are written.
    #[serde(default = "default_provenance_endpoint")]
    pub provenance: EndpointSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub lock: LockSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub counter: CounterSettings,
}

/// A SPARQL endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// Query URL (SPARQL 1.1 protocol).
    #[serde(default = "default_dataset_url")]
    pub query_url: String,

    /// Update URL, when the store exposes updates separately.
    #[serde(default)]
    pub update_url: Option<String>,

    /// Whether statements live in named graphs.
    #[serde(default)]
    pub quadstore: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl EndpointSettings {
    pub fn update_url(&self) -> &str {
        self.update_url.as_deref().unwrap_or(&self.query_url)
    }
}

/// Backoff applied to every remote query.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockSettings {
    /// Lease duration for locks and reverse-link entries.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Shared Redis instance. Locks are process-local when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorSettings {
    /// Agent responsible for every change made by this process.
    #[serde(default = "default_resp_agent")]
    pub resp_agent: String,

    #[serde(default)]
    pub primary_source: Option<String>,

    #[serde(default = "default_counter_namespace")]
    pub counter_namespace: String,

    #[serde(default)]
    pub supplier_prefix: String,

    /// Base IRI for newly minted entities.
    #[serde(default = "default_base_iri")]
    pub base_iri: String,
}

/// Identifier counter backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    #[default]
    Memory,
    File,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterSettings {
    #[serde(default)]
    pub backend: CounterBackend,

    #[serde(default = "default_counter_path")]
    pub path: String,

    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Settings {
    /// Load settings from `<file_prefix>.toml` (optional) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, GraphwardError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GRAPHWARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(
            dataset = %settings.dataset.query_url,
            provenance = %settings.provenance.query_url,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Reject combinations no component can run with.
    pub fn validate(&self) -> Result<(), GraphwardError> {
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(GraphwardError::Invalid {
                field: "retry.max_delay_ms",
                reason: format!(
                    "{} is below base_delay_ms {}",
                    self.retry.max_delay_ms, self.retry.base_delay_ms
                ),
            });
        }
        if self.lock.lease_secs == 0 {
            return Err(GraphwardError::Invalid {
                field: "lock.lease_secs",
                reason: "leases must last at least one second".to_string(),
            });
        }
        if self.counter.backend == CounterBackend::Redis && self.counter.redis_url.is_none() {
            return Err(GraphwardError::Invalid {
                field: "counter.redis_url",
                reason: "required by the redis counter backend".to_string(),
            });
        }
        if self.editor.resp_agent.is_empty() {
            return Err(GraphwardError::Invalid {
                field: "editor.resp_agent",
                reason: "every change must be attributed to an agent".to_string(),
            });
        }
        Ok(())
    }
}

fn default_dataset_url() -> String {
    "http://localhost:9999/blazegraph/sparql".to_string()
}

fn default_provenance_endpoint() -> EndpointSettings {
    EndpointSettings {
        query_url: "http://localhost:9998/blazegraph/sparql".to_string(),
        update_url: None,
        quadstore: true,
        timeout_secs: default_timeout(),
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_lease_secs() -> u64 {
    300
}

fn default_resp_agent() -> String {
    "https://w3id.org/graphward/agent/system".to_string()
}

fn default_counter_namespace() -> String {
    "graphward".to_string()
}

fn default_base_iri() -> String {
    "https://w3id.org/graphward".to_string()
}

fn default_counter_path() -> String {
    "./counters.json".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: EndpointSettings::default(),
            provenance: default_provenance_endpoint(),
            retry: RetrySettings::default(),
            lock: LockSettings::default(),
            editor: EditorSettings::default(),
            counter: CounterSettings::default(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            query_url: default_dataset_url(),
            update_url: None,
            quadstore: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease_secs: default_lease_secs(),
            redis_url: None,
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            resp_agent: default_resp_agent(),
            primary_source: None,
            counter_namespace: default_counter_namespace(),
            supplier_prefix: String::new(),
            base_iri: default_base_iri(),
        }
    }
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            backend: CounterBackend::Memory,
            path: default_counter_path(),
            redis_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.lock.lease_secs, 300);
        assert_eq!(settings.retry.max_retries, 5);
        assert!(settings.retry.jitter);
        assert_eq!(settings.counter.backend, CounterBackend::Memory);
        assert_eq!(
            settings.dataset.update_url(),
            settings.dataset.query_url.as_str()
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(
                "[lock]\nlease_secs = 60\n[editor]\nsupplier_prefix = \"060\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = cfg.try_deserialize().unwrap();
        assert_eq!(settings.lock.lease_secs, 60);
        assert_eq!(settings.editor.supplier_prefix, "060");
        assert_eq!(settings.editor.counter_namespace, "graphward");
        assert!(settings.provenance.quadstore);
    }

    #[test]
    fn test_validation_rejects_unusable_settings() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.counter.backend = CounterBackend::Redis;
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            GraphwardError::Invalid { field: "counter.redis_url", .. }
        ));
        settings.counter.redis_url = Some("redis://localhost:6379".into());
        assert!(settings.validate().is_ok());

        settings.retry.max_delay_ms = 10;
        assert!(settings.validate().is_err());
    }
}
