//! Testing utilities for SSM workspace
//!
//! Shared fixtures, in-memory stores and tracing setup.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use ssm_backend::MemoryStore;
use ssm_core::{RetryPolicy, Serializer, SerializerConfig};
use ssm_reflect::Structure;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const ENVIRONMENT: &str = "dev";
pub const SERVICE: &str = "svc1";

/// Install a test writer subscriber filtered by `RUST_LOG`; repeated calls
/// are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Structure, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Simple {
    #[pms("test, prefix=simple")]
    pub name: String,
}

#[derive(Structure, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Database {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
}

#[derive(Structure, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Limits {
    #[pms("timeout")]
    pub timeout: u64,
    #[pms("ratio")]
    pub ratio: f64,
    pub untagged: String,
}

#[derive(Structure, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Feature {
    #[pms("enabled")]
    pub enabled: bool,
}

/// Service configuration touching both stores
#[derive(Structure, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    #[pms("name")]
    pub name: String,
    #[pms(r"port, pattern=^\d+$")]
    pub port: u16,
    #[pms("password, keyid=default, tier=adv")]
    pub password: String,
    #[asm("api-key, description=external api")]
    pub api_key: String,
    #[pms("database")]
    pub database: Database,
    pub limits: Limits,
    pub feature: Option<Feature>,
    #[pms("region, prefix=/shared")]
    pub region: String,
    #[ssm(skip)]
    pub runtime_only: String,
}

impl ServiceConfig {
    /// Fully populated instance
    pub fn sample() -> Self {
        Self {
            name: "billing".into(),
            port: 8080,
            password: "hunter2".into(),
            api_key: "ak-123".into(),
            database: Database {
                host: "db.internal".into(),
                port: 5432,
                user: String::new(),
            },
            limits: Limits {
                timeout: 30,
                ratio: 0.25,
                untagged: "local".into(),
            },
            feature: Some(Feature { enabled: true }),
            region: "eu-west-1".into(),
            runtime_only: "not synchronized".into(),
        }
    }
}

/// Memory stores behind a serializer
#[derive(Debug, Clone)]
pub struct Stores {
    pub parameters: Arc<MemoryStore>,
    pub secrets: Arc<MemoryStore>,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            parameters: Arc::new(MemoryStore::parameters()),
            secrets: Arc::new(MemoryStore::secrets()),
        }
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            parameters: Arc::new(MemoryStore::parameters().with_page_size(page_size)),
            secrets: Arc::new(MemoryStore::secrets().with_page_size(page_size)),
        }
    }

    /// Serializer wired to both stores
    pub fn serializer(&self, config: SerializerConfig) -> Serializer {
        Serializer::new(config)
            .with_parameter_store(self.parameters.clone())
            .with_secret_store(self.secrets.clone())
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for `dev/svc1` with millisecond retries
pub fn test_config() -> SerializerConfig {
    SerializerConfig::new(ENVIRONMENT, SERVICE).with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
}

/// Stores plus a serializer using [`test_config`]
pub fn setup() -> (Stores, Serializer) {
    init_tracing();
    let stores = Stores::new();
    let serializer = stores.serializer(test_config());
    (stores, serializer)
}
