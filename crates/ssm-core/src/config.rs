//! Serializer configuration

use serde::{Deserialize, Serialize};
use ssm_reflect::DEFAULT_MAX_DEPTH;
use ssm_tag::{StoreType, Tier};
use std::collections::BTreeMap;
use std::time::Duration;

/// Retry behaviour for transient backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Policy with the given attempts and delay
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Single attempt, no retry
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Delay between attempts
    #[inline]
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 400,
        }
    }
}

/// Serializer configuration
///
/// Everything a synchronization call depends on is carried here; there is
/// no process wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Environment path segment (`dev`, `prod`, ...)
    pub environment: String,
    /// Service path segment
    pub service: String,
    /// Default prefix; local unless it starts with `/`
    pub prefix: String,
    /// Tier used when a tag asks for the default tier
    pub default_tier: Tier,
    /// Active stores; empty means all
    pub usage: Vec<StoreType>,
    /// Retry policy for backend calls
    pub retry: RetryPolicy,
    /// Key registry for `keyid=local://name`
    pub keys: BTreeMap<String, String>,
    /// Read into absent optionals, instantiating them only when a value arrives
    pub materialize_optional: bool,
    /// Depth bound for absent optionals
    pub max_depth: usize,
}

impl SerializerConfig {
    /// Configuration for a service in an environment
    #[must_use]
    pub fn new(environment: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            service: service.into(),
            ..Self::default()
        }
    }

    /// With default prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// With default tier
    #[inline]
    #[must_use]
    pub fn with_default_tier(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    /// With active stores
    #[inline]
    #[must_use]
    pub fn with_usage(mut self, usage: impl IntoIterator<Item = StoreType>) -> Self {
        self.usage = usage.into_iter().collect();
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a key for `keyid=local://name`
    #[inline]
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, key_id: impl Into<String>) -> Self {
        self.keys.insert(name.into(), key_id.into());
        self
    }

    /// With reads into absent optionals switched on or off
    #[inline]
    #[must_use]
    pub fn with_materialize_optional(mut self, enabled: bool) -> Self {
        self.materialize_optional = enabled;
        self
    }

    /// Stores active for a call; per-call usage wins over the configured one
    #[must_use]
    pub fn active_stores(&self, usage: &[StoreType]) -> Vec<StoreType> {
        let wanted = if usage.is_empty() { &self.usage } else { usage };
        StoreType::all()
            .into_iter()
            .filter(|s| wanted.is_empty() || wanted.contains(s))
            .collect()
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            environment: String::new(),
            service: String::new(),
            prefix: String::new(),
            default_tier: Tier::Std,
            usage: Vec::new(),
            retry: RetryPolicy::default(),
            keys: BTreeMap::new(),
            materialize_optional: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
