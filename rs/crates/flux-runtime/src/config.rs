//! Runtime configuration.
//!
//! Defaults follow the protocol: 30 minute idle TTL, 30 second dispatch
//! budget. Every field can be overridden from the environment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path of the action endpoint; the client script is served on GET.
    pub endpoint: String,
    /// Idle time after which an instance may be evicted.
    pub instance_ttl: Duration,
    /// How often the sweeper runs.
    pub sweep_interval: Duration,
    /// Wall-clock budget of one dispatch.
    pub dispatch_timeout: Duration,
    /// Delay the client waits before following `X-Flux-Redirect`.
    pub redirect_delay: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "/flux".to_string(),
            instance_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            dispatch_timeout: Duration::from_secs(30),
            redirect_delay: Duration::from_secs(2),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `FLUX_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            endpoint: lookup("FLUX_ENDPOINT")
                .filter(|p| p.starts_with('/'))
                .unwrap_or(defaults.endpoint),
            instance_ttl: secs("FLUX_INSTANCE_TTL_SECS", defaults.instance_ttl),
            sweep_interval: secs("FLUX_SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            dispatch_timeout: secs("FLUX_DISPATCH_TIMEOUT_SECS", defaults.dispatch_timeout),
            redirect_delay: secs("FLUX_REDIRECT_DELAY_SECS", defaults.redirect_delay),
        }
    }
}
