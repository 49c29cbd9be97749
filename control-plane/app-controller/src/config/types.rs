use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    /// Namespace to watch; empty watches every namespace.
    #[envconfig(from = "APP_CONTROLLER_NAMESPACE", default = "")]
    pub namespace: String,

    /// Resync interval for Applications that reconciled cleanly.
    #[envconfig(from = "APP_CONTROLLER_SYNC_PERIOD_SECS", default = "120")]
    pub sync_period_secs: u64,

    /// Maximum Applications reconciled at once (0 = unbounded).
    #[envconfig(from = "APP_CONTROLLER_CONCURRENCY", default = "4")]
    pub concurrency: u16,

    /// Reset the Error condition to False after a clean reconcile.
    #[envconfig(from = "APP_CONTROLLER_CLEAR_ERROR_ON_SUCCESS", default = "false")]
    pub clear_error_on_success: bool,

    #[envconfig(from = "HTTP_PORT", default = "8080")]
    pub http_port: u16,

    #[envconfig(nested)]
    pub backoff: BackoffConfig,
}

/// Retry delay for failed reconciles: `base * 2^(failures-1)`, capped at `max`.
#[derive(Envconfig, Clone, Debug)]
pub struct BackoffConfig {
    #[envconfig(from = "APP_CONTROLLER_BACKOFF_BASE_MS", default = "500")]
    pub base_ms: u64,
    #[envconfig(from = "APP_CONTROLLER_BACKOFF_MAX_SECS", default = "300")]
    pub max_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 500,
            max_secs: 300,
        }
    }
}

impl BackoffConfig {
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(32);
        let ms = self.base_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(ms).min(Duration::from_secs(self.max_secs))
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            sync_period_secs: 120,
            concurrency: 4,
            clear_error_on_success: false,
            http_port: 8080,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn watch_namespace(&self) -> Option<&str> {
        let ns = self.namespace.trim();
        (!ns.is_empty()).then_some(ns)
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(self.sync_period_secs)
    }
}
