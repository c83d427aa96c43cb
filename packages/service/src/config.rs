/// Service-level configuration for the dispatch engine and backend modules.
///
/// Created once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout for outbound backend requests in milliseconds.
    pub request_timeout_ms: u64,
    /// Overrides the backend base URL from task metadata when set.
    pub baas_url: Option<String>,
    /// API version sent to the backend when a task does not carry one.
    pub default_api_version: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            baas_url: None,
            default_api_version: 3,
        }
    }
}
