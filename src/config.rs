//! Typed configuration for the trial service

use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::data::client::{CLINICAL_TRIALS_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::throttle::DEFAULT_MIN_INTERVAL;

/// Already-parsed settings for [`crate::service::TrialService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Studies endpoint of the registry
    pub base_url: String,
    /// When false, results are neither read from nor written to the cache
    pub cache_enabled: bool,
    /// Lifetime of cached results; zero selects the default
    pub cache_ttl: Duration,
    /// Minimum spacing between registry calls
    pub min_request_interval: Duration,
    /// Overall timeout for one registry call
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: CLINICAL_TRIALS_BASE_URL.to_string(),
            cache_enabled: true,
            cache_ttl: DEFAULT_TTL,
            min_request_interval: DEFAULT_MIN_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
