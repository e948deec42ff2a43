//! Search and detail operations over the registry
//!
//! `TrialService` composes the pieces: cache lookup, throttle, registry
//! call, conversion, post-filtering, and cache write. Failures are returned
//! as-is and never cached.

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{CacheManager, SweeperHandle};
use crate::config::ServiceConfig;
use crate::data::{
    apply_post_filters, build_query_params, convert_study, trial_cache_key, ClinicalTrialsClient,
    RegistryError, SearchRequest, SearchResponse, StudySource, Trial,
};
use crate::throttle::Throttle;

/// A cached result: either a search page or a single trial
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Search(SearchResponse),
    Trial(Trial),
}

/// Cached, rate-limited access to the trial registry
///
/// Concurrent misses for the same key are not coalesced; each goes to the
/// registry on its own.
pub struct TrialService<S = ClinicalTrialsClient> {
    source: S,
    throttle: Throttle,
    cache_manager: Option<CacheManager<CachedValue>>,
}

impl TrialService<ClinicalTrialsClient> {
    /// Creates a service talking to the registry configured in `config`
    pub fn new(config: &ServiceConfig) -> Result<Self, RegistryError> {
        let client =
            ClinicalTrialsClient::with_base_url(config.base_url.as_str(), config.request_timeout)?;
        Ok(Self::with_source(client, config))
    }
}

impl<S: StudySource> TrialService<S> {
    /// Creates a service over any study source
    pub fn with_source(source: S, config: &ServiceConfig) -> Self {
        let cache_manager = config
            .cache_enabled
            .then(|| CacheManager::new(config.cache_ttl));
        Self {
            source,
            throttle: Throttle::new(config.min_request_interval),
            cache_manager,
        }
    }

    pub fn cache(&self) -> Option<&CacheManager<CachedValue>> {
        self.cache_manager.as_ref()
    }

    /// Starts sweeping expired cache entries in the background
    ///
    /// Returns `None` when caching is disabled. Must be called from within a
    /// tokio runtime.
    pub fn spawn_cache_sweeper(&self) -> Option<SweeperHandle> {
        self.cache_manager
            .as_ref()
            .map(|cache| SweeperHandle::spawn(cache.clone(), cache.sweep_interval()))
    }

    /// Searches the registry
    ///
    /// `total_count` in the response is the number of trials left after
    /// phase and age filtering.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RegistryError> {
        if request.unknown_status().is_some() {
            return Err(RegistryError::InvalidRequest(
                "Unrecognized recruitment status".to_string(),
            ));
        }

        let cache_key = request.cache_key();

        if let Some(CachedValue::Search(cached)) = self.cached(&cache_key) {
            return Ok(cached);
        }

        self.throttle.wait().await;

        let params = build_query_params(request);
        let page = self.source.search_studies(&params).await?;

        let trials = page.studies.into_iter().map(convert_study).collect();
        let trials = apply_post_filters(trials, request);
        let response = SearchResponse::new(trials, page.next_page_token);

        info!(
            registry_total = page.total_count,
            total_count = response.total_count,
            "Search trials completed"
        );

        if let Some(cache) = &self.cache_manager {
            cache.set(cache_key, CachedValue::Search(response.clone()));
        }

        Ok(response)
    }

    /// Fetches a single trial by NCT identifier
    ///
    /// Identifiers may only contain ASCII letters, digits, `-` and `_`.
    pub async fn get_trial(&self, nct_id: &str) -> Result<Trial, RegistryError> {
        let nct_id = nct_id.trim();
        if nct_id.is_empty() {
            return Err(RegistryError::InvalidRequest(
                "NCT ID is required".to_string(),
            ));
        }
        if !nct_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(RegistryError::InvalidRequest(format!(
                "Malformed NCT ID: {}",
                nct_id
            )));
        }

        let cache_key = trial_cache_key(nct_id);

        if let Some(CachedValue::Trial(cached)) = self.cached(&cache_key) {
            return Ok(cached);
        }

        self.throttle.wait().await;

        let study = self.source.fetch_study(nct_id).await?;
        let trial = convert_study(study);

        info!(nct_id, title = %trial.title, "Get trial completed");

        if let Some(cache) = &self.cache_manager {
            cache.set(cache_key, CachedValue::Trial(trial.clone()));
        }

        Ok(trial)
    }

    fn cached(&self, key: &str) -> Option<CachedValue> {
        match self.cache_manager.as_ref()?.get_entry(key) {
            Some(entry) => {
                let age_secs = (Utc::now() - entry.cached_at).num_seconds();
                debug!(cache_key = key, age_secs, "Cache hit");
                Some(entry.data)
            }
            None => {
                debug!(cache_key = key, "Cache miss");
                None
            }
        }
    }
}
