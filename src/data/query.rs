//! Translation of search requests into ClinicalTrials.gov query parameters
//!
//! The registry filters on condition text, recruitment status, and distance
//! from a point. Phase and age are not expressible upstream and are applied
//! afterwards by [`super::filter`].

use super::{RecruitmentStatus, SearchRequest};

/// Condition expression used when the caller supplies neither conditions nor a query
pub const DEFAULT_CONDITION_QUERY: &str =
    "spinal cord injury OR quadriplegia OR tetraplegia OR paraplegia";

/// Statuses searched when the caller supplies none
pub const DEFAULT_STATUSES: [RecruitmentStatus; 2] = [
    RecruitmentStatus::Recruiting,
    RecruitmentStatus::NotYetRecruiting,
];

/// Search radius in miles when coordinates are given without a distance
pub const DEFAULT_DISTANCE_MILES: u32 = 50;

/// Page size when the caller asks for zero
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// An ordered set of upstream query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Sets a parameter, replacing any earlier value under the same name
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn as_slice(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

/// Builds the registry query parameters for a search request
///
/// Conditions win over the free-text query; with neither, the spinal cord
/// injury default expression is used. The phase list is never forwarded.
pub fn build_query_params(request: &SearchRequest) -> QueryParams {
    let mut params = QueryParams::default();
    params.set("format", "json");
    params.set("countTotal", "true");

    let condition = if !request.conditions.is_empty() {
        request.conditions.join(" OR ")
    } else if !request.query.is_empty() {
        request.query.clone()
    } else {
        DEFAULT_CONDITION_QUERY.to_string()
    };
    params.set("query.cond", condition);

    let statuses: &[RecruitmentStatus] = if request.status.is_empty() {
        &DEFAULT_STATUSES
    } else {
        &request.status
    };
    let status_filter = statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",");
    params.set("filter.overallStatus", status_filter);

    if let Some((lat, lon)) = request.coordinates() {
        let distance = request
            .distance
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_DISTANCE_MILES);
        params.set(
            "filter.geo",
            format!("distance({:.6},{:.6},{}mi)", lat, lon, distance),
        );
    }

    let page_size = if request.page_size > 0 {
        request.page_size
    } else {
        DEFAULT_PAGE_SIZE
    };
    params.set("pageSize", page_size.to_string());

    if let Some(token) = request.page_token.as_deref().filter(|t| !t.is_empty()) {
        params.set("pageToken", token);
    }

    params
}

/// Query parameters for the single-study endpoint
pub fn detail_query_params() -> QueryParams {
    let mut params = QueryParams::default();
    params.set("format", "json");
    params
}
