//! Core data models for the trial registry facade
//!
//! This module contains the internal trial schema returned to callers, the
//! normalized search request they send in, and the submodules that translate
//! between those types and the upstream ClinicalTrials.gov API.

pub mod client;
pub mod filter;
pub mod query;
pub mod studies;

pub use client::{ClinicalTrialsClient, RegistryError, StudySource};
pub use filter::{apply_post_filters, matches_age, matches_phase, parse_age_years};
pub use query::{build_query_params, QueryParams};
pub use studies::{convert_study, StudiesPage, Study};

use serde::{Deserialize, Serialize};

/// Registry tag stamped on every trial converted from ClinicalTrials.gov
pub const REGISTRY_NAME: &str = "clinicaltrials.gov";

/// Public study page, suffixed with the NCT identifier
pub const STUDY_URL_PREFIX: &str = "https://clinicaltrials.gov/study/";

/// Prefix for single-trial cache keys
pub const TRIAL_CACHE_PREFIX: &str = "trial:";

/// A clinical trial in the internal schema
///
/// Built once per upstream document by [`convert_study`] and never merged
/// with records from other sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// NCT-style registry identifier
    pub nct_id: String,
    pub title: String,
    pub status: RecruitmentStatus,
    /// Phase tags as reported upstream (e.g. "PHASE2", "NA")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phase: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub sponsor: Sponsor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,
    /// Free-form date string, passed through unparsed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_date: String,
    /// Free-form date string, passed through unparsed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub completion_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brief_summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detailed_summary: String,
    pub url: String,
    pub registry: String,
}

/// A trial site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zip_code: String,
    /// `None` when the upstream coordinate is missing or exactly zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// `None` when the upstream coordinate is missing or exactly zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Who may enroll in a trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Free-form, e.g. "18 Years"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub minimum_age: String,
    /// Free-form, e.g. "65 Years"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maximum_age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Sex>,
    /// "true", "false", free text, or empty when the registry omits it
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub healthy_volunteers: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub criteria: String,
}

/// Lead sponsor of a trial
///
/// The registry reports a single classification, so `kind` and `category`
/// always carry the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

/// A central contact for a trial
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Overall recruitment status of a trial, using the registry's tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitmentStatus {
    Recruiting,
    NotYetRecruiting,
    ActiveNotRecruiting,
    EnrollingByInvitation,
    Completed,
    Suspended,
    Terminated,
    Withdrawn,
    Available,
    NoLongerAvailable,
    TemporarilyNotAvailable,
    ApprovedForMarketing,
    Withheld,
    /// Missing or unrecognized status
    #[default]
    #[serde(other)]
    Unknown,
}

impl RecruitmentStatus {
    /// Returns all statuses a caller can filter on
    pub fn all() -> &'static [RecruitmentStatus] {
        &[
            RecruitmentStatus::Recruiting,
            RecruitmentStatus::NotYetRecruiting,
            RecruitmentStatus::ActiveNotRecruiting,
            RecruitmentStatus::EnrollingByInvitation,
            RecruitmentStatus::Completed,
            RecruitmentStatus::Suspended,
            RecruitmentStatus::Terminated,
            RecruitmentStatus::Withdrawn,
            RecruitmentStatus::Available,
            RecruitmentStatus::NoLongerAvailable,
            RecruitmentStatus::TemporarilyNotAvailable,
            RecruitmentStatus::ApprovedForMarketing,
            RecruitmentStatus::Withheld,
        ]
    }

    /// The registry's token for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            RecruitmentStatus::Recruiting => "RECRUITING",
            RecruitmentStatus::NotYetRecruiting => "NOT_YET_RECRUITING",
            RecruitmentStatus::ActiveNotRecruiting => "ACTIVE_NOT_RECRUITING",
            RecruitmentStatus::EnrollingByInvitation => "ENROLLING_BY_INVITATION",
            RecruitmentStatus::Completed => "COMPLETED",
            RecruitmentStatus::Suspended => "SUSPENDED",
            RecruitmentStatus::Terminated => "TERMINATED",
            RecruitmentStatus::Withdrawn => "WITHDRAWN",
            RecruitmentStatus::Available => "AVAILABLE",
            RecruitmentStatus::NoLongerAvailable => "NO_LONGER_AVAILABLE",
            RecruitmentStatus::TemporarilyNotAvailable => "TEMPORARILY_NOT_AVAILABLE",
            RecruitmentStatus::ApprovedForMarketing => "APPROVED_FOR_MARKETING",
            RecruitmentStatus::Withheld => "WITHHELD",
            RecruitmentStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parses a registry token, case-insensitively
    ///
    /// Accepts both `NOT_YET_RECRUITING` and `not-yet-recruiting` spellings.
    pub fn parse(s: &str) -> Option<RecruitmentStatus> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        if normalized == "UNKNOWN" {
            return Some(RecruitmentStatus::Unknown);
        }
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
    }
}

/// Sex eligible for enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    All,
    Female,
    Male,
}

impl Sex {
    pub fn parse(s: &str) -> Option<Sex> {
        match s.trim().to_uppercase().as_str() {
            "ALL" => Some(Sex::All),
            "FEMALE" => Some(Sex::Female),
            "MALE" => Some(Sex::Male),
            _ => None,
        }
    }
}

/// A normalized search request
///
/// `conditions` take precedence over the free-text `query`; a lone
/// latitude or longitude is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub conditions: Vec<String>,
    pub status: Vec<RecruitmentStatus>,
    /// Applied client-side only; "NA" selects trials without phase tags
    pub phase: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in miles
    pub distance: Option<u32>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
    /// Zero selects the default page size
    pub page_size: u32,
    /// Opaque token issued by the registry
    pub page_token: Option<String>,
}

impl SearchRequest {
    /// Returns the coordinate pair when both halves are present and non-zero
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }

    /// Requested minimum age, if a non-empty one was supplied
    pub fn requested_minimum_age(&self) -> Option<&str> {
        non_empty(self.minimum_age.as_deref())
    }

    /// Requested maximum age, if a non-empty one was supplied
    pub fn requested_maximum_age(&self) -> Option<&str> {
        non_empty(self.maximum_age.as_deref())
    }

    /// Builds the deterministic cache key for this request
    ///
    /// Fields appear in a fixed order. Text and list fields are JSON-encoded
    /// so that `["a,b"]` and `["a", "b"]` get different keys. Coordinates and
    /// distance are only included when non-zero. Age bounds are not part of
    /// the key.
    pub fn cache_key(&self) -> String {
        let status: Vec<&str> = self.status.iter().map(|s| s.as_str()).collect();

        let mut key = format!(
            "search:query={}:conditions={}:status={}:phase={}:page_token={}:page_size={}",
            key_part(&self.query),
            key_part(&self.conditions),
            key_part(&status),
            key_part(&self.phase),
            key_part(self.page_token.as_deref().unwrap_or_default()),
            self.page_size,
        );

        if let Some(lat) = self.latitude.filter(|v| *v != 0.0) {
            key.push_str(&format!(":lat={}", lat));
        }
        if let Some(lon) = self.longitude.filter(|v| *v != 0.0) {
            key.push_str(&format!(":lon={}", lon));
        }
        if let Some(distance) = self.distance.filter(|d| *d != 0) {
            key.push_str(&format!(":distance={}", distance));
        }

        key
    }

    /// Returns the first requested status the registry would not understand
    pub fn unknown_status(&self) -> Option<RecruitmentStatus> {
        self.status
            .iter()
            .copied()
            .find(|s| *s == RecruitmentStatus::Unknown)
    }
}

/// JSON-encodes one cache key component; strings and lists cannot fail
fn key_part<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the cache key for a single-trial lookup
pub fn trial_cache_key(nct_id: &str) -> String {
    format!("{}{}", TRIAL_CACHE_PREFIX, nct_id)
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Trials in registry order, after post-filtering
    pub trials: Vec<Trial>,
    /// Number of trials surviving post-filtering, not the registry's total
    pub total_count: usize,
    /// Registry-issued token, passed through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Number of trials on this page
    pub page_size: usize,
}

impl SearchResponse {
    pub fn new(trials: Vec<Trial>, next_page_token: Option<String>) -> Self {
        let count = trials.len();
        Self {
            trials,
            total_count: count,
            next_page_token: next_page_token.filter(|t| !t.is_empty()),
            page_size: count,
        }
    }
}
