//! Client-side filtering of converted trials
//!
//! The registry cannot filter on phase or on age, so these predicates run
//! after conversion. Both keep the relative order of the input.

use tracing::info;

use super::{SearchRequest, Trial};

/// Phase sentinel that selects trials reporting no phase at all
pub const NO_PHASE_SENTINEL: &str = "NA";

/// Parses a free-form age into whole years
///
/// Strips a trailing "years", "year" or "y" (any case) and reads the first
/// run of digits. Anything unparseable is 0, which callers treat as
/// "no constraint". Other units are not converted: "6 Months" parses as 6.
pub fn parse_age_years(age: &str) -> u32 {
    let lowered = age.trim().to_lowercase();
    let mut rest = lowered.as_str();
    for suffix in ["years", "year", "y"] {
        rest = rest.strip_suffix(suffix).unwrap_or(rest);
    }
    let rest = rest.trim();

    let Some(start) = rest.find(|c: char| c.is_ascii_digit()) else {
        return 0;
    };
    let digits: String = rest[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// Whether a trial's phase tags satisfy the requested phases
///
/// A trial without phase tags only matches when "NA" was requested.
pub fn matches_phase(trial_phases: &[String], requested: &[String]) -> bool {
    if trial_phases.is_empty() {
        return requested
            .iter()
            .any(|p| p.eq_ignore_ascii_case(NO_PHASE_SENTINEL));
    }

    trial_phases
        .iter()
        .any(|tp| requested.iter().any(|rp| tp.eq_ignore_ascii_case(rp)))
}

/// Whether a trial's age range overlaps the requested bounds
///
/// Zero on either side means "unspecified". A trial with no age data always
/// matches.
pub fn matches_age(
    trial_min_age: &str,
    trial_max_age: &str,
    requested_min_age: &str,
    requested_max_age: &str,
) -> bool {
    let req_min = parse_age_years(requested_min_age);
    let req_max = parse_age_years(requested_max_age);
    let trial_min = parse_age_years(trial_min_age);
    let trial_max = parse_age_years(trial_max_age);

    if req_min == 0 && req_max == 0 {
        return true;
    }
    if trial_min == 0 && trial_max == 0 {
        return true;
    }

    if req_min > 0 {
        if trial_max > 0 && trial_max < req_min {
            return false;
        }
        if trial_min > 0 && trial_min > req_min {
            return false;
        }
    }

    if req_max > 0 {
        if trial_min > 0 && trial_min > req_max {
            return false;
        }
        if trial_max > 0 && trial_max < req_max {
            return false;
        }
    }

    true
}

/// Applies the phase and age predicates requested in `request`
///
/// Each predicate is active only when the caller supplied values for it.
/// Emits one event per active predicate when anything was removed.
pub fn apply_post_filters(trials: Vec<Trial>, request: &SearchRequest) -> Vec<Trial> {
    let original_count = trials.len();
    let phase_active = !request.phase.is_empty();
    let min_age = request.requested_minimum_age();
    let max_age = request.requested_maximum_age();
    let age_active = min_age.is_some() || max_age.is_some();

    if !phase_active && !age_active {
        return trials;
    }

    let kept: Vec<Trial> = trials
        .into_iter()
        .filter(|trial| !phase_active || matches_phase(&trial.phase, &request.phase))
        .filter(|trial| {
            !age_active
                || matches_age(
                    &trial.eligibility.minimum_age,
                    &trial.eligibility.maximum_age,
                    min_age.unwrap_or_default(),
                    max_age.unwrap_or_default(),
                )
        })
        .collect();

    let filtered_count = kept.len();
    if filtered_count != original_count {
        if phase_active {
            info!(
                requested_phases = ?request.phase,
                original_count,
                filtered_count,
                "Applied client-side phase filtering"
            );
        }
        if age_active {
            info!(
                requested_min_age = min_age.unwrap_or_default(),
                requested_max_age = max_age.unwrap_or_default(),
                original_count,
                filtered_count,
                "Applied client-side age filtering"
            );
        }
    }

    kept
}
