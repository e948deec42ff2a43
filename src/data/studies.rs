//! ClinicalTrials.gov v2 study documents and their conversion to [`Trial`]
//!
//! Every module of an upstream study is optional. A missing module leaves the
//! corresponding trial fields at their zero value; conversion never fails.

use serde::{Deserialize, Deserializer};

use super::{
    Contact, Eligibility, Location, RecruitmentStatus, Sex, Sponsor, Trial, REGISTRY_NAME,
    STUDY_URL_PREFIX,
};

/// One page of the `/studies` search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub studies: Vec<Study>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Registry-side match count, before any client-side filtering
    #[serde(default)]
    pub total_count: u64,
}

/// Decodes an explicit `null` the same way as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single study document, as returned by both endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

impl Study {
    /// The study's NCT identifier, empty when the registry omits it
    pub fn nct_id(&self) -> &str {
        self.protocol_section
            .identification_module
            .as_ref()
            .and_then(|m| m.nct_id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: Option<IdentificationModule>,
    status_module: Option<StatusModule>,
    design_module: Option<DesignModule>,
    conditions_module: Option<ConditionsModule>,
    eligibility_module: Option<EligibilityModule>,
    contacts_locations_module: Option<ContactsLocationsModule>,
    description_module: Option<DescriptionModule>,
    sponsor_collaborators_module: Option<SponsorCollaboratorsModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
    official_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: Option<DateStruct>,
    completion_date_struct: Option<DateStruct>,
}

/// Dates are partial ("2024-03" or "2024-03-15") and kept as strings
#[derive(Debug, Clone, Default, Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DesignModule {
    phases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConditionsModule {
    conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EligibilityModule {
    eligibility_criteria: Option<String>,
    healthy_volunteers: Option<HealthyVolunteers>,
    sex: Option<String>,
    minimum_age: Option<String>,
    maximum_age: Option<String>,
}

/// The registry has served `healthyVolunteers` as both a boolean and a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HealthyVolunteers {
    Flag(bool),
    Text(String),
    Other(serde_json::Value),
}

impl HealthyVolunteers {
    fn into_canonical(self) -> String {
        match self {
            HealthyVolunteers::Flag(flag) => flag.to_string(),
            HealthyVolunteers::Text(text) => text,
            HealthyVolunteers::Other(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactsLocationsModule {
    central_contacts: Option<Vec<CentralContact>>,
    locations: Option<Vec<LocationData>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CentralContact {
    name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationData {
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    country: Option<String>,
    geo_point: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeoPoint {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionModule {
    brief_summary: Option<String>,
    detailed_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorCollaboratorsModule {
    lead_sponsor: Option<LeadSponsor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LeadSponsor {
    name: Option<String>,
    /// Single classification, e.g. "INDUSTRY" or "OTHER"
    class: Option<String>,
}

/// Zero means "absent" for registry coordinates
fn coordinate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Converts one registry study into the internal trial schema
pub fn convert_study(study: Study) -> Trial {
    let protocol = study.protocol_section;
    let identification = protocol.identification_module.unwrap_or_default();
    let nct_id = identification.nct_id.unwrap_or_default();

    let mut trial = Trial {
        url: format!("{}{}", STUDY_URL_PREFIX, nct_id),
        nct_id,
        title: identification
            .brief_title
            .filter(|t| !t.is_empty())
            .or(identification.official_title)
            .unwrap_or_default(),
        registry: REGISTRY_NAME.to_string(),
        ..Default::default()
    };

    if let Some(status) = protocol.status_module {
        trial.status = status
            .overall_status
            .as_deref()
            .and_then(RecruitmentStatus::parse)
            .unwrap_or_default();
        trial.start_date = status
            .start_date_struct
            .and_then(|d| d.date)
            .unwrap_or_default();
        trial.completion_date = status
            .completion_date_struct
            .and_then(|d| d.date)
            .unwrap_or_default();
    }

    if let Some(phases) = protocol.design_module.and_then(|m| m.phases) {
        trial.phase = phases;
    }

    if let Some(conditions) = protocol.conditions_module.and_then(|m| m.conditions) {
        trial.conditions = conditions;
    }

    if let Some(eligibility) = protocol.eligibility_module {
        trial.eligibility = Eligibility {
            minimum_age: eligibility.minimum_age.unwrap_or_default(),
            maximum_age: eligibility.maximum_age.unwrap_or_default(),
            gender: eligibility.sex.as_deref().and_then(Sex::parse),
            healthy_volunteers: eligibility
                .healthy_volunteers
                .map(HealthyVolunteers::into_canonical)
                .unwrap_or_default(),
            criteria: eligibility.eligibility_criteria.unwrap_or_default(),
        };
    }

    if let Some(contacts_locations) = protocol.contacts_locations_module {
        trial.locations = contacts_locations
            .locations
            .unwrap_or_default()
            .into_iter()
            .map(|loc| {
                let geo = loc.geo_point.unwrap_or_default();
                Location {
                    city: loc.city.unwrap_or_default(),
                    state: loc.state.unwrap_or_default(),
                    country: loc.country.unwrap_or_default(),
                    zip_code: loc.zip.unwrap_or_default(),
                    latitude: coordinate(geo.lat),
                    longitude: coordinate(geo.lon),
                }
            })
            .collect();

        trial.contacts = contacts_locations
            .central_contacts
            .unwrap_or_default()
            .into_iter()
            .map(|contact| Contact {
                name: contact.name.unwrap_or_default(),
                phone: contact.phone.unwrap_or_default(),
                email: contact.email.unwrap_or_default(),
            })
            .collect();
    }

    if let Some(lead) = protocol
        .sponsor_collaborators_module
        .and_then(|m| m.lead_sponsor)
        .filter(|s| s.name.as_deref().is_some_and(|n| !n.is_empty()))
    {
        let class = lead.class.unwrap_or_default();
        trial.sponsor = Sponsor {
            name: lead.name.unwrap_or_default(),
            kind: class.clone(),
            category: class,
        };
    }

    if let Some(description) = protocol.description_module {
        trial.brief_summary = description.brief_summary.unwrap_or_default();
        trial.detailed_summary = description.detailed_description.unwrap_or_default();
    }

    trial
}
