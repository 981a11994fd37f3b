use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier wrapper for registry trials (e.g. an NCT number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialId(pub String);

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Oldest age accepted on a patient record.
pub const MAX_PATIENT_AGE: u8 = 120;

/// Structured patient record produced by document extraction or manual entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_tier: Option<LocationTier>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub income_bracket: Option<IncomeBracket>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lab_values: BTreeMap<String, LabValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
}

impl Patient {
    /// Reject records that violate the intake contract rather than guessing a default.
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        if let Some(age) = self.age {
            if age > MAX_PATIENT_AGE {
                return Err(PatientValidationError::AgeOutOfRange(age));
            }
        }

        if self
            .conditions
            .iter()
            .any(|condition| condition.trim().is_empty())
        {
            return Err(PatientValidationError::BlankCondition);
        }

        Ok(())
    }
}

/// Contract violations on an incoming patient record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatientValidationError {
    #[error("patient age {0} exceeds the supported maximum of {max}", max = MAX_PATIENT_AGE)]
    AgeOutOfRange(u8),
    #[error("patient conditions must not contain blank entries")]
    BlankCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(alias = "Male", alias = "MALE")]
    Male,
    #[serde(alias = "Female", alias = "FEMALE")]
    Female,
    #[serde(alias = "Other", alias = "OTHER")]
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

/// Coarse classification of the patient's city, used as an access-to-trials proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationTier {
    #[serde(rename = "Tier 1")]
    Tier1,
    #[serde(rename = "Tier 2")]
    Tier2,
    #[serde(rename = "Tier 3")]
    Tier3,
}

impl LocationTier {
    pub const fn label(self) -> &'static str {
        match self {
            LocationTier::Tier1 => "Tier 1",
            LocationTier::Tier2 => "Tier 2",
            LocationTier::Tier3 => "Tier 3",
        }
    }

    pub const fn is_underserved(self) -> bool {
        matches!(self, LocationTier::Tier2 | LocationTier::Tier3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeBracket {
    Low,
    Middle,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabValue {
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Sex restriction published by a trial registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SexRestriction {
    #[default]
    All,
    Male,
    Female,
}

impl SexRestriction {
    /// Lenient parse: anything other than male/female means no restriction.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MALE" => SexRestriction::Male,
            "FEMALE" => SexRestriction::Female,
            _ => SexRestriction::All,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SexRestriction::All => "ALL",
            SexRestriction::Male => "MALE",
            SexRestriction::Female => "FEMALE",
        }
    }

    pub fn admits(self, gender: Gender) -> bool {
        self.label().eq_ignore_ascii_case(gender.label())
    }
}

impl<'de> Deserialize<'de> for SexRestriction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(SexRestriction::parse).unwrap_or_default())
    }
}

/// Candidate trial as delivered by the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    #[serde(alias = "nct_id")]
    pub id: TrialId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub eligibility_criteria: Option<String>,
    #[serde(default)]
    pub minimum_age: Option<String>,
    #[serde(default)]
    pub maximum_age: Option<String>,
    #[serde(default, alias = "gender")]
    pub sex: SexRestriction,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

impl Trial {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: TrialId(id.into()),
            title: None,
            status: None,
            phase: None,
            sponsor: None,
            eligibility_criteria: None,
            minimum_age: None,
            maximum_age: None,
            sex: SexRestriction::All,
            conditions: Vec::new(),
            locations: Vec::new(),
        }
    }

    /// Free-text criteria, if the registry supplied anything beyond whitespace.
    pub fn criteria_text(&self) -> Option<&str> {
        self.eligibility_criteria
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn joined_conditions(&self) -> String {
        self.conditions.join(" ")
    }

    pub fn recruits_in(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.locations
            .iter()
            .any(|location| location.to_lowercase().contains(&needle))
    }
}
