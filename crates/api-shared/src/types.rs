//! Request and response bodies for the triage APIs.

use serde::{Deserialize, Serialize};
use triage_core::{
    AlertLocation, Assessment, ConditionRule, DispatchResult, EmergencyCall, EmergencyContact,
    Facility, RuleTable, StoredRecord, UrgencyHint,
};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssessReq {
    /// Who the assessment is for; omitted for anonymous requests.
    #[serde(default)]
    pub subject_id: Option<String>,
    pub symptoms: String,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub urgency: Option<UrgencyHint>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AssessRes {
    pub assessment: Assessment,
    pub emergency_mode: bool,
    pub first_aid: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlertReq {
    #[serde(default)]
    pub subject_id: Option<String>,
    pub contacts: Vec<EmergencyContact>,
    pub symptoms: String,
    #[serde(default)]
    pub additional_info: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AlertRes {
    pub assessment: Assessment,
    pub results: Vec<DispatchResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyCallReq {
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub contacts: Vec<EmergencyContact>,
    #[serde(default)]
    pub location: Option<AlertLocation>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct EmergencyCallRes {
    pub call: EmergencyCall,
    pub results: Vec<DispatchResult>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyModeRes {
    pub subject_id: String,
    pub emergency_mode: bool,
    /// True when this request switched emergency mode off.
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FirstAidRes {
    pub condition: String,
    /// True when the condition has no dedicated list and the generic steps were returned.
    pub generic: bool,
    pub instructions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FacilityRes {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub distance: String,
    pub emergency_room: bool,
    pub trauma_center: bool,
    pub wait_time: String,
}

impl From<&Facility> for FacilityRes {
    fn from(f: &Facility) -> Self {
        Self {
            name: f.name.into(),
            address: f.address.into(),
            phone: f.phone.into(),
            distance: f.distance.into(),
            emergency_room: f.emergency_room,
            trauma_center: f.trauma_center,
            wait_time: f.wait_time.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FacilitiesRes {
    pub facilities: Vec<FacilityRes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct RulesRes {
    pub conditions: Vec<ConditionRule>,
    pub direct_phrases: Vec<String>,
    pub direct_phrase_weight: u32,
}

impl From<&RuleTable> for RulesRes {
    fn from(table: &RuleTable) -> Self {
        Self {
            conditions: table.conditions().to_vec(),
            direct_phrases: table.direct_phrases().to_vec(),
            direct_phrase_weight: table.direct_phrase_weight(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordRes {
    pub id: String,
    pub record_type: String,
    pub timestamp: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

impl From<StoredRecord> for RecordRes {
    fn from(r: StoredRecord) -> Self {
        Self {
            id: r.id.to_string(),
            record_type: r.record_type,
            timestamp: r.timestamp.to_rfc3339(),
            payload: r.payload,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordsRes {
    pub subject_id: String,
    pub records: Vec<RecordRes>,
}
