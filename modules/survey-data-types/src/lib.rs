//! Shared types for the survey data service and its HTTP clients.

use serde::{Deserialize, Serialize};

// =====================================================
// Field Domains
// =====================================================

pub const AGE_VALUES: [&str; 3] = ["18-24", "25-34", "35-44"];
pub const GENDER_VALUES: [&str; 3] = ["Male", "Female", "Other"];
pub const LOCATION_VALUES: [&str; 3] = ["North America", "Europe", "Asia"];
pub const DEVICE_VALUES: [&str; 3] = ["Mobile", "Desktop", "Tablet"];

/// One of the four categorical columns of a survey record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordField {
    Age,
    Gender,
    Location,
    Device,
}

impl RecordField {
    pub const ALL: [RecordField; 4] = [
        RecordField::Age,
        RecordField::Gender,
        RecordField::Location,
        RecordField::Device,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Age => "age",
            RecordField::Gender => "gender",
            RecordField::Location => "location",
            RecordField::Device => "device",
        }
    }

    /// The declared domain for this field, in canonical casing.
    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            RecordField::Age => &AGE_VALUES,
            RecordField::Gender => &GENDER_VALUES,
            RecordField::Location => &LOCATION_VALUES,
            RecordField::Device => &DEVICE_VALUES,
        }
    }

    /// Domain membership ignoring ASCII case. Stored values keep their
    /// original casing, so "male" is accepted here but will not match a
    /// "Male" filter.
    pub fn accepts(&self, value: &str) -> bool {
        self.allowed_values()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =====================================================
// Domain Types
// =====================================================

/// A stored survey entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    #[serde(rename = "_id")]
    pub id: i64,
    pub age: String,
    pub gender: String,
    pub location: String,
    pub device: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SurveyRecord {
    pub fn value(&self, field: RecordField) -> &str {
        match field {
            RecordField::Age => &self.age,
            RecordField::Gender => &self.gender,
            RecordField::Location => &self.location,
            RecordField::Device => &self.device,
        }
    }
}

/// A survey entry that has not been written yet (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSurveyRecord {
    pub age: String,
    pub gender: String,
    pub location: String,
    pub device: String,
}

impl NewSurveyRecord {
    pub fn new(age: &str, gender: &str, location: &str, device: &str) -> Self {
        Self {
            age: age.to_string(),
            gender: gender.to_string(),
            location: location.to_string(),
            device: device.to_string(),
        }
    }

    pub fn value(&self, field: RecordField) -> &str {
        match field {
            RecordField::Age => &self.age,
            RecordField::Gender => &self.gender,
            RecordField::Location => &self.location,
            RecordField::Device => &self.device,
        }
    }
}

/// Accepted values per field. `None` and an empty list both mean
/// "no constraint on this field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Vec<String>>,
}

impl RecordFilter {
    pub fn values(&self, field: RecordField) -> Option<&[String]> {
        let values = match field {
            RecordField::Age => self.age.as_deref(),
            RecordField::Gender => self.gender.as_deref(),
            RecordField::Location => self.location.as_deref(),
            RecordField::Device => self.device.as_deref(),
        };
        values.filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        RecordField::ALL.iter().all(|f| self.values(*f).is_none())
    }
}

// =====================================================
// Request Types
// =====================================================

/// Body of `POST /api/data`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataQueryRequest {
    #[serde(default)]
    pub filters: Option<RecordFilter>,
}

// =====================================================
// Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<SurveyRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub success: bool,
    pub message: String,
}

impl SeedResponse {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            message: msg.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_is_case_insensitive() {
        assert!(RecordField::Gender.accepts("Male"));
        assert!(RecordField::Gender.accepts("male"));
        assert!(RecordField::Location.accepts("north america"));
        assert!(!RecordField::Gender.accepts("Robot"));
        assert!(!RecordField::Age.accepts(""));
    }

    #[test]
    fn test_filter_treats_empty_lists_as_absent() {
        let filter: RecordFilter =
            serde_json::from_str(r#"{"age": [], "gender": null, "device": ["Mobile"]}"#).unwrap();
        assert!(filter.values(RecordField::Age).is_none());
        assert!(filter.values(RecordField::Gender).is_none());
        assert!(filter.values(RecordField::Location).is_none());
        assert_eq!(filter.values(RecordField::Device).unwrap(), ["Mobile".to_string()]);
        assert!(!filter.is_empty());
        assert!(RecordFilter::default().is_empty());
    }

    #[test]
    fn test_query_request_without_filters() {
        let req: DataQueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.filters.is_none());
    }

    #[test]
    fn test_record_wire_format() {
        let record = SurveyRecord {
            id: 7,
            age: "18-24".into(),
            gender: "Male".into(),
            location: "Asia".into(),
            device: "Mobile".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], 7);
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(json["updatedAt"], "2024-01-01T00:00:00Z");
        assert!(json.get("created_at").is_none());
    }
}
