//! Audience entity - who a course is aimed at.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How an audience gains access to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceType {
    Open,
    ClosedCourse,
    PrivateCourse,
    RequiredLearning,
}

impl AudienceType {
    pub const ALL: &'static [AudienceType] = &[
        AudienceType::Open,
        AudienceType::ClosedCourse,
        AudienceType::PrivateCourse,
        AudienceType::RequiredLearning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceType::Open => "OPEN",
            AudienceType::ClosedCourse => "CLOSED_COURSE",
            AudienceType::PrivateCourse => "PRIVATE_COURSE",
            AudienceType::RequiredLearning => "REQUIRED_LEARNING",
        }
    }

    pub fn parse(value: &str) -> Option<AudienceType> {
        AudienceType::ALL.iter().copied().find(|t| t.as_str() == value)
    }
}

/// An audience attached to a course.
///
/// The membership criteria (departments, areas of work, grades, interests)
/// are collected one wizard spoke at a time; absent criteria are empty
/// sequences, never null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    /// Absent until the wizard's type step has run.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub audience_type: Option<AudienceType>,

    #[serde(default)]
    pub areas_of_work: Vec<String>,

    #[serde(default)]
    pub departments: Vec<String>,

    #[serde(default)]
    pub grades: Vec<String>,

    #[serde(default)]
    pub interests: Vec<String>,

    /// Deadline for required learning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_by: Option<NaiveDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,

    /// Private-course audiences are pinned to one event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl Audience {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            audience_type: None,
            areas_of_work: vec![],
            departments: vec![],
            grades: vec![],
            interests: vec![],
            required_by: None,
            frequency: None,
            event_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_discriminator_uses_screaming_snake_case() {
        let mut audience = Audience::new("Finance staff");
        audience.audience_type = Some(AudienceType::RequiredLearning);
        let value = serde_json::to_value(&audience).unwrap();
        assert_eq!(value["type"], "REQUIRED_LEARNING");
    }

    #[test]
    fn criteria_default_to_empty_sequences() {
        let audience: Audience =
            serde_json::from_value(json!({"name": "Anyone", "type": "OPEN"})).unwrap();
        assert!(audience.departments.is_empty());
        assert!(audience.grades.is_empty());
        assert!(audience.required_by.is_none());
    }
}
