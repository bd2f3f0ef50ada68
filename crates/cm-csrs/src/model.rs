//! CSRS payload models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationalUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,

    #[serde(default)]
    pub payment_methods: Vec<String>,

    #[serde(default)]
    pub sub_orgs: Vec<OrganisationalUnit>,

    /// Code of the parent unit, when this unit is nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub code: String,
    pub name: String,
}

/// An area of work ("profession").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Profession {
    /// CSRS sometimes identifies professions only through their resource
    /// href; the trailing segment is the numeric id.
    pub fn resolved_id(&self) -> Option<u64> {
        self.id.or_else(|| {
            self.href
                .as_deref()?
                .rsplit('/')
                .next()?
                .parse()
                .ok()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub name: String,
}

/// The signed-in user's CSRS profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CivilServant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<Profession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
}

/// A skills-quiz question. `choices` holds every offered answer, `answers`
/// the correct subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "type")]
    pub question_type: String,

    pub value: String,

    #[serde(default)]
    pub learning_name: String,

    #[serde(default)]
    pub learning_reference: String,

    #[serde(default)]
    pub theme: String,

    #[serde(default)]
    pub why: String,

    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default)]
    pub answers: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub profession: Profession,

    #[serde(default)]
    pub questions: Vec<Question>,
}

// Hypermedia wrappers CSRS answers with.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradesPayload {
    #[serde(rename = "_embedded")]
    pub embedded: GradesEmbedded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradesEmbedded {
    #[serde(default)]
    pub grades: Vec<Grade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestsPayload {
    #[serde(rename = "_embedded")]
    pub embedded: InterestsEmbedded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestsEmbedded {
    #[serde(default)]
    pub interests: Vec<Interest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profession_id_resolves_from_href() {
        let profession = Profession {
            id: None,
            name: "Policy".to_string(),
            href: Some("http://csrs/professions/14".to_string()),
        };
        assert_eq!(profession.resolved_id(), Some(14));

        let direct = Profession {
            id: Some(3),
            name: "Digital".to_string(),
            href: None,
        };
        assert_eq!(direct.resolved_id(), Some(3));
    }
}
