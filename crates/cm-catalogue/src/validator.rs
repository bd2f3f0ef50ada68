//! Declarative form validation.
//!
//! Rules are plain per-field records evaluated by a generic runner against
//! an untyped candidate object. A set of active groups scopes which rules
//! fire, so one entity can be validated incrementally across a multi-page
//! wizard: the title page checks only the `title` group, the duration page
//! only `duration`, and `all` fires everything.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Violations keyed by field name. `size() == 0` is the single signal
/// handlers use to continue down the success path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Total message count across all fields.
    pub fn size(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The checks a rule can perform on one field.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Fails on an absent field, null, blank string or empty array.
    NotEmpty,
    /// Fails when a string value exceeds the given length.
    MaxLength(usize),
    /// Fails when a present value is not a number greater than zero.
    Positive,
    /// Fails when a present string is not one of the allowed values.
    OneOf(&'static [&'static str]),
    /// Fails when a present date (or date-time) is not after today.
    FutureDate,
}

/// One declarative validation rule attached to a field.
#[derive(Debug, Clone)]
pub struct Rule {
    pub field: &'static str,
    pub groups: &'static [&'static str],
    pub kind: RuleKind,
    pub message: &'static str,
}

/// Group-scoped rule runner for one entity shape.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Evaluate every rule whose group set intersects `groups`.
    pub fn check(&self, candidate: &Value, groups: &[&str]) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        for rule in &self.rules {
            if !rule.groups.iter().any(|g| groups.contains(g)) {
                continue;
            }
            let value = lookup(candidate, rule.field);
            if violates(&rule.kind, value) {
                errors.add(rule.field, rule.message);
            }
        }

        errors
    }

    /// Evaluate the full rule set.
    pub fn check_all(&self, candidate: &Value) -> ValidationErrors {
        self.check(candidate, &["all"])
    }
}

/// Resolve a possibly dotted field path (`venue.location`) inside the
/// candidate object.
fn lookup<'a>(candidate: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(candidate, |value, segment| value.get(segment))
}

fn violates(kind: &RuleKind, value: Option<&Value>) -> bool {
    match kind {
        RuleKind::NotEmpty => match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        },
        RuleKind::MaxLength(max) => matches!(
            value,
            Some(Value::String(s)) if s.chars().count() > *max
        ),
        RuleKind::Positive => match value {
            None | Some(Value::Null) => false,
            Some(Value::Number(n)) => n.as_f64().map(|v| v <= 0.0).unwrap_or(true),
            Some(_) => true,
        },
        RuleKind::OneOf(allowed) => match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty() && !allowed.contains(&s.as_str()),
            Some(_) => true,
        },
        RuleKind::FutureDate => match value.and_then(Value::as_str) {
            None => false,
            Some(text) => match parse_date(text) {
                Some(date) => date <= Utc::now().date_naive(),
                None => true,
            },
        },
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// Rule sets
// ---------------------------------------------------------------------------

pub fn course_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "title",
            groups: &["all", "title"],
            kind: RuleKind::NotEmpty,
            message: "validation.course.title.empty",
        },
        Rule {
            field: "shortDescription",
            groups: &["all", "shortDescription"],
            kind: RuleKind::NotEmpty,
            message: "validation.course.shortDescription.empty",
        },
        Rule {
            field: "shortDescription",
            groups: &["all", "shortDescription"],
            kind: RuleKind::MaxLength(160),
            message: "validation.course.shortDescription.maxLength",
        },
        Rule {
            field: "description",
            groups: &["all", "description"],
            kind: RuleKind::NotEmpty,
            message: "validation.course.description.empty",
        },
        Rule {
            field: "description",
            groups: &["all", "description"],
            kind: RuleKind::MaxLength(1500),
            message: "validation.course.description.maxLength",
        },
    ])
}

pub fn module_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "type",
            groups: &["all", "type"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.type.empty",
        },
        Rule {
            field: "type",
            groups: &["all", "type"],
            kind: RuleKind::OneOf(crate::model::MODULE_TYPES),
            message: "validation.module.type.validType",
        },
        Rule {
            field: "title",
            groups: &["all", "title"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.title.empty",
        },
        Rule {
            field: "description",
            groups: &["all", "description"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.description.empty",
        },
        Rule {
            field: "duration",
            groups: &["all", "duration"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.duration.empty",
        },
        Rule {
            field: "duration",
            groups: &["all", "duration"],
            kind: RuleKind::Positive,
            message: "validation.module.duration.positive",
        },
        Rule {
            field: "url",
            groups: &["url"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.url.empty",
        },
        Rule {
            field: "file",
            groups: &["file"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.file.empty",
        },
        Rule {
            field: "startPage",
            groups: &["startPage"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.startPage.empty",
        },
    ])
}

pub fn audience_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "name",
            groups: &["all", "audience.all", "audience.name"],
            kind: RuleKind::NotEmpty,
            message: "audience.validation.name.empty",
        },
        Rule {
            field: "name",
            groups: &["all", "audience.all", "audience.name"],
            kind: RuleKind::MaxLength(40),
            message: "audience.validation.name.maxLength",
        },
        Rule {
            field: "type",
            groups: &["all", "audience.all", "audience.type"],
            kind: RuleKind::NotEmpty,
            message: "audience.validation.type.empty",
        },
        Rule {
            field: "type",
            groups: &["all", "audience.all", "audience.type"],
            kind: RuleKind::OneOf(&["OPEN", "CLOSED_COURSE", "PRIVATE_COURSE", "REQUIRED_LEARNING"]),
            message: "audience.validation.type.validType",
        },
        Rule {
            field: "requiredBy",
            groups: &["audience.requiredBy"],
            kind: RuleKind::NotEmpty,
            message: "audience.validation.requiredBy.empty",
        },
        Rule {
            field: "requiredBy",
            groups: &["audience.requiredBy"],
            kind: RuleKind::FutureDate,
            message: "audience.validation.requiredBy.future",
        },
    ])
}

pub fn event_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "dateRanges",
            groups: &["all", "event.all", "event.dateRanges"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.event.dateRanges.empty",
        },
        Rule {
            field: "venue.location",
            groups: &["all", "event.all", "event.location"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.event.venue.location.empty",
        },
        Rule {
            field: "venue.capacity",
            groups: &["event.location"],
            kind: RuleKind::Positive,
            message: "validation.module.event.venue.capacity.positive",
        },
        Rule {
            field: "venue.minCapacity",
            groups: &["event.location"],
            kind: RuleKind::Positive,
            message: "validation.module.event.venue.minCapacity.positive",
        },
    ])
}

/// Rules for the raw day/month/year date-range form, checked before the
/// composed date is validated.
pub fn date_range_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "day",
            groups: &["all"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.event.dateRange.day.empty",
        },
        Rule {
            field: "month",
            groups: &["all"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.event.dateRange.month.empty",
        },
        Rule {
            field: "year",
            groups: &["all"],
            kind: RuleKind::NotEmpty,
            message: "validation.module.event.dateRange.year.empty",
        },
        Rule {
            field: "date",
            groups: &["date"],
            kind: RuleKind::FutureDate,
            message: "validation.module.event.dateRange.past",
        },
    ])
}

pub fn learning_provider_rules() -> Validator {
    Validator::new(vec![Rule {
        field: "name",
        groups: &["all", "name"],
        kind: RuleKind::NotEmpty,
        message: "validation.learningProvider.name.empty",
    }])
}

pub fn cancellation_policy_rules() -> Validator {
    Validator::new(vec![Rule {
        field: "name",
        groups: &["all", "name"],
        kind: RuleKind::NotEmpty,
        message: "validation.cancellationPolicy.name.empty",
    }])
}

pub fn terms_and_conditions_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "name",
            groups: &["all", "name"],
            kind: RuleKind::NotEmpty,
            message: "validation.termsAndConditions.name.empty",
        },
        Rule {
            field: "content",
            groups: &["all", "content"],
            kind: RuleKind::NotEmpty,
            message: "validation.termsAndConditions.content.empty",
        },
    ])
}

pub fn organisational_unit_rules() -> Validator {
    Validator::new(vec![
        Rule {
            field: "name",
            groups: &["all", "name"],
            kind: RuleKind::NotEmpty,
            message: "validation.organisationalUnit.name.empty",
        },
        Rule {
            field: "code",
            groups: &["all", "code"],
            kind: RuleKind::NotEmpty,
            message: "validation.organisationalUnit.code.empty",
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_required_field_in_active_group_is_reported() {
        let errors = course_rules().check(&json!({"title": ""}), &["title"]);

        assert_eq!(errors.size(), 1);
        assert_eq!(
            errors.messages_for("title"),
            &["validation.course.title.empty".to_string()]
        );
    }

    #[test]
    fn rules_outside_the_active_group_stay_silent() {
        // description is also empty, but only the title group is active
        let errors = course_rules().check(&json!({"title": ""}), &["title"]);
        assert!(errors.messages_for("description").is_empty());

        let errors = course_rules().check(&json!({"title": "Intro to X"}), &["title"]);
        assert_eq!(errors.size(), 0);
    }

    #[test]
    fn all_group_fires_everything() {
        let errors = course_rules().check_all(&json!({}));
        assert!(errors.size() >= 3);
        assert!(!errors.messages_for("shortDescription").is_empty());
    }

    #[test]
    fn max_length_is_enforced() {
        let long = "x".repeat(161);
        let errors = course_rules().check(
            &json!({"shortDescription": long}),
            &["shortDescription"],
        );
        assert_eq!(
            errors.messages_for("shortDescription"),
            &["validation.course.shortDescription.maxLength".to_string()]
        );
    }

    #[test]
    fn module_duration_must_be_positive() {
        let errors = module_rules().check(&json!({"duration": 0}), &["duration"]);
        assert_eq!(
            errors.messages_for("duration"),
            &["validation.module.duration.positive".to_string()]
        );

        let errors = module_rules().check(&json!({"duration": 3600}), &["duration"]);
        assert_eq!(errors.size(), 0);
    }

    #[test]
    fn unknown_module_type_is_rejected() {
        let errors = module_rules().check(&json!({"type": "podcast"}), &["type"]);
        assert_eq!(
            errors.messages_for("type"),
            &["validation.module.type.validType".to_string()]
        );
    }

    #[test]
    fn nested_fields_resolve_through_dotted_paths() {
        let errors = event_rules().check(
            &json!({"venue": {"location": "", "capacity": 10, "minCapacity": 5}}),
            &["event.location"],
        );
        assert_eq!(
            errors.messages_for("venue.location"),
            &["validation.module.event.venue.location.empty".to_string()]
        );

        let errors = event_rules().check(
            &json!({"venue": {"location": "London", "capacity": 10, "minCapacity": 5}}),
            &["event.location"],
        );
        assert_eq!(errors.size(), 0);
    }

    #[test]
    fn deadline_must_be_in_the_future() {
        let errors =
            audience_rules().check(&json!({"requiredBy": "2019-01-01"}), &["audience.requiredBy"]);
        assert_eq!(
            errors.messages_for("requiredBy"),
            &["audience.validation.requiredBy.future".to_string()]
        );
    }

    #[test]
    fn size_counts_every_message() {
        let mut errors = ValidationErrors::default();
        assert!(errors.is_empty());
        errors.add("title", "a");
        errors.add("title", "b");
        errors.add("description", "c");
        assert_eq!(errors.size(), 3);
        assert!(!errors.is_empty());
    }
}
