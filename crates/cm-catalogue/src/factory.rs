//! Entity factories - pure mappings from untyped upstream payloads into
//! typed entities.
//!
//! Recognized fields are copied verbatim, nested structures are built
//! recursively through the nested factories, and absent collection fields
//! default to empty sequences so consumers can always iterate. Module
//! construction dispatches on the `type` discriminator and fails with
//! [`FactoryError::UnrecognizedVariant`] for unknown tags.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::error::FactoryError;
use crate::model::{
    Audience, AudienceType, CancellationPolicy, Course, DateRange, Event, LearningProvider,
    Module, ModuleCore, Price, TermsAndConditions, Venue,
};

pub trait EntityFactory<T>: Send + Sync {
    fn create(&self, raw: Value) -> Result<T, FactoryError>;
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn string(raw: &Value, field: &str) -> Option<String> {
    raw.get(field).and_then(Value::as_str).map(str::to_string)
}

fn string_or_default(raw: &Value, field: &str) -> String {
    string(raw, field).unwrap_or_default()
}

fn u64_field(raw: &Value, field: &str) -> Option<u64> {
    raw.get(field).and_then(Value::as_u64)
}

fn f64_field(raw: &Value, field: &str) -> Option<f64> {
    raw.get(field).and_then(Value::as_f64)
}

fn bool_field(raw: &Value, field: &str) -> bool {
    raw.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn string_list(raw: &Value, field: &str) -> Vec<String> {
    raw.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Deadlines arrive either as a bare date or a date-time.
fn datetime_field(raw: &Value, field: &str) -> Option<NaiveDateTime> {
    let text = raw.get(field).and_then(Value::as_str)?;
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AudienceFactory;

impl EntityFactory<Audience> for AudienceFactory {
    fn create(&self, raw: Value) -> Result<Audience, FactoryError> {
        Ok(Audience {
            id: string(&raw, "id"),
            name: string_or_default(&raw, "name"),
            audience_type: string(&raw, "type").as_deref().and_then(AudienceType::parse),
            areas_of_work: string_list(&raw, "areasOfWork"),
            departments: string_list(&raw, "departments"),
            grades: string_list(&raw, "grades"),
            interests: string_list(&raw, "interests"),
            required_by: datetime_field(&raw, "requiredBy"),
            frequency: string(&raw, "frequency"),
            event_id: string(&raw, "eventId"),
        })
    }
}

#[derive(Default)]
pub struct EventFactory;

impl EventFactory {
    fn date_range(raw: &Value) -> Option<DateRange> {
        let date = NaiveDate::parse_from_str(raw.get("date")?.as_str()?, "%Y-%m-%d").ok()?;
        Some(DateRange {
            date,
            start_time: Self::time(raw.get("startTime")?.as_str()?)?,
            end_time: Self::time(raw.get("endTime")?.as_str()?)?,
        })
    }

    fn time(text: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(text, "%H:%M:%S")
            .ok()
            .or_else(|| NaiveTime::parse_from_str(text, "%H:%M").ok())
    }

    fn venue(raw: &Value) -> Option<Venue> {
        let venue = raw.get("venue")?;
        Some(Venue {
            location: string_or_default(venue, "location"),
            address: string_or_default(venue, "address"),
            capacity: u64_field(venue, "capacity").unwrap_or(0) as u32,
            min_capacity: u64_field(venue, "minCapacity").unwrap_or(0) as u32,
        })
    }
}

impl EntityFactory<Event> for EventFactory {
    fn create(&self, raw: Value) -> Result<Event, FactoryError> {
        let date_ranges = raw
            .get("dateRanges")
            .and_then(Value::as_array)
            .map(|ranges| ranges.iter().filter_map(Self::date_range).collect())
            .unwrap_or_default();

        Ok(Event {
            id: string(&raw, "id"),
            date_ranges,
            venue: Self::venue(&raw),
        })
    }
}

/// Builds the concrete module variant selected by the `type` discriminator.
pub struct ModuleFactory {
    audience_factory: AudienceFactory,
    event_factory: EventFactory,
}

impl ModuleFactory {
    pub fn new(audience_factory: AudienceFactory, event_factory: EventFactory) -> Self {
        Self {
            audience_factory,
            event_factory,
        }
    }

    fn core(&self, raw: &Value) -> Result<ModuleCore, FactoryError> {
        let audiences = raw
            .get("audiences")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|a| self.audience_factory.create(a.clone()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(ModuleCore {
            id: string(raw, "id"),
            title: string_or_default(raw, "title"),
            description: string_or_default(raw, "description"),
            duration: u64_field(raw, "duration").unwrap_or(0),
            price: f64_field(raw, "price"),
            optional: bool_field(raw, "optional"),
            audiences,
        })
    }
}

impl Default for ModuleFactory {
    fn default() -> Self {
        Self::new(AudienceFactory, EventFactory)
    }
}

impl EntityFactory<Module> for ModuleFactory {
    fn create(&self, raw: Value) -> Result<Module, FactoryError> {
        let discriminator = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(FactoryError::MissingDiscriminator)?;

        let core = self.core(&raw)?;

        match discriminator {
            "link" => Ok(Module::Link {
                core,
                url: string_or_default(&raw, "url"),
            }),
            "video" => Ok(Module::Video {
                core,
                url: string_or_default(&raw, "url"),
                location: string(&raw, "location"),
            }),
            "file" => Ok(Module::File {
                core,
                url: string_or_default(&raw, "url"),
                file_size: u64_field(&raw, "fileSize"),
                media_id: string(&raw, "mediaId"),
            }),
            "elearning" => Ok(Module::Elearning {
                core,
                start_page: string_or_default(&raw, "startPage"),
            }),
            "face-to-face" => {
                let events = raw
                    .get("events")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .map(|e| self.event_factory.create(e.clone()))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()?
                    .unwrap_or_default();

                Ok(Module::FaceToFace {
                    core,
                    product_code: string(&raw, "productCode"),
                    events,
                })
            }
            other => Err(FactoryError::UnrecognizedVariant {
                discriminator: other.to_string(),
            }),
        }
    }
}

pub struct CourseFactory {
    module_factory: ModuleFactory,
    audience_factory: AudienceFactory,
}

impl CourseFactory {
    pub fn new(module_factory: ModuleFactory, audience_factory: AudienceFactory) -> Self {
        Self {
            module_factory,
            audience_factory,
        }
    }

    fn price(raw: &Value) -> Option<Price> {
        match raw.get("price") {
            Some(Value::Number(n)) => n.as_f64().map(Price::Amount),
            Some(Value::String(s)) => Some(Price::Label(s.clone())),
            _ => None,
        }
    }
}

impl Default for CourseFactory {
    fn default() -> Self {
        Self::new(ModuleFactory::default(), AudienceFactory)
    }
}

impl EntityFactory<Course> for CourseFactory {
    fn create(&self, raw: Value) -> Result<Course, FactoryError> {
        let modules = raw
            .get("modules")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|m| self.module_factory.create(m.clone()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let audiences = raw
            .get("audiences")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|a| self.audience_factory.create(a.clone()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Course {
            id: string(&raw, "id"),
            title: string_or_default(&raw, "title"),
            short_description: string(&raw, "shortDescription"),
            description: string(&raw, "description"),
            learning_outcomes: string(&raw, "learningOutcomes"),
            duration: u64_field(&raw, "duration"),
            price: Self::price(&raw),
            modules,
            audiences,
        })
    }
}

#[derive(Default)]
pub struct LearningProviderFactory;

impl EntityFactory<LearningProvider> for LearningProviderFactory {
    fn create(&self, raw: Value) -> Result<LearningProvider, FactoryError> {
        Ok(LearningProvider {
            id: string(&raw, "id"),
            name: string_or_default(&raw, "name"),
        })
    }
}

#[derive(Default)]
pub struct CancellationPolicyFactory;

impl EntityFactory<CancellationPolicy> for CancellationPolicyFactory {
    fn create(&self, raw: Value) -> Result<CancellationPolicy, FactoryError> {
        Ok(CancellationPolicy {
            id: string(&raw, "id"),
            name: string_or_default(&raw, "name"),
            short_version: string(&raw, "shortVersion"),
            full_version: string(&raw, "fullVersion"),
        })
    }
}

#[derive(Default)]
pub struct TermsAndConditionsFactory;

impl EntityFactory<TermsAndConditions> for TermsAndConditionsFactory {
    fn create(&self, raw: Value) -> Result<TermsAndConditions, FactoryError> {
        Ok(TermsAndConditions {
            id: string(&raw, "id"),
            name: string(&raw, "name").unwrap_or_else(|| string_or_default(&raw, "title")),
            content: string(&raw, "termsAndConditions")
                .unwrap_or_else(|| string_or_default(&raw, "content")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn module_data() -> Value {
        json!({
            "id": "MBlZJv-ZRDCYZsCByjzRuQ",
            "title": "module title",
            "description": "module description",
            "duration": 3600,
            "price": 100,
            "audiences": [{
                "areasOfWork": ["digital"],
                "departments": ["co", "hmrc"],
                "grades": ["AA", "G7"],
                "interests": ["project management"],
                "requiredBy": "2019-01-01T00:00:00",
                "frequency": "YEARLY"
            }]
        })
    }

    #[test]
    fn creates_a_link_module() {
        let mut data = module_data();
        data["type"] = json!("link");
        data["url"] = json!("http://example.org");

        let module = ModuleFactory::default().create(data).unwrap();

        assert!(matches!(module, Module::Link { .. }));
        let core = module.core();
        assert_eq!(core.id.as_deref(), Some("MBlZJv-ZRDCYZsCByjzRuQ"));
        assert_eq!(core.title, "module title");
        assert_eq!(core.duration, 3600);
        assert_eq!(core.price, Some(100.0));
        assert_eq!(core.audiences.len(), 1);
        assert_eq!(core.audiences[0].departments, vec!["co", "hmrc"]);
        assert_eq!(
            core.audiences[0].required_by.unwrap().to_string(),
            "2019-01-01 00:00:00"
        );
    }

    #[test]
    fn creates_an_elearning_module() {
        let mut data = module_data();
        data["type"] = json!("elearning");
        data["startPage"] = json!("start-page");

        let module = ModuleFactory::default().create(data).unwrap();

        match module {
            Module::Elearning { start_page, .. } => assert_eq!(start_page, "start-page"),
            other => panic!("expected elearning module, got {}", other.module_type()),
        }
    }

    #[test]
    fn creates_a_face_to_face_module_with_events() {
        let mut data = module_data();
        data["type"] = json!("face-to-face");
        data["productCode"] = json!("product-code");
        data["events"] = json!([{
            "id": "XEbjXzmVQwSQ_7qIvr7Kew",
            "venue": {"location": "London", "address": "SE1", "capacity": 99, "minCapacity": 10},
            "dateRanges": [{"date": "2019-01-01", "startTime": "09:00:00", "endTime": "17:00:00"}]
        }]);

        let module = ModuleFactory::default().create(data).unwrap();

        let events = module.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("XEbjXzmVQwSQ_7qIvr7Kew"));
        assert_eq!(events[0].date_ranges[0].date.to_string(), "2019-01-01");
        assert_eq!(events[0].date_ranges[0].start_time.to_string(), "09:00:00");
        let venue = events[0].venue.as_ref().unwrap();
        assert_eq!(venue.location, "London");
        assert_eq!(venue.min_capacity, 10);
    }

    #[test]
    fn collections_default_to_empty_when_absent() {
        let module = ModuleFactory::default()
            .create(json!({"type": "face-to-face", "title": "Workshop"}))
            .unwrap();

        assert!(module.core().audiences.is_empty());
        assert!(module.events().is_empty());
    }

    #[test]
    fn unrecognized_discriminator_is_fatal() {
        let err = ModuleFactory::default()
            .create(json!({"type": "podcast", "title": "x"}))
            .unwrap_err();

        assert_eq!(
            err,
            FactoryError::UnrecognizedVariant {
                discriminator: "podcast".to_string()
            }
        );
    }

    #[test]
    fn missing_discriminator_is_fatal() {
        let err = ModuleFactory::default()
            .create(json!({"title": "x"}))
            .unwrap_err();
        assert_eq!(err, FactoryError::MissingDiscriminator);

        let err = ModuleFactory::default()
            .create(json!({"type": "", "title": "x"}))
            .unwrap_err();
        assert_eq!(err, FactoryError::MissingDiscriminator);
    }

    #[test]
    fn course_round_trips_its_identity_fields() {
        let raw = json!({
            "id": "L1U3cK3GQtuf3iDg71NqJw",
            "title": "Working with budgets",
            "shortDescription": "short",
            "description": "long",
            "learningOutcomes": "outcomes",
            "modules": [{"type": "link", "id": "m1", "title": "reading", "url": "http://example.org"}]
        });

        let course = CourseFactory::default().create(raw).unwrap();
        assert_eq!(course.id.as_deref(), Some("L1U3cK3GQtuf3iDg71NqJw"));
        assert_eq!(course.modules.len(), 1);

        let serialized = serde_json::to_value(&course).unwrap();
        assert_eq!(serialized["id"], "L1U3cK3GQtuf3iDg71NqJw");
        assert_eq!(serialized["title"], "Working with budgets");
        assert_eq!(serialized["modules"][0]["type"], "link");
    }

    #[test]
    fn course_modules_default_to_empty_when_null() {
        let course = CourseFactory::default()
            .create(json!({"id": "c1", "title": "t", "modules": null}))
            .unwrap();
        assert!(course.modules.is_empty());
    }

    #[test]
    fn terms_and_conditions_accepts_both_field_spellings() {
        let factory = TermsAndConditionsFactory;
        let t1 = factory
            .create(json!({"id": "t", "title": "Standard terms", "termsAndConditions": "body"}))
            .unwrap();
        assert_eq!(t1.name, "Standard terms");
        assert_eq!(t1.content, "body");

        let t2 = factory
            .create(json!({"name": "Standard terms", "content": "body"}))
            .unwrap();
        assert_eq!(t2.name, "Standard terms");
        assert_eq!(t2.content, "body");
    }

    #[test]
    fn course_price_keeps_free_label() {
        let course = CourseFactory::default()
            .create(json!({"title": "t", "price": "Free"}))
            .unwrap();
        assert_eq!(course.price, Some(Price::Label("Free".to_string())));
    }
}
