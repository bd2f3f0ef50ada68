//! Module entity - the polymorphic building block of a course.

use serde::{Deserialize, Serialize};

use super::{Audience, Event};

/// Fields shared by every module variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Duration in seconds.
    #[serde(default)]
    pub duration: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub audiences: Vec<Audience>,
}

/// A course module, discriminated by the upstream `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Module {
    #[serde(rename = "link")]
    Link {
        #[serde(flatten)]
        core: ModuleCore,
        url: String,
    },

    #[serde(rename = "video")]
    Video {
        #[serde(flatten)]
        core: ModuleCore,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },

    #[serde(rename = "file")]
    File {
        #[serde(flatten)]
        core: ModuleCore,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "fileSize")]
        file_size: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "mediaId")]
        media_id: Option<String>,
    },

    #[serde(rename = "elearning")]
    Elearning {
        #[serde(flatten)]
        core: ModuleCore,
        #[serde(rename = "startPage")]
        start_page: String,
    },

    #[serde(rename = "face-to-face")]
    FaceToFace {
        #[serde(flatten)]
        core: ModuleCore,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "productCode")]
        product_code: Option<String>,
        #[serde(default)]
        events: Vec<Event>,
    },
}

/// Discriminator values the catalogue recognises.
pub const MODULE_TYPES: &[&str] = &["link", "video", "file", "elearning", "face-to-face"];

impl Module {
    pub fn core(&self) -> &ModuleCore {
        match self {
            Module::Link { core, .. }
            | Module::Video { core, .. }
            | Module::File { core, .. }
            | Module::Elearning { core, .. }
            | Module::FaceToFace { core, .. } => core,
        }
    }

    pub fn core_mut(&mut self) -> &mut ModuleCore {
        match self {
            Module::Link { core, .. }
            | Module::Video { core, .. }
            | Module::File { core, .. }
            | Module::Elearning { core, .. }
            | Module::FaceToFace { core, .. } => core,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.core().id.as_deref()
    }

    /// The upstream discriminator value for this variant.
    pub fn module_type(&self) -> &'static str {
        match self {
            Module::Link { .. } => "link",
            Module::Video { .. } => "video",
            Module::File { .. } => "file",
            Module::Elearning { .. } => "elearning",
            Module::FaceToFace { .. } => "face-to-face",
        }
    }

    /// Events scheduled on this module (face-to-face only).
    pub fn events(&self) -> &[Event] {
        match self {
            Module::FaceToFace { events, .. } => events,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_its_discriminator() {
        let module = Module::Elearning {
            core: ModuleCore {
                title: "Intro".to_string(),
                ..ModuleCore::default()
            },
            start_page: "start-page".to_string(),
        };

        let value = serde_json::to_value(&module).unwrap();
        assert_eq!(value["type"], "elearning");
        assert_eq!(value["startPage"], "start-page");
        assert_eq!(value["title"], "Intro");
    }

    #[test]
    fn face_to_face_round_trips_events() {
        let raw = json!({
            "type": "face-to-face",
            "title": "Workshop",
            "productCode": "product-code",
            "events": [{
                "id": "XEbjXzmVQwSQ_7qIvr7Kew",
                "venue": {"location": "London", "address": "SE1", "capacity": 99, "minCapacity": 10},
                "dateRanges": [{"date": "2019-01-01", "startTime": "09:00:00", "endTime": "17:00:00"}]
            }]
        });

        let module: Module = serde_json::from_value(raw).unwrap();
        assert_eq!(module.module_type(), "face-to-face");
        assert_eq!(module.events().len(), 1);
        assert_eq!(module.events()[0].venue.as_ref().unwrap().capacity, 99);
    }
}
