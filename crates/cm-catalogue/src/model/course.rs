//! Course entity.

use serde::{Deserialize, Serialize};

use super::{Audience, Module};

/// Course price as reported by the catalogue: either an amount or a label
/// such as "Free".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Label(String),
}

/// A course in the learning catalogue.
///
/// The identifier is absent until the catalogue has persisted the course
/// for the first time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_outcomes: Option<String>,

    /// Total duration in seconds, aggregated by the catalogue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,

    #[serde(default)]
    pub modules: Vec<Module>,

    #[serde(default)]
    pub audiences: Vec<Audience>,
}

impl Course {
    /// Sum of the module prices; `None` when the course has no modules.
    pub fn cost(&self) -> Option<f64> {
        if self.modules.is_empty() {
            return None;
        }
        Some(self.modules.iter().filter_map(|m| m.core().price).sum())
    }

    /// Course type derived from its modules: `blended` for more than one
    /// module, the single module's type otherwise.
    pub fn course_type(&self) -> Option<&'static str> {
        match self.modules.len() {
            0 => None,
            1 => Some(self.modules[0].module_type()),
            _ => Some("blended"),
        }
    }

    /// Every event scheduled on the course's face-to-face modules.
    pub fn events(&self) -> impl Iterator<Item = &super::Event> {
        self.modules.iter().flat_map(|module| module.events().iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleCore;

    fn module_with_price(price: Option<f64>) -> Module {
        Module::Link {
            core: ModuleCore {
                price,
                ..ModuleCore::default()
            },
            url: "http://example.org".to_string(),
        }
    }

    fn course(modules: Vec<Module>) -> Course {
        Course {
            id: None,
            title: "Working with budgets".to_string(),
            short_description: None,
            description: None,
            learning_outcomes: None,
            duration: None,
            price: None,
            modules,
            audiences: vec![],
        }
    }

    #[test]
    fn cost_is_none_without_modules() {
        assert_eq!(course(vec![]).cost(), None);
    }

    #[test]
    fn cost_sums_module_prices() {
        let c = course(vec![module_with_price(Some(100.0)), module_with_price(None)]);
        assert_eq!(c.cost(), Some(100.0));
    }

    #[test]
    fn course_type_follows_module_count() {
        assert_eq!(course(vec![]).course_type(), None);
        assert_eq!(course(vec![module_with_price(None)]).course_type(), Some("link"));
        assert_eq!(
            course(vec![module_with_price(None), module_with_price(None)]).course_type(),
            Some("blended")
        );
    }
}
