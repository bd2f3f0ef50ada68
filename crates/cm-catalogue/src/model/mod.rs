//! Typed entities of the learning catalogue.

mod audience;
mod course;
mod event;
mod media;
mod module;
mod provider;

pub use audience::{Audience, AudienceType};
pub use course::{Course, Price};
pub use event::{DateRange, Event, Venue};
pub use media::{Media, MediaMetadata};
pub use module::{Module, ModuleCore, MODULE_TYPES};
pub use provider::{CancellationPolicy, LearningProvider, TermsAndConditions};
