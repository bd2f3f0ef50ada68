//! Catalogue access layer error types.

use cm_common::TransportError;
use thiserror::Error;

/// Failure while mapping an untyped upstream payload into a typed entity.
///
/// An unrecognized discriminator is a contract violation between this
/// application and the upstream catalogue; it is fatal for the request and
/// never produces a partially constructed entity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("unrecognized entity variant: {discriminator:?}")]
    UnrecognizedVariant { discriminator: String },

    #[error("entity payload carries no type discriminator")]
    MissingDiscriminator,
}

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error("failed to serialize entity: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogueError>;
