use thiserror::Error;

use crate::construct::{ClassId, FamilyId};

#[derive(Error, Debug)]
pub enum ConformableError {
    #[error("Family '{family}' already has a conformable top type '{existing}'")]
    DuplicateTopType { family: String, existing: String },
    #[error("Family '{family}' must supply the `{hook}` capability")]
    MissingCapability { family: String, hook: &'static str },
    #[error("Family '{family}' cannot redirect subclassing of '{class}'")]
    InvalidRedirectTarget { family: String, class: String },
    #[error("Family '{0}' is already declared")]
    DuplicateFamily(String),
    #[error("Family identity {0} is already in use")]
    FamilyInUse(FamilyId),
    #[error("Unknown family: {0}")]
    UnknownFamily(FamilyId),
    #[error("Unknown class: {0}")]
    UnknownClass(ClassId),
    #[error("Subclassing '{class}' is not supported")]
    SealedClass { class: String },
    #[error("Metaclass conflict while declaring '{class}': {message}")]
    MetaclassConflict { class: String, message: String },
    #[error("Manifest error: {0}")]
    Manifest(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConformableError>;

// Helper conversions
impl From<config::ConfigError> for ConformableError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for ConformableError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
