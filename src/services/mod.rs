pub mod account_service;
pub mod audit_service;
pub mod dimension_service;
pub mod import_service;
pub mod person_service;

pub use account_service::AccountService;
pub use audit_service::AuditService;
pub use dimension_service::DimensionService;
pub use import_service::ImportService;
pub use person_service::PersonService;

use thiserror::Error;

use crate::database::manager::DatabaseError;

/// Typed failures returned by the service layer.
///
/// `Forbidden` carries no detail on purpose: a failed gate looks the same
/// whether the token was never granted or does not exist. Validation carries
/// every violation found so the caller can fix the whole batch at once.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
