pub mod account;
pub mod audit;
pub mod dimension;
pub mod person;

pub use account::{Account, Role};
pub use audit::AuditEntry;
pub use dimension::{DimensionCategory, DimensionRecord, EMPTY_DETAIL};
pub use person::Person;
