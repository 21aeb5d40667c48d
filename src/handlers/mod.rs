pub mod accounts;
pub mod auth;
pub mod dimensions;
pub mod imports;
pub mod people;
