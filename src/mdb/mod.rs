//! Mission database collaborator and the local parameter catalog

pub mod types;
pub mod database;
pub mod catalog;

pub use types::*;
pub use database::MissionDatabase;
pub use catalog::ParameterCatalog;
