pub mod basic_models;
pub mod schema;

pub use schema::{Entity, EntityName};
