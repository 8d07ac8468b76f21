//! FlavorFind client: chefs sign in, then publish and manage their recipes
//! against a Manifest backend.

pub mod app;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod form;
pub mod picker;
pub mod preview;
pub mod prompt;
pub mod recipes;
pub mod session;
pub mod shell;
