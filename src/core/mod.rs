pub mod config;
pub mod database;
pub mod error;
pub mod frame;
pub mod identifiers;
pub mod node;
pub mod signature;
pub mod telemetry;
pub mod validation;
