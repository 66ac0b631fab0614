pub mod dashboard;
pub mod normalizer;
pub mod schema_registry;
pub mod view_engine;
