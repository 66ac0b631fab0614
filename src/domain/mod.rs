pub mod epidemic;
pub mod error;
pub mod export;
pub mod schema;
pub mod views;
