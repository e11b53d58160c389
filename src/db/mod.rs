//! SQLite persistence: schema and row converters.

pub mod converters;
pub mod schema;
