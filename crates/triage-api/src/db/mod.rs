//! Postgres persistence

pub mod schema;
pub mod store;

pub use store::PgStore;
