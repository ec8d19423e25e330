//! Query execution against a PostgreSQL database: run the statements built by
//! the translation crate and decode their rows.

pub mod error;
pub mod execution;
pub mod metrics;
pub mod query;
pub mod rows;
pub mod state;
