//! Translate request parameters into search criteria, and search criteria into SQL
//! to be run against the database.

pub mod criteria;
pub mod error;
pub mod pagination;
pub mod parameters;
pub mod query;
pub mod template;
pub mod values;
