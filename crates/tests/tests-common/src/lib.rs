pub mod deployment;
pub mod fixtures;
