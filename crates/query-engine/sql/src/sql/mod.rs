//! Building, rendering and binding SQL statements.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod string;
