//! Built-in rule implementations, grouped by concern

pub mod comparison;
pub mod date;
pub mod format;
pub mod numeric;
pub mod required;
pub mod size;
pub mod store;
