//! Export functionality for reports
//!
//! Provides CSV and JSON export of the device registry and event log

pub mod csv;
pub mod json;

pub use csv::*;
pub use json::*;
