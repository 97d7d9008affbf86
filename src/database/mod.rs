//! Database module for the device registry and event log
//!
//! Provides SQLite storage for:
//! - Registered and sighted devices
//! - The append-only connect/disconnect event log
//! - Monitor scan history

pub mod connection;
pub mod models;
pub mod queries;
pub mod schema;

pub use connection::Database;
pub use models::*;
