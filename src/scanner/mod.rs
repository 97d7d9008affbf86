//! Device discovery on the local segment

mod arp;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

use crate::models::ScanSnapshot;

pub use arp::{ArpReply, ArpScanner, active_arp_scan};

/// Boxed future returned by [`DeviceScanner::scan`]
pub type ScanFuture<'a> = Pin<Box<dyn Future<Output = Result<ScanSnapshot>> + Send + 'a>>;

/// Source of scan snapshots.
///
/// Implementations return the set of devices currently reachable. A failed
/// scan is an error, never an empty snapshot.
pub trait DeviceScanner: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    fn scan(&self) -> ScanFuture<'_>;
}
