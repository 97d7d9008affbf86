//! MAC vendor lookup using the bundled OUI database
//!
//! Used to give unregistered devices a hint of who made them.

use mac_oui::Oui;
use std::sync::OnceLock;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB.get_or_init(|| Oui::default().ok()).as_ref()
}

/// Vendor name used for locally administered addresses
pub const RANDOMIZED_VENDOR: &str = "Private Device (Randomized MAC)";

/// Check if a MAC address is locally administered (randomized/virtual)
///
/// Bit 1 (0x02) of the first octet marks locally administered addresses.
pub fn is_locally_administered(mac: &str) -> bool {
    let first: String = mac
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(2)
        .collect();

    if first.len() < 2 {
        return false;
    }

    u8::from_str_radix(&first, 16)
        .map(|byte| byte & 0x02 != 0)
        .unwrap_or(false)
}

/// Manufacturer for `mac`, or the randomized marker for private addresses
pub fn lookup_vendor(mac: &str) -> Option<String> {
    if is_locally_administered(mac) {
        return Some(RANDOMIZED_VENDOR.to_string());
    }

    get_oui_db()
        .and_then(|db| db.lookup_by_mac(mac).ok().flatten())
        .map(|entry| entry.company_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locally_administered_bit() {
        assert!(is_locally_administered("5a:05:d7:51:07:81"));
        assert!(is_locally_administered("DE:B2:52:65:8C:55"));
        assert!(!is_locally_administered("34:4a:c3:22:6f:90"));
        assert!(!is_locally_administered("00:1c:b3:00:00:00"));
        assert!(!is_locally_administered(""));
    }

    #[test]
    fn randomized_mac_gets_private_vendor() {
        assert_eq!(
            lookup_vendor("da:a1:19:00:00:01").as_deref(),
            Some(RANDOMIZED_VENDOR)
        );
    }
}
