//! Network module - interface detection, subnet utilities, vendor lookup

mod interface;
mod subnet;
mod vendor;

pub use interface::{
    find_interface_by_name, find_valid_interface, interface_score, list_valid_interfaces,
};
pub use subnet::{calculate_subnet_ips, is_local_subnet, is_special_address};
pub use vendor::{RANDOMIZED_VENDOR, is_locally_administered, lookup_vendor};
