//! Fixtures bundled with the crate

use crate::LoadError;
use crate::config::{ConfigDocument, load};

/// Ubuntu guest `user-data` used by the VFIO passthrough test
///
/// Creates the `cloud` user, configures two systemd-networkd interfaces
/// and installs a `vfio.service` unit running the passthrough script.
pub const UBUNTU_USER_DATA: &str = include_str!("../fixtures/cloud-init/ubuntu/user-data");

/// Load [`UBUNTU_USER_DATA`]
pub fn ubuntu() -> Result<ConfigDocument, LoadError> {
    load(UBUNTU_USER_DATA)
}
