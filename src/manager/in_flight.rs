//! Per-device exclusion for acquisitions.

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of devices with an acquisition in flight.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    devices: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claims a device, or returns `None` if it is already claimed.
    ///
    /// The claim is released when the guard drops, on every exit path.
    pub(crate) fn try_claim(&self, device_id: &str) -> Option<InFlightGuard<'_>> {
        let mut devices = self
            .devices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !devices.insert(device_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            owner: self,
            device_id: device_id.to_string(),
        })
    }

    /// Returns `true` if the device is claimed.
    pub(crate) fn is_claimed(&self, device_id: &str) -> bool {
        self.devices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(device_id)
    }

    fn release(&self, device_id: &str) {
        self.devices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(device_id);
    }
}

/// Releases its device claim on drop.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    device_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.release(&self.device_id);
    }
}
