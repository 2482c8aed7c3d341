use std::error::Error;

use hidapi::HidDevice;

use crate::config::{DeviceCatalog, DeviceProfile};

use super::{event::Event, report};

/// HID buffer read timeout
const HID_TIMEOUT: i32 = 10;

/// Largest input report emitted by any supported device
const REPORT_BUF_SIZE: usize = 64;

/// A connected SpaceMouse device polled for raw reports and decoded through
/// its catalog profile
pub struct Driver {
    /// HIDRAW device instance
    device: HidDevice,
    profile: DeviceProfile,
    /// Reports dropped because they were malformed
    dropped_reports: u64,
}

impl Driver {
    /// Open the device described by the given profile
    pub fn open(profile: DeviceProfile) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api = hidapi::HidApi::new()?;
        let (vendor_id, product_id) = profile.hid_id;
        let device = api.open(vendor_id, product_id)?;
        log::debug!(
            "Opened '{}' ({vendor_id:#06x}:{product_id:#06x})",
            profile.name
        );

        Ok(Self {
            device,
            profile,
            dropped_reports: 0,
        })
    }

    /// Enumerate connected HID devices and return the profile of the first
    /// one present in the catalog. Devices from known 6-DOF vendors that
    /// have no profile are logged so the user can add one.
    pub fn discover(catalog: &DeviceCatalog) -> Result<Option<DeviceProfile>, Box<dyn Error + Send + Sync>> {
        // 3Dconnexion devices report under either of these vendor IDs
        const KNOWN_VENDORS: [u16; 2] = [0x046d, 0x256f];

        let api = hidapi::HidApi::new()?;
        for info in api.device_list() {
            let (vendor_id, product_id) = (info.vendor_id(), info.product_id());
            if let Some(profile) = catalog.lookup(vendor_id, product_id) {
                log::info!(
                    "Found supported device '{}' ({vendor_id:#06x}:{product_id:#06x})",
                    profile.name
                );
                return Ok(Some(profile.clone()));
            }
            if KNOWN_VENDORS.contains(&vendor_id) {
                log::warn!(
                    "Device {vendor_id:#06x}:{product_id:#06x} has no catalog profile; \
                     add one to devices.yaml to use it"
                );
            }
        }

        Ok(None)
    }

    /// Number of malformed reports dropped since the device was opened
    pub fn dropped_reports(&self) -> u64 {
        self.dropped_reports
    }

    /// Poll the device and decode any pending report. Returns no events when
    /// the read times out with nothing pending. A malformed report is
    /// dropped and counted, not an error; a failed read is an error and
    /// means the device is gone.
    pub fn poll(&mut self) -> Result<Vec<Event>, Box<dyn Error + Send + Sync>> {
        let mut buf = [0; REPORT_BUF_SIZE];
        let bytes_read = self.device.read_timeout(&mut buf[..], HID_TIMEOUT)?;
        if bytes_read == 0 {
            return Ok(Vec::new());
        }

        let slice = &buf[..bytes_read];
        match report::decode(slice, &self.profile) {
            Ok(events) => Ok(events),
            Err(e) => {
                self.dropped_reports += 1;
                log::debug!("Dropping report: {e}");
                Ok(Vec::new())
            }
        }
    }
}
