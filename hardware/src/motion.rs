//! Vendor motion-library seam
//!
//! The direct-drive rotation mount is operated through the vendor's motion
//! control library. [`MotionDevice`] captures exactly the calls the mount
//! driver needs, so the vendor binding stays swappable and tests run against
//! [`MockMotion`](crate::mock::MockMotion).

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the rotation mount and its vendor seam.
#[derive(Error, Debug)]
pub enum MountError {
    /// The requested serial number was not in the device list.
    #[error("rotation mount device {serial_no} not found")]
    DeviceNotFound {
        /// Serial number that was searched for.
        serial_no: String,
    },

    /// The device was found but could not be opened.
    #[error("failed to open rotation mount {serial_no}: {reason}")]
    OpenFailed { serial_no: String, reason: String },

    /// A vendor-library call failed after open.
    #[error("rotation mount command failed: {0}")]
    Command(String),

    /// The homing sequence did not complete.
    #[error("rotation mount homing failed: {0}")]
    Homing(String),
}

/// Minimal surface of the vendor motion library used by the mount driver.
///
/// Position arguments are in device counts. All methods except
/// [`home_blocking`](MotionDevice::home_blocking) are expected to return
/// promptly; homing blocks until the device reports it has found its
/// reference position.
pub trait MotionDevice: Send {
    /// List the serial numbers of connected devices.
    fn enumerate(&mut self) -> Result<Vec<String>, MountError>;

    /// Open the device with the given serial number.
    fn open(&mut self, serial_no: &str) -> Result<(), MountError>;

    /// Start the vendor library's status polling loop.
    fn start_polling(&mut self, interval: Duration) -> Result<(), MountError>;

    /// Energize the motor channel.
    fn enable_channel(&mut self) -> Result<(), MountError>;

    /// Program maximum velocity and acceleration, both in counts.
    fn set_velocity_params(&mut self, velocity: i32, acceleration: i32) -> Result<(), MountError>;

    /// Home the device and block until it reports homed.
    fn home_blocking(&mut self) -> Result<(), MountError>;

    /// Command an absolute move. Non-blocking; never fails synchronously.
    fn move_absolute(&mut self, position: i32);

    /// Stop the status polling loop.
    fn stop_polling(&mut self);

    /// Close the device.
    fn close(&mut self);
}
