//! Direct-drive rotation mount driver
//!
//! The mount carries the half-wave plate that attenuates the high-coherence
//! laser channel. Initialization is a one-shot blocking bring-up (enumerate,
//! open, poll, enable, program motion limits, home); after that the only
//! operation is a non-blocking absolute move.

use std::time::Duration;

use tracing::{info, warn};

use crate::motion::{MotionDevice, MountError};

/// Device position scale factor in counts per degree.
pub const POS_SCALE_FACTOR: i32 = 4000;

/// Rotation velocity in degrees per second.
pub const VELOCITY: i32 = 1800;

/// Rotation acceleration in degrees per second squared.
pub const ACCELERATION: i32 = 10476;

/// Half-wave plate angle for maximum power, in degrees.
pub const ROT_ANG_MAX: f64 = 310.0;

/// Half-wave plate angle for minimum power, in degrees.
pub const ROT_ANG_MIN: f64 = 265.0;

/// Vendor status polling interval.
const POLL_INTERVAL: Duration = Duration::from_millis(3);

/// Settle time after the motor channel is energized.
const ENABLE_SETTLE: Duration = Duration::from_secs(1);

/// Convert an illumination power scalar in [0, 1] to a plate angle in degrees.
pub fn power_to_angle(power: f64) -> f64 {
    (ROT_ANG_MAX - ROT_ANG_MIN) * power + ROT_ANG_MIN
}

/// Driver for the direct-drive rotation mount.
///
/// Stops polling and closes the device on drop if it was initialized.
pub struct RotationMount {
    device: Box<dyn MotionDevice>,
    serial_no: String,
    initialized: bool,
    position: f64,
}

impl RotationMount {
    /// Create a driver for the mount with the given serial number.
    ///
    /// No device communication happens until [`initialize`](Self::initialize).
    pub fn new(device: Box<dyn MotionDevice>, serial_no: u32) -> Self {
        Self {
            device,
            serial_no: serial_no.to_string(),
            initialized: false,
            position: 0.0,
        }
    }

    /// Bring up the mount: find it, open it, program motion parameters and
    /// home it. Blocks until the device reports homed.
    ///
    /// # Errors
    /// Returns an error if the serial number is absent from the device list
    /// or any vendor call fails. The caller decides whether to continue
    /// without an attenuator.
    pub fn initialize(&mut self) -> Result<(), MountError> {
        let devices = self.device.enumerate()?;
        if !devices.iter().any(|s| s == &self.serial_no) {
            return Err(MountError::DeviceNotFound {
                serial_no: self.serial_no.clone(),
            });
        }

        self.device.open(&self.serial_no)?;
        info!("Connected to rotation mount {}", self.serial_no);

        self.device.start_polling(POLL_INTERVAL)?;
        self.device.enable_channel()?;
        std::thread::sleep(ENABLE_SETTLE);

        self.device
            .set_velocity_params(VELOCITY * POS_SCALE_FACTOR, ACCELERATION * POS_SCALE_FACTOR)?;

        info!("Homing rotation mount...");
        self.device.home_blocking()?;
        info!("Rotation mount homed");

        self.initialized = true;
        Ok(())
    }

    /// Command an absolute move to the given angle in degrees.
    ///
    /// Non-blocking; the move completes in the background. Idempotent for a
    /// repeated angle. A driver that was never initialized ignores the
    /// command.
    pub fn set_angle(&mut self, degrees: f64) {
        if !self.initialized {
            return;
        }
        self.position = degrees;
        self.device
            .move_absolute((degrees * POS_SCALE_FACTOR as f64) as i32);
    }

    /// Last commanded angle in degrees.
    pub fn angle(&self) -> f64 {
        self.position
    }

    /// Whether the bring-up sequence has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Drop for RotationMount {
    fn drop(&mut self) {
        if self.initialized {
            self.device.stop_polling();
            self.device.close();
        } else {
            warn!("Rotation mount {} dropped uninitialized", self.serial_no);
        }
    }
}
