//! Wire records exchanged with the light modulation controller
//!
//! Both directions use fixed-size little-endian binary structs whose layout
//! matches the firmware definition. Natural alignment of the 4-byte frame id
//! followed by 2-byte arrays leaves no padding, so the structs can be moved
//! on and off the wire as raw bytes.

use bytemuck::{Pod, Zeroable};

/// Number of laser diode drive channels on the modulation controller.
pub const NO_LASER_DIODES: usize = 15;

/// Number of power-monitoring photodiode channels.
pub const NO_PHOTO_DIODES: usize = 3;

/// Pulse-width slots per command: one per diode per field parity.
pub const PULSE_CHANNELS: usize = 2 * NO_LASER_DIODES;

/// Voltage slots per telemetry record: one per photodiode per field parity.
pub const VOLTAGE_CHANNELS: usize = 2 * NO_PHOTO_DIODES;

/// Frame id sent to reset the modulation controller.
pub const FID_RESET: i32 = -1;

/// Frame id reported by the modulation controller on a runtime error.
pub const FID_ERROR: i32 = -2;

/// Per-frame pulse-width command, host to controller.
///
/// Total record size: 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PulseCommand {
    /// Frame id echoed back in telemetry. Negative values are reserved.
    pub fid: i32,

    /// Pulse widths in microseconds, odd-field diodes 0..15 then even-field
    /// diodes 0..15.
    pub pws: [u16; PULSE_CHANNELS],
}

impl PulseCommand {
    /// Expected record size in bytes.
    pub const RECORD_SIZE: usize = 64;

    /// Command with the reserved reset id and all channels off.
    pub fn reset() -> Self {
        Self {
            fid: FID_RESET,
            pws: [0; PULSE_CHANNELS],
        }
    }
}

// SAFETY: PulseCommand is repr(C) with no padding (4-byte id, 60 bytes of u16)
unsafe impl Pod for PulseCommand {}
// SAFETY: all-zero bytes are a valid PulseCommand
unsafe impl Zeroable for PulseCommand {}

/// Per-frame photodiode telemetry, controller to host.
///
/// Total record size: 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TelemetryReport {
    /// Frame id echoed from the command that produced this reading, or
    /// [`FID_ERROR`] for a firmware-reported runtime error.
    pub fid: i32,

    /// Raw photodiode readings, odd-field diodes 0..3 then even-field
    /// diodes 0..3.
    pub pdvs: [u16; VOLTAGE_CHANNELS],
}

impl TelemetryReport {
    /// Expected record size in bytes.
    pub const RECORD_SIZE: usize = 16;
}

// SAFETY: TelemetryReport is repr(C) with no padding (4-byte id, 12 bytes of u16)
unsafe impl Pod for TelemetryReport {}
// SAFETY: all-zero bytes are a valid TelemetryReport
unsafe impl Zeroable for TelemetryReport {}
