//! Serial link to the light modulation controller
//!
//! The modulation controller is a microcontroller that drives a bank of
//! laser diodes by pulse-width modulation and reports power-monitoring
//! photodiode readings. This crate owns the USB serial transport to it:
//!
//! - [`wire`] defines the two fixed-layout binary records ([`PulseCommand`]
//!   out, [`TelemetryReport`] in) exactly as the firmware lays them out.
//! - [`link`] runs the port on a dedicated worker thread behind lock-free
//!   queues, so callers on the frame-driver thread enqueue and dequeue
//!   without ever waiting on the device.
//!
//! There is no retransmit and no framing: the records are fixed-size and the
//! link is assumed lossless at the USB layer. Transport glitches are dropped
//! and retried on the next worker tick.

pub mod link;
pub mod wire;

pub use link::{SerialLink, BAUD_RATE};
pub use wire::{
    PulseCommand, TelemetryReport, FID_ERROR, FID_RESET, NO_LASER_DIODES, NO_PHOTO_DIODES,
    PULSE_CHANNELS, VOLTAGE_CHANNELS,
};
