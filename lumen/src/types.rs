//! Common types for the illumination engine

use serde::{Deserialize, Serialize};

/// One half of an interlaced video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Odd scan lines.
    Odd,
    /// Even scan lines.
    Even,
}

/// Image color channel driving an autoexposure update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImgChannel {
    Red,
    Green,
    Blue,
    /// Average of the three color channels.
    Mono,
}

/// Illumination mode.
///
/// The discriminants are part of the acquisition log format (`MODE <n>`)
/// and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    /// All diodes off.
    Off = 0,
    /// White light endoscopy.
    Wle = 1,
    /// Photometric stereo endoscopy.
    Pse = 2,
    /// Laser speckle contrast imaging.
    Lsci = 3,
    /// Multispectral imaging.
    Multi = 4,
    /// Single-snapshot fluorescence/diffuse imaging.
    Ssfdi = 5,
    /// Thermal warmup, all diodes at full power.
    Warmup = 6,
    /// Emission-to-observation delay measurement.
    Sync = 7,
}

impl Mode {
    /// Numeric id used in the acquisition log.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Whether entering this mode requires a completed sync procedure.
    pub fn requires_sync(self) -> bool {
        !matches!(self, Mode::Off | Mode::Warmup | Mode::Sync)
    }
}

/// Mean image intensity per color channel for one field, on a 0-255 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelMeans {
    pub blue: f64,
    pub green: f64,
    pub red: f64,
}

impl ChannelMeans {
    pub fn new(blue: f64, green: f64, red: f64) -> Self {
        Self { blue, green, red }
    }

    /// Mean across all three color channels.
    pub fn mono(&self) -> f64 {
        (self.blue + self.green + self.red) / 3.0
    }

    /// The scalar observation for the given autoexposure channel.
    pub fn select(&self, channel: ImgChannel) -> f64 {
        match channel {
            ImgChannel::Blue => self.blue,
            ImgChannel::Green => self.green,
            ImgChannel::Red => self.red,
            ImgChannel::Mono => self.mono(),
        }
    }
}
