//! Autoexposure feedback engine
//!
//! Emitted power and the image mean it produces are separated by the
//! sensor-to-processor pipeline delay, so the engine pairs them through
//! bounded lock-free rings: powers go in when emitted and come back out
//! `buffer_offset` fields later, when their response arrives. The update law
//! is a fixed-point iteration whose attractor is the power that lands the
//! observed mean on [`TARGET_IMG_INTENSITY`].

use crossbeam_queue::ArrayQueue;
use tracing::debug;

use crate::program::{MAX_IMG_INTENSITY, PWR_MAX, PWR_MIN, TARGET_IMG_INTENSITY};

/// Ring capacity, comfortably above any physical pipeline depth.
const RING_CAPACITY: usize = 512;

/// Power value returned while the update output must not exceed unity gain.
const PWR_CEILING: f64 = 0.999;

/// Clamp a power value into the allowed drive range.
pub fn clamp_power(power: f64) -> f64 {
    power.clamp(PWR_MIN, PWR_MAX)
}

/// One step of the autoexposure iteration.
///
/// Modified secant root solve under the locally-linear assumption that the
/// observed mean is proportional to emitted power, offset by the sensor
/// ceiling. If the observation already sits on target, the update is the
/// identity on `prev_power`. The result is capped at [`PWR_CEILING`] before
/// the caller applies [`clamp_power`].
pub fn update_power(prev_intensity: f64, prev_power: f64) -> f64 {
    let y_fixed = MAX_IMG_INTENSITY + 1.0;
    let alpha = (y_fixed - TARGET_IMG_INTENSITY) * PWR_MAX;

    let new_power = ((y_fixed - prev_intensity) * prev_power * PWR_MAX)
        / ((TARGET_IMG_INTENSITY - prev_intensity) * prev_power + alpha);

    new_power.min(PWR_CEILING)
}

/// First field index at which autoexposure output replaces the bootstrap
/// power: the pipeline delay rounded up to whole program cycles.
pub fn bootstrap_fields(buffer_offset: u32, program_len: u32) -> u32 {
    program_len * buffer_offset.div_ceil(program_len)
}

/// The three delay-matching rings of the feedback pipeline.
///
/// `emitted` holds powers awaiting the image they will produce, `updated`
/// holds iteration outputs awaiting emission, and `rotation` is the
/// equivalent of `emitted` for the attenuator loop. All three are
/// single-producer single-consumer; the frame-driver thread is both ends.
pub struct FeedbackRings {
    emitted: ArrayQueue<f64>,
    updated: ArrayQueue<f64>,
    rotation: ArrayQueue<f64>,
}

impl FeedbackRings {
    pub fn new() -> Self {
        Self {
            emitted: ArrayQueue::new(RING_CAPACITY),
            updated: ArrayQueue::new(RING_CAPACITY),
            rotation: ArrayQueue::new(RING_CAPACITY),
        }
    }

    /// Drop everything; called on every mode change.
    pub fn clear(&self) {
        while self.emitted.pop().is_some() {}
        while self.updated.pop().is_some() {}
        while self.rotation.pop().is_some() {}
    }

    /// Store a power that was just emitted, for pairing with a future
    /// observation.
    pub fn record_emitted(&self, power: f64) {
        if self.emitted.push(power).is_err() {
            debug!("emitted-power ring full, dropping {power}");
        }
    }

    /// The power whose response is arriving now. Underflow reads as zero;
    /// the clamped update absorbs the degenerate case.
    pub fn take_emitted(&self) -> f64 {
        self.emitted.pop().unwrap_or(0.0)
    }

    /// Store an iteration output, to become a future emission.
    pub fn record_updated(&self, power: f64) {
        if self.updated.push(power).is_err() {
            debug!("updated-power ring full, dropping {power}");
        }
    }

    /// The iteration output that should be emitted now, zero on underflow.
    pub fn take_updated(&self) -> f64 {
        self.updated.pop().unwrap_or(0.0)
    }

    /// Store the attenuator-loop power just commanded.
    pub fn record_rotation(&self, power: f64) {
        if self.rotation.push(power).is_err() {
            debug!("rotation-power ring full, dropping {power}");
        }
    }

    /// The attenuator power whose response is arriving now, zero on
    /// underflow.
    pub fn take_rotation(&self) -> f64 {
        self.rotation.pop().unwrap_or(0.0)
    }

    /// Number of emitted powers awaiting observation.
    pub fn emitted_depth(&self) -> usize {
        self.emitted.len()
    }
}

impl Default for FeedbackRings {
    fn default() -> Self {
        Self::new()
    }
}
