//! Illumination programs and engine constants
//!
//! An illumination program is a repeating sequence of steps, one step per
//! image field. Each step carries a pulse-width weighting per laser diode
//! and the color channel whose mean intensity drives autoexposure while that
//! step is lit. Weights below 1.0 derate diodes that share an optical path.
//!
//! Diode channel wiring on the modulation controller, in index order:
//! 635/522/446 nm for RGB units 1-3 (indices 0-8), then 406, 446, 543, 562
//! and 657 nm single diodes (indices 9-13), and the 639 nm high-coherence
//! diode on index 14.

pub use modlink::wire::{NO_LASER_DIODES, NO_PHOTO_DIODES};

use crate::types::{ImgChannel, Mode};

/// Maximum allowed pulse width in microseconds.
pub const PW_MAX: f64 = 14000.0;

/// Fixed pulse width for the high-coherence diode in LSCI mode, microseconds.
pub const PW_LSCI: u16 = 7000;

/// Power the diodes are initialized at before autoexposure engages.
pub const PWR_START: f64 = 0.2;

/// Maximum power value.
pub const PWR_MAX: f64 = 1.0;

/// Minimum power value.
pub const PWR_MIN: f64 = 0.01;

/// Autoexposure target mean image intensity (8-bit scale).
pub const TARGET_IMG_INTENSITY: f64 = 128.0;

/// Maximum image intensity (8-bit scale).
pub const MAX_IMG_INTENSITY: f64 = 255.0;

/// Odd-field mono mean above which the sync flash is considered detected.
pub const SYNC_DETECT_THRESHOLD: f64 = 40.0;

/// Index of the high-coherence diode used for LSCI.
pub const LSCI_CHANNEL: usize = 14;

/// One program step: per-diode weights and the autoexposure channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Relative pulse-width weighting per diode, each in [0, 1].
    pub weights: [f64; NO_LASER_DIODES],
    /// Channel whose mean drives the autoexposure update for this step.
    pub channel: ImgChannel,
}

/// A cyclic illumination program, length >= 1.
pub type Program = &'static [Step];

// Weight tables are kept literal for auditability against the optical bench
// configuration.
#[rustfmt::skip]
static WLE_PRGRM: &[Step] = &[
    Step { weights: [1.0, 0.85, 0.85, 1.0, 0.85, 0.85, 1.0, 0.85, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Mono },
];

#[rustfmt::skip]
static PSE_PRGRM: &[Step] = &[
    Step { weights: [0.85, 0.85, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Mono },
    Step { weights: [0.0, 0.0, 0.0, 0.85, 0.85, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Mono },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.85, 0.85, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Mono },
];

#[rustfmt::skip]
static LSCI_PRGRM: &[Step] = &[
    Step { weights: [1.0, 0.85, 0.85, 1.0, 0.85, 0.85, 1.0, 0.85, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Mono },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], channel: ImgChannel::Red },
];

#[rustfmt::skip]
static MULTI_PRGRM: &[Step] = &[
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Blue },
    Step { weights: [0.0, 0.7, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Green },
    Step { weights: [0.7, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Red },
    Step { weights: [0.0, 0.0, 0.7, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Blue },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], channel: ImgChannel::Green },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0], channel: ImgChannel::Red },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Blue },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], channel: ImgChannel::Green },
];

#[rustfmt::skip]
static SSFDI_PRGRM: &[Step] = &[
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], channel: ImgChannel::Red },
    Step { weights: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], channel: ImgChannel::Red },
];

#[rustfmt::skip]
static WARMUP_PRGRM: &[Step] = &[
    Step { weights: [1.0; NO_LASER_DIODES], channel: ImgChannel::Mono },
    Step { weights: [1.0; NO_LASER_DIODES], channel: ImgChannel::Mono },
];

#[rustfmt::skip]
static OFF_PRGRM: &[Step] = &[
    Step { weights: [0.0; NO_LASER_DIODES], channel: ImgChannel::Mono },
];

/// The program installed when a mode is entered.
///
/// SYNC is a procedure rather than a program; it runs with all diodes off
/// between flashes, so it maps to the OFF table.
pub fn for_mode(mode: Mode) -> Program {
    match mode {
        Mode::Wle => WLE_PRGRM,
        Mode::Pse => PSE_PRGRM,
        Mode::Lsci => LSCI_PRGRM,
        Mode::Multi => MULTI_PRGRM,
        Mode::Ssfdi => SSFDI_PRGRM,
        Mode::Warmup => WARMUP_PRGRM,
        Mode::Off | Mode::Sync => OFF_PRGRM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_lengths() {
        assert_eq!(for_mode(Mode::Wle).len(), 1);
        assert_eq!(for_mode(Mode::Pse).len(), 3);
        assert_eq!(for_mode(Mode::Lsci).len(), 2);
        assert_eq!(for_mode(Mode::Multi).len(), 8);
        assert_eq!(for_mode(Mode::Ssfdi).len(), 2);
        assert_eq!(for_mode(Mode::Warmup).len(), 2);
        assert_eq!(for_mode(Mode::Off).len(), 1);
        assert_eq!(for_mode(Mode::Sync).len(), 1);
    }

    #[test]
    fn test_weights_are_normalized() {
        for mode in [
            Mode::Off,
            Mode::Wle,
            Mode::Pse,
            Mode::Lsci,
            Mode::Multi,
            Mode::Ssfdi,
            Mode::Warmup,
        ] {
            for (i, step) in for_mode(mode).iter().enumerate() {
                for (n, w) in step.weights.iter().enumerate() {
                    assert!(
                        (0.0..=1.0).contains(w),
                        "{mode:?} step {i} diode {n}: weight {w} out of range"
                    );
                }
            }
        }
    }

    #[test]
    fn test_lsci_drives_high_coherence_channel() {
        let program = for_mode(Mode::Lsci);
        assert_eq!(program[1].weights[LSCI_CHANNEL], 1.0);
        assert_eq!(program[1].channel, ImgChannel::Red);
    }

    #[test]
    fn test_pse_steps_fire_disjoint_units() {
        let program = for_mode(Mode::Pse);
        for n in 0..NO_LASER_DIODES {
            let lit = program.iter().filter(|s| s.weights[n] > 0.0).count();
            assert!(lit <= 1, "diode {n} lit in more than one PSE step");
        }
    }

    #[test]
    fn test_off_program_is_dark() {
        for step in for_mode(Mode::Off) {
            assert!(step.weights.iter().all(|&w| w == 0.0));
        }
    }
}
