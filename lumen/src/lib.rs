//! LUMEN - Laser Utility for Multi-contrast ENdoscopy
//!
//! The frame-synchronous illumination engine of a multi-contrast laser
//! endoscopy acquisition host. A bank of 15 laser diodes is driven by
//! pulse-width modulation from a serial-attached modulation controller; a
//! motorized half-wave plate attenuates the high-coherence channel. This
//! crate sequences per-diode pulse widths through cyclic illumination
//! programs, one step per interlaced video field, and closes a delayed
//! autoexposure loop from measured image means back to emitted power.
//!
//! # Overview
//!
//! The frame grabber's callback feeds each grabbed frame's per-field channel
//! means into [`IlluminationController::advance_frame`], which:
//!
//! 1. advances two program steps (odd field, then even field),
//! 2. updates emitted powers through the feedback pipeline in [`exposure`],
//! 3. queues exactly one pulse-width command on the [`modlink`] serial
//!    worker, and
//! 4. drains at most one photodiode telemetry record.
//!
//! # Mode state machine
//!
//! ```text
//!            ┌─────┐   any time   ┌────────┐
//!            │ OFF │◄────────────►│ WARMUP │
//!            └──┬──┘              └────────┘
//!               │
//!            ┌──▼───┐  flash seen: sync latched
//!            │ SYNC │─────────────────────────┐
//!            └──────┘                         │
//!                       ┌─────────────────────▼───────┐
//!                       │ WLE / PSE / LSCI / MULTI /  │
//!                       │ SSFDI   (sync-gated modes)  │
//!                       └─────────────────────────────┘
//! ```
//!
//! Until SYNC has measured the emission-to-observation delay, requests for
//! the imaging modes are silently ignored. The measured delay survives later
//! mode changes; re-entering SYNC remeasures it.
//!
//! # Collaborators
//!
//! Frame grabbing, GPU preprocessing, archiving and the operator UI live
//! elsewhere in the acquisition host and talk to this engine only through
//! the per-frame call and the shared [`acqlog`] sink.

pub mod acqlog;
pub mod config;
pub mod controller;
pub mod error;
pub mod exposure;
pub mod program;
pub mod types;

pub use acqlog::{AcqLog, Record};
pub use config::IllumConfig;
pub use controller::IlluminationController;
pub use error::IllumError;
pub use types::{ChannelMeans, Field, ImgChannel, Mode};
