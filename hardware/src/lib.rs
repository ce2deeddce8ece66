//! Motion hardware for the multi-contrast illumination source
//!
//! Currently one device: the direct-drive rotation mount that turns the
//! half-wave plate attenuating the high-coherence laser channel. The vendor
//! motion library sits behind the [`MotionDevice`] seam so the driver logic
//! is testable without hardware.

pub mod mock;
pub mod motion;
pub mod mount;

pub use mock::{MockMotion, MockState};
pub use motion::{MotionDevice, MountError};
pub use mount::{power_to_angle, RotationMount, ROT_ANG_MAX, ROT_ANG_MIN};
