use std::io;
use std::path::PathBuf;

use thiserror::Error;

use hardware::MountError;

/// Errors surfaced during illumination engine bring-up.
///
/// The per-frame control loop itself never fails: runtime faults are logged
/// and absorbed so that every frame produces a command.
#[derive(Error, Debug)]
pub enum IllumError {
    /// The acquisition log file could not be opened.
    #[error("failed to open acquisition log {}: {source}", .path.display())]
    LogOpen {
        /// Requested log path.
        path: PathBuf,
        source: io::Error,
    },

    /// The rotation mount could not be brought up.
    #[error("rotation mount initialization failed: {0}")]
    Mount(#[from] MountError),
}
