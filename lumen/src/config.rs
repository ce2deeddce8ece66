use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Host-side configuration for the illumination engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IllumConfig {
    /// Serial port of the light modulation controller.
    pub serial_port: String,
    /// Serial number of the direct-drive rotation mount.
    pub mount_serial_no: u32,
    /// Acquisition log output path.
    pub log_path: PathBuf,
}

impl Default for IllumConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyACM0".to_string(),
            mount_serial_no: 28_252_094,
            log_path: PathBuf::from("acquisition.log"),
        }
    }
}
