//! Acquisition log sink
//!
//! Every subsystem of the acquisition host (illumination core, frame
//! grabber, archiver) appends timestamped records to one shared log file for
//! post-hoc analysis of a recording session. Records are tab-separated and
//! prefixed with the elapsed time since the sink was created, formatted
//! `[mmm:ss:mmm]` (minutes, seconds, milliseconds).
//!
//! The sink is an explicit handle passed at construction; appends are
//! serialized by a mutex so any thread may log.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::warn;

use modlink::wire::{PULSE_CHANNELS, VOLTAGE_CHANNELS};

use crate::error::IllumError;
use crate::types::Mode;

/// A single acquisition log record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Illumination mode change.
    Mode(Mode),
    /// The sync procedure latched.
    Synced,
    /// Measured emission-to-observation delay in fields.
    BufferOffset(u32),
    /// Mean intensity consumed by an autoexposure update.
    Intensity(f64),
    /// Pulse widths commanded for one frame.
    PulseWidths {
        fid: i32,
        pws: [u16; PULSE_CHANNELS],
    },
    /// Photodiode voltages reported by the modulation controller.
    Photodiodes {
        fid: i32,
        pdvs: [u16; VOLTAGE_CHANNELS],
    },
    /// Runtime error reported by the modulation controller.
    DeviceError,
    /// Attenuator-loop power commanded to the rotation mount.
    Rotation(f64),
    /// A frame was archived.
    Frame(u64),
    /// A video file was opened or closed by the archiver.
    Video { opened: bool, path: PathBuf },
    /// Circular autoexposure mask parameters in pixels.
    Mask { cx: u32, cy: u32, radius: u32 },
    /// A frame was grabbed from the capture device.
    Grab(u64),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Mode(mode) => write!(f, "MODE\t{}", mode.id()),
            Record::Synced => write!(f, "SYNCED"),
            Record::BufferOffset(n) => write!(f, "BUFF\t{n}"),
            Record::Intensity(v) => write!(f, "VALS\t{v:.6}"),
            Record::PulseWidths { fid, pws } => {
                write!(f, "PWS\t{fid}")?;
                for pw in pws {
                    write!(f, ",{pw}")?;
                }
                Ok(())
            }
            Record::Photodiodes { fid, pdvs } => {
                write!(f, "PDV\t{fid}")?;
                for v in pdvs {
                    write!(f, ",{v}")?;
                }
                Ok(())
            }
            Record::DeviceError => write!(f, "ERR"),
            Record::Rotation(v) => write!(f, "ROTN\t{v:.6}"),
            Record::Frame(n) => write!(f, "FRAME\t{n}"),
            Record::Video { opened, path } => {
                let verb = if *opened { "Opened" } else { "Closed" };
                write!(f, "VIDEO\t{verb} {}", path.display())
            }
            Record::Mask { cx, cy, radius } => write!(f, "MASK\t{cx},{cy},{radius}"),
            Record::Grab(n) => write!(f, "GRAB\t{n}"),
        }
    }
}

struct Inner {
    start: Instant,
    writer: Mutex<Box<dyn Write + Send>>,
}

/// Clonable handle to the shared acquisition log.
#[derive(Clone)]
pub struct AcqLog {
    inner: Arc<Inner>,
}

impl AcqLog {
    /// Create a log writing to the given file, appending if it exists.
    pub fn create(path: &Path) -> Result<Self, IllumError> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| IllumError::LogOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::to_writer(BufWriter::new(file)))
    }

    /// Create a log over an arbitrary writer.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                start: Instant::now(),
                writer: Mutex::new(Box::new(writer)),
            }),
        }
    }

    /// Append one record. A write failure is reported once through the
    /// diagnostic log and otherwise absorbed; the control loop never stalls
    /// on the log file.
    pub fn append(&self, record: Record) {
        let line = format!("{}\t{record}\n", self.timestamp());
        let mut writer = self
            .inner
            .writer
            .lock()
            .expect("acquisition log mutex poisoned");
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!("Acquisition log write failed: {e}");
        }
    }

    /// Flush buffered records to the backing writer.
    pub fn flush(&self) {
        let mut writer = self
            .inner
            .writer
            .lock()
            .expect("acquisition log mutex poisoned");
        if let Err(e) = writer.flush() {
            warn!("Acquisition log flush failed: {e}");
        }
    }

    fn timestamp(&self) -> String {
        let ms = self.inner.start.elapsed().as_millis();
        let mins = ms / 60_000 % 60;
        let secs = ms / 1_000 % 60;
        let mils = ms % 1_000;
        format!("[{mins:03}:{secs:02}:{mils:03}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    #[test]
    fn test_record_formats() {
        assert_eq!(Record::Mode(Mode::Sync).to_string(), "MODE\t7");
        assert_eq!(Record::Synced.to_string(), "SYNCED");
        assert_eq!(Record::BufferOffset(4).to_string(), "BUFF\t4");
        assert_eq!(Record::Intensity(127.5).to_string(), "VALS\t127.500000");
        assert_eq!(Record::DeviceError.to_string(), "ERR");
        assert_eq!(Record::Rotation(0.2).to_string(), "ROTN\t0.200000");
        assert_eq!(Record::Frame(12).to_string(), "FRAME\t12");
        assert_eq!(Record::Grab(3).to_string(), "GRAB\t3");
        assert_eq!(
            Record::Mask {
                cx: 660,
                cy: 610,
                radius: 550
            }
            .to_string(),
            "MASK\t660,610,550"
        );
        assert_eq!(
            Record::Video {
                opened: true,
                path: PathBuf::from("run_000.avi")
            }
            .to_string(),
            "VIDEO\tOpened run_000.avi"
        );
    }

    #[test]
    fn test_pulse_width_record_lists_all_channels() {
        let record = Record::PulseWidths {
            fid: 5,
            pws: [2800; PULSE_CHANNELS],
        };
        let text = record.to_string();
        assert!(text.starts_with("PWS\t5,2800"));
        assert_eq!(text.matches(",2800").count(), PULSE_CHANNELS);
    }

    #[test]
    fn test_photodiode_record_lists_all_channels() {
        let record = Record::Photodiodes {
            fid: 9,
            pdvs: [100, 200, 300, 400, 500, 600],
        };
        assert_eq!(record.to_string(), "PDV\t9,100,200,300,400,500,600");
    }

    #[test]
    fn test_lines_carry_elapsed_time_prefix() {
        let file = NamedTempFile::new().unwrap();
        let log = AcqLog::create(file.path()).unwrap();
        log.append(Record::Mode(Mode::Off));
        log.append(Record::Synced);
        log.flush();

        let mut contents = String::new();
        File::open(file.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("MODE\t0"));
        // prefix is fixed-width: [mmm:ss:mmm]
        assert_eq!(lines[0].as_bytes()[11], b']');
        assert_eq!(lines[0].as_bytes()[12], b'\t');
        assert!(lines[1].ends_with("SYNCED"));
    }

    #[test]
    fn test_clones_share_one_file() {
        let file = NamedTempFile::new().unwrap();
        let log = AcqLog::create(file.path()).unwrap();
        let other = log.clone();
        log.append(Record::Grab(0));
        other.append(Record::Grab(1));
        log.flush();

        let mut contents = String::new();
        File::open(file.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
