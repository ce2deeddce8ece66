//! Threaded serial transport for the light modulation controller
//!
//! Owns the duplex USB serial port and a dedicated worker thread so that the
//! frame-driver thread never waits on device latency. Outbound commands go
//! through an unbounded channel drained by the worker; inbound telemetry is
//! read by the worker and handed back through a second channel.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytemuck::Zeroable;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, error, info};

use crate::wire::{PulseCommand, TelemetryReport};

/// Baud rate for comms with the modulation controller.
pub const BAUD_RATE: u32 = 115_200;

/// Worker tick interval.
const POLL_INTERVAL: Duration = Duration::from_millis(3);

/// Read timeout for a record that is already buffered on the port.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Handle to the serial worker.
///
/// Dropping the handle stops the worker cooperatively, which closes the port
/// after the last queued write has been attempted on the current tick.
pub struct SerialLink {
    tx: Sender<PulseCommand>,
    rx: Receiver<TelemetryReport>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SerialLink {
    /// Open the port and start the worker.
    ///
    /// A missing or unopenable device is not fatal: the worker still runs and
    /// discards writes, so the control loop keeps its per-frame cadence with
    /// no hardware attached.
    pub fn open(path: &str) -> Self {
        let port = match serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(port) => {
                info!("Modulation controller found at {path}");
                // discard anything the device sent before we were listening
                if let Err(e) = port.clear(ClearBuffer::Input) {
                    debug!("Failed to flush receive buffer: {e}");
                }
                Some(port)
            }
            Err(e) => {
                error!("Modulation controller not found at {path}: {e}");
                None
            }
        };

        let (tx, worker_rx) = unbounded::<PulseCommand>();
        let (worker_tx, rx) = unbounded::<TelemetryReport>();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = Arc::clone(&stop);
        let worker = std::thread::spawn(move || {
            run_worker(port, worker_rx, worker_tx, worker_stop);
        });

        Self {
            tx,
            rx,
            stop,
            worker: Some(worker),
        }
    }

    /// Queue a command for transmission. Never blocks.
    pub fn enqueue(&self, cmd: PulseCommand) {
        // send only fails after the worker has exited
        let _ = self.tx.send(cmd);
    }

    /// Take at most one received telemetry record. Never blocks.
    pub fn try_dequeue(&self) -> Option<TelemetryReport> {
        self.rx.try_recv().ok()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Serial worker panicked during shutdown");
            }
        }
    }
}

/// Worker loop: one write and one read attempt per 3 ms tick.
///
/// Records are fixed-size, so no framing is needed; a short read is dropped
/// and retried from the next buffered record on a later tick.
fn run_worker(
    mut port: Option<Box<dyn SerialPort>>,
    outbound: Receiver<PulseCommand>,
    inbound: Sender<TelemetryReport>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        if let Ok(cmd) = outbound.try_recv() {
            if let Some(port) = port.as_mut() {
                if let Err(e) = port.write_all(bytemuck::bytes_of(&cmd)) {
                    debug!("Serial write failed (fid {}): {e}", cmd.fid);
                }
            }
        }

        if let Some(port) = port.as_mut() {
            let available = port.bytes_to_read().unwrap_or(0) as usize;
            if available > TelemetryReport::RECORD_SIZE {
                let mut report = TelemetryReport::zeroed();
                match port.read_exact(bytemuck::bytes_of_mut(&mut report)) {
                    Ok(()) => {
                        let _ = inbound.send(report);
                    }
                    Err(e) => debug!("Serial read failed: {e}"),
                }
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    // attempt every command still queued at shutdown, so a final all-off
    // record reaches the device before the port closes
    if let Some(port) = port.as_mut() {
        while let Ok(cmd) = outbound.try_recv() {
            if let Err(e) = port.write_all(bytemuck::bytes_of(&cmd)) {
                debug!("Serial write failed during shutdown (fid {}): {e}", cmd.fid);
                break;
            }
        }
    }
    // port closes when dropped here
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::FID_RESET;

    #[test]
    fn test_absent_device_is_tolerated() {
        let link = SerialLink::open("/nonexistent/modulator");

        // writes are accepted and silently discarded
        link.enqueue(PulseCommand::reset());
        link.enqueue(PulseCommand {
            fid: 0,
            pws: [100; 30],
        });

        // nothing ever arrives
        std::thread::sleep(Duration::from_millis(20));
        assert!(link.try_dequeue().is_none());
    }

    #[test]
    fn test_drop_joins_worker() {
        let link = SerialLink::open("/nonexistent/modulator");
        link.enqueue(PulseCommand::reset());
        drop(link); // must not hang or panic
    }

    #[test]
    fn test_enqueue_preserves_record() {
        let cmd = PulseCommand {
            fid: FID_RESET,
            pws: [14000; 30],
        };
        let bytes = bytemuck::bytes_of(&cmd);
        assert_eq!(bytes.len(), PulseCommand::RECORD_SIZE);
    }
}
