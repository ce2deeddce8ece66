//! Acquisition log record sequences produced by the control loop

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::{dark, flat, MOUNT_SERIAL};
use hardware::{MockMotion, RotationMount};
use lumen::{AcqLog, IlluminationController, Mode};
use modlink::SerialLink;

/// In-memory log sink that stays readable after the controller takes the
/// writer.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    /// Logged records with their time prefixes stripped.
    fn records(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8(bytes.clone())
            .unwrap()
            .lines()
            .map(|line| {
                let (prefix, record) = line.split_once('\t').expect("missing time prefix");
                assert!(prefix.starts_with('[') && prefix.ends_with(']'));
                record.to_string()
            })
            .collect()
    }
}

fn make_logged_controller() -> (IlluminationController, SharedBuf) {
    let buf = SharedBuf::default();
    let mock = MockMotion::new(&[MOUNT_SERIAL]);
    let mount = RotationMount::new(Box::new(mock), MOUNT_SERIAL);
    let link = SerialLink::open("/nonexistent/modulator");
    let log = AcqLog::to_writer(buf.clone());

    let mut controller = IlluminationController::new(link, mount, log);
    controller.initialize().expect("mock mount bring-up");
    (controller, buf)
}

#[test]
fn test_construction_logs_initial_mode() {
    let (_controller, buf) = make_logged_controller();
    assert_eq!(buf.records(), vec!["MODE\t0"]);
}

#[test]
fn test_sync_latch_logs_synced_then_offset() {
    let (mut controller, buf) = make_logged_controller();

    controller.set_mode(Mode::Sync);
    controller.advance_frame(dark(), dark());
    controller.advance_frame(flat(50.0), dark());
    assert!(controller.is_synced());

    let records = buf.records();
    let mode_at = records.iter().position(|r| r == "MODE\t7").unwrap();
    let synced_at = records.iter().position(|r| r == "SYNCED").unwrap();
    assert!(mode_at < synced_at);
    assert_eq!(records[synced_at + 1], "BUFF\t2");
}

#[test]
fn test_rejected_mode_request_logs_nothing() {
    let (mut controller, buf) = make_logged_controller();
    let before = buf.records().len();

    controller.set_mode(Mode::Lsci);
    assert_eq!(buf.records().len(), before);
}

#[test]
fn test_each_frame_logs_one_pws_record() {
    let (mut controller, buf) = make_logged_controller();

    for _ in 0..5 {
        controller.advance_frame(dark(), dark());
    }

    let records = buf.records();
    let pws: Vec<&String> = records.iter().filter(|r| r.starts_with("PWS\t")).collect();
    assert_eq!(pws.len(), 5);

    // frame id leads each record, followed by all 30 pulse widths
    assert!(pws[0].starts_with("PWS\t0,"));
    assert!(pws[4].starts_with("PWS\t4,"));
    assert_eq!(pws[0].split(',').count(), 31);
}

#[test]
fn test_observations_log_vals_once_per_field() {
    let (mut controller, buf) = make_logged_controller();
    controller.set_mode(Mode::Sync);
    controller.advance_frame(dark(), dark());
    controller.advance_frame(flat(50.0), dark());
    controller.set_mode(Mode::Wle);

    let before = buf
        .records()
        .iter()
        .filter(|r| r.starts_with("VALS\t"))
        .count();
    assert_eq!(before, 0, "no autoexposure before the first WLE frame");

    // first frame: counter 0 and 1 are below the offset, nothing observed
    controller.advance_frame(flat(100.0), flat(110.0));
    // second frame: both fields pass the offset gate
    controller.advance_frame(flat(100.0), flat(110.0));

    let vals: Vec<String> = buf
        .records()
        .iter()
        .filter(|r| r.starts_with("VALS\t"))
        .cloned()
        .collect();
    assert_eq!(vals, vec!["VALS\t100.000000", "VALS\t110.000000"]);
}
