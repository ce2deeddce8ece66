//! Common helpers for illumination engine tests

use std::sync::{Arc, Mutex};

use hardware::{MockMotion, MockState, RotationMount};
use lumen::{AcqLog, ChannelMeans, IlluminationController, Mode};
use modlink::SerialLink;

pub const MOUNT_SERIAL: u32 = 28252094;

/// Field means for a dark frame.
pub fn dark() -> ChannelMeans {
    ChannelMeans::default()
}

/// Field means with the same value on all three channels.
pub fn flat(value: f64) -> ChannelMeans {
    ChannelMeans::new(value, value, value)
}

/// Controller wired to a mock rotation mount and an absent serial device.
///
/// The returned state handle observes every command the mount received.
pub fn make_controller() -> (IlluminationController, Arc<Mutex<MockState>>) {
    let mock = MockMotion::new(&[MOUNT_SERIAL]);
    let state = mock.state();
    let mount = RotationMount::new(Box::new(mock), MOUNT_SERIAL);
    let link = SerialLink::open("/nonexistent/modulator");
    let log = AcqLog::to_writer(std::io::sink());

    let mut controller = IlluminationController::new(link, mount, log);
    controller.initialize().expect("mock mount bring-up");
    (controller, state)
}

/// Run the sync procedure to completion.
///
/// `dark_rounds` frames pass between the flash and its detection, so the
/// measured buffer offset is `2 + 2 * dark_rounds` fields.
pub fn run_sync(controller: &mut IlluminationController, dark_rounds: u32) {
    controller.set_mode(Mode::Sync);
    controller.advance_frame(dark(), dark()); // emits the flash
    for _ in 0..dark_rounds {
        controller.advance_frame(dark(), dark());
    }
    controller.advance_frame(flat(50.0), dark()); // flash detected
    assert!(controller.is_synced(), "sync procedure failed to latch");
    assert_eq!(controller.buffer_offset(), 2 + 2 * dark_rounds);
}
