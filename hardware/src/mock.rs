//! Mock motion device for testing and hardware-free bench runs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::motion::{MotionDevice, MountError};

/// Observable state of a [`MockMotion`] device.
#[derive(Debug, Default)]
pub struct MockState {
    pub opened: Option<String>,
    pub polling: Option<Duration>,
    pub enabled: bool,
    pub velocity: Option<i32>,
    pub acceleration: Option<i32>,
    pub homed: bool,
    /// Every commanded absolute position in counts, in order.
    pub positions: Vec<i32>,
    pub closed: bool,
}

/// Mock motion device that records every call.
///
/// Clone the state handle with [`state`](MockMotion::state) before moving the
/// device into a driver.
pub struct MockMotion {
    serial_nos: Vec<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockMotion {
    /// Create a mock library with the given connected serial numbers.
    pub fn new(serial_nos: &[u32]) -> Self {
        Self {
            serial_nos: serial_nos.iter().map(u32::to_string).collect(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Shared handle to the recorded device state.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }
}

impl MotionDevice for MockMotion {
    fn enumerate(&mut self) -> Result<Vec<String>, MountError> {
        Ok(self.serial_nos.clone())
    }

    fn open(&mut self, serial_no: &str) -> Result<(), MountError> {
        self.state.lock().unwrap().opened = Some(serial_no.to_string());
        Ok(())
    }

    fn start_polling(&mut self, interval: Duration) -> Result<(), MountError> {
        self.state.lock().unwrap().polling = Some(interval);
        Ok(())
    }

    fn enable_channel(&mut self) -> Result<(), MountError> {
        self.state.lock().unwrap().enabled = true;
        Ok(())
    }

    fn set_velocity_params(&mut self, velocity: i32, acceleration: i32) -> Result<(), MountError> {
        let mut state = self.state.lock().unwrap();
        state.velocity = Some(velocity);
        state.acceleration = Some(acceleration);
        Ok(())
    }

    fn home_blocking(&mut self) -> Result<(), MountError> {
        self.state.lock().unwrap().homed = true;
        Ok(())
    }

    fn move_absolute(&mut self, position: i32) {
        self.state.lock().unwrap().positions.push(position);
    }

    fn stop_polling(&mut self) {
        self.state.lock().unwrap().polling = None;
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed = true;
    }
}
