//! Illumination controller state machine
//!
//! Sequences the per-diode pulse widths through the active illumination
//! program, one step per image field, and closes the autoexposure loop from
//! measured image means back to emitted power. Driven externally: the frame
//! grabber's callback invokes [`advance_frame`](IlluminationController::advance_frame)
//! exactly once per grabbed frame, and every invocation produces exactly one
//! outbound command regardless of device state.
//!
//! Mode changes pass through a sync gate: until the [`Mode::Sync`] procedure
//! has measured the emission-to-observation delay, only OFF, WARMUP and SYNC
//! are reachable.

use tracing::debug;

use hardware::{power_to_angle, RotationMount};
use modlink::wire::{PulseCommand, FID_ERROR, PULSE_CHANNELS};
use modlink::SerialLink;

use crate::acqlog::{AcqLog, Record};
use crate::error::IllumError;
use crate::exposure::{bootstrap_fields, clamp_power, update_power, FeedbackRings};
use crate::program::{
    self, Program, LSCI_CHANNEL, NO_LASER_DIODES, PWR_START, PW_LSCI, PW_MAX,
    SYNC_DETECT_THRESHOLD,
};
use crate::types::{ChannelMeans, Field, Mode};

/// Top-level illumination engine.
///
/// Owns the serial link to the modulation controller and the rotation mount
/// driver; both are torn down when the controller is dropped, after a final
/// all-off command has been queued.
pub struct IlluminationController {
    link: SerialLink,
    mount: RotationMount,
    log: AcqLog,
    mode: Mode,
    program: Program,
    /// Fields stepped since the current mode started.
    counter: u32,
    /// Emission-to-observation delay in fields, measured by SYNC.
    buffer_offset: u32,
    /// Outbound frame id; increments once per frame.
    fid: i32,
    rings: FeedbackRings,
    synced: bool,
    shut_down: bool,
}

impl IlluminationController {
    /// Create the controller in OFF mode and queue a device reset.
    pub fn new(link: SerialLink, mount: RotationMount, log: AcqLog) -> Self {
        link.enqueue(PulseCommand::reset());

        let mut controller = Self {
            link,
            mount,
            log,
            mode: Mode::Off,
            program: program::for_mode(Mode::Off),
            counter: 0,
            buffer_offset: 0,
            fid: 0,
            rings: FeedbackRings::new(),
            synced: false,
            shut_down: false,
        };
        controller.set_mode(Mode::Off);
        controller
    }

    /// Bring up the rotation mount. Blocks through the homing sequence;
    /// call before the frame driver is engaged.
    ///
    /// # Errors
    /// Surfaces mount initialization failure so the caller can decide
    /// whether to run without the attenuated channel.
    pub fn initialize(&mut self) -> Result<(), IllumError> {
        self.mount.initialize()?;
        // park the attenuator near minimum transmission until a mode needs it
        self.mount.set_angle(power_to_angle(0.1));
        Ok(())
    }

    /// Switch the illumination program.
    ///
    /// Requests for imaging modes made before the sync procedure has latched
    /// are dropped silently. Entering any mode resets the program counter;
    /// entering SYNC additionally resets the measured delay, while other
    /// modes keep it and start from empty feedback rings.
    pub fn set_mode(&mut self, mode: Mode) {
        if !self.synced && mode.requires_sync() {
            debug!("Ignoring {mode:?} request before sync");
            return;
        }

        // SSFDI drives the high-coherence diode by pulse width, so the
        // attenuator goes to full transmission
        if mode == Mode::Ssfdi {
            self.mount.set_angle(power_to_angle(1.0));
        }

        self.mode = mode;
        self.log.append(Record::Mode(mode));

        if mode == Mode::Sync {
            self.buffer_offset = 0;
            self.program = program::for_mode(Mode::Off);
            self.synced = false;
        } else {
            self.program = program::for_mode(mode);
            self.rings.clear();
        }

        self.counter = 0;
    }

    /// Advance the program by one frame (two fields) and emit the resulting
    /// pulse-width command.
    ///
    /// `odd` and `even` are the per-channel mean intensities of the two
    /// fields of the frame that just arrived. Returns the command that was
    /// queued for transmission.
    pub fn advance_frame(&mut self, odd: ChannelMeans, even: ChannelMeans) -> PulseCommand {
        let mut powers = [0.0f64; PULSE_CHANNELS];

        // counter as the even field sees it; stepping below advances past it
        let even_field_counter = self.counter + 1;

        if self.mode == Mode::Sync && !self.synced {
            self.step_sync(&odd, &mut powers);
        } else if self.mode == Mode::Warmup {
            self.step_warmup(&mut powers);
        } else {
            self.step_fields(&odd, &even, &mut powers);
        }

        let mut pws = [0u16; PULSE_CHANNELS];
        for (pw, power) in pws.iter_mut().zip(powers.iter()) {
            *pw = (PW_MAX * power).round().clamp(0.0, PW_MAX) as u16;
        }

        if self.mode == Mode::Lsci {
            // the high-coherence diode runs at constant pulse width on both
            // parities; its power lives in the attenuator angle instead
            pws[LSCI_CHANNEL] = PW_LSCI;
            pws[NO_LASER_DIODES + LSCI_CHANNEL] = PW_LSCI;
            self.step_rotation(&even, even_field_counter);
        }

        let cmd = PulseCommand { fid: self.fid, pws };
        self.link.enqueue(cmd);
        self.log.append(Record::PulseWidths {
            fid: cmd.fid,
            pws: cmd.pws,
        });

        if let Some(report) = self.link.try_dequeue() {
            if report.fid == FID_ERROR {
                self.log.append(Record::DeviceError);
            } else {
                self.log.append(Record::Photodiodes {
                    fid: report.fid,
                    pdvs: report.pdvs,
                });
            }
        }

        self.fid += 1;
        cmd
    }

    /// One SYNC iteration: flash once, then widen the assumed delay by two
    /// fields per frame until the flash shows up in the odd-field means.
    fn step_sync(&mut self, odd: &ChannelMeans, powers: &mut [f64; PULSE_CHANNELS]) {
        if self.buffer_offset == 0 {
            // flash: every diode at full power on the odd field only
            for power in powers.iter_mut().take(NO_LASER_DIODES) {
                *power = 1.0;
            }
            self.buffer_offset += 2;
        } else if odd.mono() > SYNC_DETECT_THRESHOLD {
            self.synced = true;
            self.log.append(Record::Synced);
            self.log.append(Record::BufferOffset(self.buffer_offset));
        } else {
            self.buffer_offset += 2;
        }

        // both fields elapse even though no program step is consumed
        self.counter += 2;
    }

    /// WARMUP: full table weights on both fields, no feedback.
    fn step_warmup(&mut self, powers: &mut [f64; PULSE_CHANNELS]) {
        for n in 0..NO_LASER_DIODES {
            powers[n] = self.program[0].weights[n];
            powers[NO_LASER_DIODES + n] = self.program[1].weights[n];
        }
        self.counter += 2;
    }

    /// Normal-mode stepping: one program step per field with the delayed
    /// autoexposure update.
    fn step_fields(
        &mut self,
        odd: &ChannelMeans,
        even: &ChannelMeans,
        powers: &mut [f64; PULSE_CHANNELS],
    ) {
        for (field, means) in [(Field::Odd, odd), (Field::Even, even)] {
            let len = self.program.len() as u32;
            let prgrm_idx = (self.counter % len) as usize;

            // observations older than the measured delay predate any
            // deliberate emission and are discarded
            if self.counter >= self.buffer_offset {
                let frame_idx = ((self.counter - self.buffer_offset) % len) as usize;
                let intensity = means.select(self.program[frame_idx].channel);
                self.log.append(Record::Intensity(intensity));

                let prev_power = self.rings.take_emitted();
                let new_power = clamp_power(update_power(intensity, prev_power));
                self.rings.record_updated(new_power);
            }

            // the first full program cycle runs at the bootstrap power, after
            // which the pipeline is primed and feedback output takes over
            let power = if self.counter >= bootstrap_fields(self.buffer_offset, len) {
                self.rings.take_updated()
            } else {
                PWR_START
            };
            self.rings.record_emitted(power);

            let base = match field {
                Field::Odd => 0,
                Field::Even => NO_LASER_DIODES,
            };
            for (n, weight) in self.program[prgrm_idx].weights.iter().enumerate() {
                if *weight > 0.0 {
                    powers[base + n] = power * weight;
                }
            }

            self.counter += 1;
        }
    }

    /// LSCI attenuator loop: same update law on the even-field red mean,
    /// expressed as a rotation angle instead of a pulse width.
    ///
    /// `field_counter` is the counter value the even field was stepped at,
    /// so the validity gate matches the per-field one in `step_fields` and
    /// the first valid observation pairs with the first recorded power.
    fn step_rotation(&mut self, even: &ChannelMeans, field_counter: u32) {
        let power = if field_counter >= self.buffer_offset {
            let prev_power = self.rings.take_rotation();
            clamp_power(update_power(even.red, prev_power))
        } else {
            PWR_START
        };

        self.rings.record_rotation(power);
        self.mount.set_angle(power_to_angle(power));
        self.log.append(Record::Rotation(power));
    }

    /// Force OFF and queue a final all-zero command.
    ///
    /// Idempotent; also invoked from `Drop`, so an explicit call is only
    /// needed when the shutdown ordering matters to the caller.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.set_mode(Mode::Off);
        let cmd = PulseCommand {
            fid: self.fid,
            pws: [0; PULSE_CHANNELS],
        };
        self.link.enqueue(cmd);
        self.log.append(Record::PulseWidths {
            fid: cmd.fid,
            pws: cmd.pws,
        });
        self.fid += 1;
        self.log.flush();
    }

    /// Current illumination mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of steps in the current program.
    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    /// Fields stepped since the current mode started.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Measured emission-to-observation delay in fields.
    pub fn buffer_offset(&self) -> u32 {
        self.buffer_offset
    }

    /// Whether the sync procedure has latched.
    pub fn is_synced(&self) -> bool {
        self.synced
    }
}

impl Drop for IlluminationController {
    fn drop(&mut self) {
        self.shutdown();
        // link and mount drop after the final command is queued, which
        // sequences writes, then worker stop, then port close
    }
}
