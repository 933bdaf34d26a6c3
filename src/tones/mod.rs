// Tone generation engine.
//
// Two independent DDS channels (the sub-audible CTCSS tone and the audible
// beep) share one carrier timer. Control-plane calls mutate channel state;
// the per-tick handler advances both phases, writes the duty registers and
// powers the carrier down once nothing is left enabled.

mod channel;
mod table;

pub use channel::{to_increment, ACTUAL_SAMPLE_RATE, NOMINAL_SAMPLE_RATE};

use crate::hw::{Output, TonePwm};
use channel::ToneChannel;

// Integer carrier ticks per second, for countdown quantization.
pub const TICK_RATE: u32 = 16406;

pub struct ToneGen<H: TonePwm> {
    hw:             H,
    tone:           ToneChannel,
    beep:           ToneChannel,
    beep_countdown: u32,
    running:        bool,
}

impl<H: TonePwm> ToneGen<H> {
    // Configures the output pins and the carrier timer. The carrier is left
    // idle until a channel is switched on.
    pub fn new(mut hw: H) -> Self {
        hw.configure();

        ToneGen {
            hw:             hw,
            tone:           ToneChannel::new(),
            beep:           ToneChannel::new(),
            beep_countdown: 0,
            running:        false,
        }
    }

    // Stops the carrier clock and returns the output pins to a quiescent,
    // non-driving mode.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.hw.release();
    }

    pub fn set_tone_frequency(&mut self, hz: f32) {
        self.tone.set_frequency(hz);
    }

    pub fn tone_on(&mut self) {
        self.tone.enabled = true;
        self.hw.set_output_enable(Output::Tone, true);
        self.start_carrier();
    }

    // Clears the channel; the carrier keeps running until the next tick's
    // shutdown check.
    pub fn tone_off(&mut self) {
        self.tone.enabled = false;
        self.hw.set_output_enable(Output::Tone, false);
    }

    pub fn set_beep_frequency(&mut self, hz: f32) {
        self.beep.set_frequency(hz);
    }

    // Switches the beep on indefinitely: any pending timed countdown is
    // discarded.
    pub fn beep_on(&mut self) {
        self.beep_countdown = 0;
        self.beep.enabled = true;
        self.hw.set_output_enable(Output::Beep, true);
        self.start_carrier();
    }

    pub fn beep_off(&mut self) {
        self.beep_countdown = 0;
        self.beep.enabled = false;
        self.hw.set_output_enable(Output::Beep, false);
    }

    // Switches the beep on and auto-disables it after roughly duration_ms,
    // quantized to whole carrier ticks.
    pub fn timed_beep(&mut self, duration_ms: u16) {
        self.beep_countdown = (duration_ms as u32 * TICK_RATE) / 1000;
        self.beep.enabled = true;
        self.hw.set_output_enable(Output::Beep, true);
        self.start_carrier();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    // The carrier interrupt body. Call once per tick while the carrier runs.
    pub fn tick(&mut self) {
        let tone_duty = self.tone.advance();
        let beep_duty = self.beep.advance();

        // Duty registers are written whether or not a channel is enabled;
        // the compare-enable bit gates the physical output.
        self.hw.set_duty(Output::Tone, tone_duty);
        self.hw.set_duty(Output::Beep, beep_duty);

        if self.beep_countdown > 0 {
            self.beep_countdown -= 1;
            if self.beep_countdown == 0 {
                self.beep.enabled = false;
                self.hw.set_output_enable(Output::Beep, false);
            }
        }

        // Power the carrier down when both channels are inactive. Must stay
        // the last action of the tick.
        if self.running && !self.tone.enabled && !self.beep.enabled {
            self.hw.set_carrier_running(false);
            self.running = false;
        }
    }

    fn start_carrier(&mut self) {
        if !self.running {
            self.hw.set_carrier_running(true);
            self.running = true;
        }
    }
}
