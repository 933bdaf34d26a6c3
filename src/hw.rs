// Hardware access layer for the tone outputs.
//
// The engine drives the PWM peripheral through the TonePwm trait, so the same
// DDS and tick logic runs against real timer registers on target hardware or
// against the SoftPwm model on a host.

use bitflags::bitflags;

// The two PWM compare channels sharing the carrier timer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Output {
    Tone,
    Beep,
}

bitflags! {
    #[derive(Default)]
    pub struct OutputEnable: u8 {
        const TONE = bit!(0);
        const BEEP = bit!(1);
    }
}

impl Output {
    fn enable_bit(self) -> OutputEnable {
        match self {
            Output::Tone => OutputEnable::TONE,
            Output::Beep => OutputEnable::BEEP,
        }
    }

    fn index(self) -> usize {
        match self {
            Output::Tone => 0,
            Output::Beep => 1,
        }
    }
}

pub trait TonePwm {
    // Put the output pins in PWM drive mode and configure the carrier timer.
    // The carrier is left stopped.
    fn configure(&mut self);

    // Stop the carrier clock and return the pins to a non-driving mode.
    fn release(&mut self);

    // Write an 8-bit compare value. Happens every tick, enabled or not.
    fn set_duty(&mut self, out: Output, duty: u8);

    // Gate the physical output of one channel.
    fn set_output_enable(&mut self, out: Output, on: bool);

    // Start or stop the carrier timer's count-enable.
    fn set_carrier_running(&mut self, on: bool);
}

// Software model of the PWM peripheral: latches everything the engine writes,
// and mixes the enabled outputs into a signed sample for host-side playback.
pub struct SoftPwm {
    duty:    [u8; 2],
    enable:  OutputEnable,
    running: bool,
    driving: bool,
}

impl SoftPwm {
    pub fn new() -> Self {
        SoftPwm {
            duty:    [0; 2],
            enable:  OutputEnable::default(),
            running: false,
            driving: false,
        }
    }

    pub fn duty(&self, out: Output) -> u8 {
        self.duty[out.index()]
    }

    pub fn output_enabled(&self, out: Output) -> bool {
        self.enable.contains(out.enable_bit())
    }

    pub fn carrier_running(&self) -> bool {
        self.running
    }

    pub fn pins_driving(&self) -> bool {
        self.driving
    }

    // Mix of the enabled outputs, scaled into [-1.0, 1.0]. A disabled channel
    // contributes silence no matter what its duty register holds.
    pub fn mixed_sample(&self) -> f32 {
        let tone = if self.output_enabled(Output::Tone) {
            duty_to_f32(self.duty[0])
        } else {
            0.0
        };
        let beep = if self.output_enabled(Output::Beep) {
            duty_to_f32(self.duty[1])
        } else {
            0.0
        };

        (tone + beep) * 0.5
    }
}

impl TonePwm for SoftPwm {
    fn configure(&mut self) {
        self.driving = true;
        self.running = false;
    }

    fn release(&mut self) {
        self.running = false;
        self.driving = false;
    }

    fn set_duty(&mut self, out: Output, duty: u8) {
        self.duty[out.index()] = duty;
    }

    fn set_output_enable(&mut self, out: Output, on: bool) {
        self.enable.set(out.enable_bit(), on);
    }

    fn set_carrier_running(&mut self, on: bool) {
        self.running = on;
    }
}

fn duty_to_f32(duty: u8) -> f32 {
    (duty as f32 - 127.5) / 127.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latches_duty_and_enable() {
        let mut pwm = SoftPwm::new();
        pwm.configure();

        pwm.set_duty(Output::Tone, 200);
        pwm.set_output_enable(Output::Tone, true);

        assert_eq!(pwm.duty(Output::Tone), 200);
        assert!(pwm.output_enabled(Output::Tone));
        assert!(!pwm.output_enabled(Output::Beep));
    }

    #[test]
    fn test_disabled_output_is_silent() {
        let mut pwm = SoftPwm::new();
        pwm.configure();

        pwm.set_duty(Output::Tone, 255);
        pwm.set_duty(Output::Beep, 0);

        assert_eq!(pwm.mixed_sample(), 0.0);

        pwm.set_output_enable(Output::Tone, true);
        assert!(pwm.mixed_sample() > 0.4);
    }

    #[test]
    fn test_release_stops_driving() {
        let mut pwm = SoftPwm::new();
        pwm.configure();
        assert!(pwm.pins_driving());

        pwm.set_carrier_running(true);
        pwm.release();

        assert!(!pwm.carrier_running());
        assert!(!pwm.pins_driving());
    }
}
