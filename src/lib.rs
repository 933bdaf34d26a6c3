// PWM tone generation for radio transceivers: a continuous sub-audible CTCSS
// tone and an independent audible beep, both synthesized as duty-cycle
// sinewaves from a shared carrier tick.

#[macro_use]
mod utils;

mod hw;
mod tones;

pub mod fmp;

pub use hw::{
    Output,
    OutputEnable,
    SoftPwm,
    TonePwm
};

pub use tones::{
    to_increment,
    ToneGen,
    ACTUAL_SAMPLE_RATE,
    NOMINAL_SAMPLE_RATE,
    TICK_RATE
};
