use super::table;

// Tick rate the sine table was authored for, and the rate the carrier timer
// actually achieves (42MHz timer clock, 1:10 prescaler, 256-count period).
pub const NOMINAL_SAMPLE_RATE: f32 = 16384.0;
pub const ACTUAL_SAMPLE_RATE: f32 = 16406.25;

// Frequency of the sinewave stored in the table when stepped one entry per tick.
const BASE_SINE_FREQ: u32 = 64;

// The realizable carrier rate is slightly above nominal, which would leave
// every output sharp by the same ratio. Scaling the target frequency by this
// factor cancels the error.
const FREQ_CORR_FACTOR: f32 = NOMINAL_SAMPLE_RATE / ACTUAL_SAMPLE_RATE;

// Convert a target frequency to a 16.16 fixed-point phase increment per tick.
// A zero frequency gives a zero increment, which freezes the phase: callers
// silence a channel by disabling it, not by setting 0Hz.
pub fn to_increment(hz: f32) -> u32 {
    let dividend = hz * FREQ_CORR_FACTOR * 65536.0;
    (dividend as u32) / BASE_SINE_FREQ
}

// One DDS channel: a free-wrapping 32-bit phase accumulator stepped by a
// fixed increment each carrier tick, with the upper table-index bits of the
// phase selecting the duty sample.
pub struct ToneChannel {
    pub enabled: bool,
    incr:        u32,
    accum:       u32,
}

impl ToneChannel {
    pub fn new() -> Self {
        ToneChannel {
            enabled: false,
            incr:    0,
            accum:   0,
        }
    }

    pub fn set_frequency(&mut self, hz: f32) {
        self.incr = to_increment(hz);
    }

    // One carrier tick: emit the duty sample for the current phase, then step
    // the phase. Wraps modulo 2^32, never an overflow error.
    pub fn advance(&mut self) -> u8 {
        let duty = table::sample(((self.accum >> 16) & 0xFF) as u8);
        self.accum = self.accum.wrapping_add(self.incr);
        duty
    }

    #[cfg(test)]
    fn with_increment(incr: u32) -> Self {
        ToneChannel {
            enabled: false,
            incr:    incr,
            accum:   0,
        }
    }

    #[cfg(test)]
    fn phase(&self) -> u32 {
        self.accum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_monotonic() {
        let freqs = [0.0, 67.0, 88.5, 123.0, 151.4, 250.3, 440.0, 1000.0, 3000.0];

        let mut prev = 0;
        for &hz in freqs.iter() {
            let incr = to_increment(hz);
            assert!(incr >= prev, "{}Hz: {} < {}", hz, incr, prev);
            prev = incr;
        }
    }

    #[test]
    fn test_zero_frequency_freezes_phase() {
        let mut ch = ToneChannel::new();
        ch.set_frequency(0.0);

        let first = ch.advance();
        for _ in 0..100 {
            assert_eq!(ch.advance(), first);
        }
        assert_eq!(ch.phase(), 0);
    }

    #[test]
    fn test_phase_wraparound_closure() {
        // 2^24 divides 2^32 exactly 256 times.
        let mut ch = ToneChannel::with_increment(1 << 24);
        for _ in 0..256 {
            ch.advance();
        }
        assert_eq!(ch.phase(), 0);
    }

    #[test]
    fn test_increment_matches_fixed_point_formula() {
        // 67Hz CTCSS: floor(67 * corr * 65536) / 64, all float until the
        // final truncation.
        let expected = ((67.0f32 * FREQ_CORR_FACTOR * 65536.0) as u32) / 64;
        assert_eq!(to_increment(67.0), expected);
        assert!(expected > 65536, "67Hz crosses one table entry per tick");
    }

    #[test]
    fn test_advance_walks_the_table() {
        // One table entry per tick.
        let mut ch = ToneChannel::with_increment(1 << 16);
        for i in 0..=255u8 {
            assert_eq!(ch.advance(), table::sample(i));
        }
        // And wraps back to the start.
        assert_eq!(ch.advance(), table::sample(0));
    }
}
