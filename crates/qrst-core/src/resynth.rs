//! Additive oscillator resynthesizer (C5): turns the per-octave wavelength
//! and amplitude updates the analyzer emits back into a waveform, one bank
//! of 15 sine oscillators (octaves 1..=15) summed per output sample.
//!
//! Parameter updates only take effect at a zero crossing of the octave's
//! own previous output, so a sudden wavelength or amplitude change never
//! inserts an audible discontinuity.

use crate::HIGHEST_OCTAVE;

/// Wavelength value representing the center of an octave on the resynth
/// side (distinct from [`crate::WAVELENGTH_CENTER`] used when encoding —
/// a deliberately preserved discrepancy between the two halves of the
/// original pipeline; see the crate's design notes).
const RESYNTH_WAVELENGTH_CENTER: i32 = 127;
const SCALE_FOR_WAVELENGTH_WITHIN_OCTAVE: f64 = 1.0 / 128.0;
const BITS_FOR_CENTER_WAVELENGTH: i32 = 7;
const INCREMENT_FOR_TWO_PI: i32 = 1;
const THRESHOLD_FOR_CHANGE_TO_ZERO: f64 = 50.0;
const SCALE_FOR_REDUCTION_TO_ZERO: f64 = 0.5;
const SCALE_TO_OUTPUT_AMPLITUDE: f64 = 64.0;
const MAX_OUTPUT_AMPLITUDE: i32 = (1 << 15) - 1;
const EQUALIZATION_SCALE_AT_TOP_OCTAVE: f64 = 0.1;
const ANGLE_WRAP_THRESHOLD: f64 = 30.0;

/// Calibrates the pitch the oscillator bank produces for a given
/// wavelength unit. The source this is ported from hard-codes this as
/// `fudge_number = -3` and notes the exponent formula still needs
/// correcting to track input pitch exactly; exposing it lets a caller
/// compensate without patching the formula itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResynthConfig {
    pub pitch_calibration: i32,
}

impl Default for ResynthConfig {
    fn default() -> Self {
        ResynthConfig {
            pitch_calibration: -3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Oscillator {
    amplitude_target: f64,
    wavelength_target: i32,
    regeneration_amplitude: f64,
    regeneration_wavelength: i32,
    regeneration_angle: f64,
    previous_sample: f64,
    next_previous_sample: f64,
}

/// Bank of per-octave additive sine oscillators driven by decoded
/// wavelength/amplitude updates.
pub struct Resynthesizer {
    config: ResynthConfig,
    oscillators: [Oscillator; crate::NUM_OCTAVES],
}

impl Resynthesizer {
    pub fn new(config: ResynthConfig) -> Self {
        Resynthesizer {
            config,
            oscillators: [Oscillator::default(); crate::NUM_OCTAVES],
        }
    }

    /// Apply a decoded wavelength/amplitude update for `octave` (expected
    /// in `[1, 15]`; out-of-range octaves are ignored). `wavelength` and
    /// `amplitude` are the raw encoded byte values.
    pub fn update(&mut self, octave: usize, wavelength: u8, amplitude: u8) {
        if octave < 1 || octave > HIGHEST_OCTAVE {
            return;
        }
        let mut amplitude = amplitude as f64;
        if octave == HIGHEST_OCTAVE {
            amplitude *= EQUALIZATION_SCALE_AT_TOP_OCTAVE;
        }
        if amplitude <= 0.0 {
            return;
        }
        let wavelength = wavelength as i32 - RESYNTH_WAVELENGTH_CENTER;
        self.oscillators[octave].amplitude_target = amplitude;
        self.oscillators[octave].wavelength_target = wavelength;
    }

    /// Advance every oscillator by one sample and return the summed,
    /// scaled, clamped output.
    pub fn next_sample(&mut self) -> i16 {
        let mut regenerated = 0.0f64;

        for octave in 1..=HIGHEST_OCTAVE {
            let osc = &mut self.oscillators[octave];

            if osc.regeneration_amplitude == 0.0 && osc.amplitude_target > 0.0 {
                osc.regeneration_amplitude = osc.amplitude_target;
                osc.regeneration_angle = 0.0;
                osc.regeneration_wavelength = osc.wavelength_target;
            }

            let just_crossed_zero = (osc.previous_sample >= 0.0 && osc.next_previous_sample <= 0.0)
                || (osc.previous_sample <= 0.0
                    && osc.next_previous_sample >= 0.0
                    && osc.amplitude_target > 0.0);

            if just_crossed_zero && osc.amplitude_target > 0.0 {
                osc.regeneration_amplitude = osc.amplitude_target;
                osc.regeneration_wavelength = osc.wavelength_target;
            }
            if just_crossed_zero && osc.amplitude_target == 0.0 {
                if osc.regeneration_amplitude <= THRESHOLD_FOR_CHANGE_TO_ZERO {
                    osc.regeneration_amplitude = 0.0;
                } else {
                    osc.regeneration_amplitude *= SCALE_FOR_REDUCTION_TO_ZERO;
                }
            }

            let exponent = (self.config.pitch_calibration
                + INCREMENT_FOR_TWO_PI
                + BITS_FOR_CENTER_WAVELENGTH
                + (octave as i32 - HIGHEST_OCTAVE as i32)) as f64
                - (osc.regeneration_wavelength as f64 * SCALE_FOR_WAVELENGTH_WITHIN_OCTAVE);
            let angle_increment = 2f64.powf(exponent) * std::f64::consts::PI;

            if angle_increment > 0.0 {
                osc.regeneration_angle += angle_increment;
                if osc.regeneration_angle > ANGLE_WRAP_THRESHOLD {
                    osc.regeneration_angle %= 2.0 * std::f64::consts::PI;
                }
            } else {
                osc.regeneration_angle = 0.0;
            }

            let contribution = osc.regeneration_angle.sin() * osc.regeneration_amplitude;
            regenerated += contribution;

            osc.next_previous_sample = osc.previous_sample;
            osc.previous_sample = contribution;
        }

        let output = (regenerated * SCALE_TO_OUTPUT_AMPLITUDE) as i32;
        output.clamp(-MAX_OUTPUT_AMPLITUDE, MAX_OUTPUT_AMPLITUDE) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_bank_produces_silence() {
        let mut r = Resynthesizer::new(ResynthConfig::default());
        assert_eq!(r.next_sample(), 0);
    }

    #[test]
    fn zero_amplitude_update_is_ignored() {
        let mut r = Resynthesizer::new(ResynthConfig::default());
        r.update(5, 127, 0);
        assert_eq!(r.oscillators[5].amplitude_target, 0.0);
    }

    #[test]
    fn out_of_range_octave_update_is_ignored() {
        let mut r = Resynthesizer::new(ResynthConfig::default());
        r.update(0, 127, 200);
        r.update(16, 127, 200);
        assert!(r.oscillators.iter().all(|o| o.amplitude_target == 0.0));
    }

    #[test]
    fn update_starts_a_wave_from_zero_angle_and_produces_output() {
        let mut r = Resynthesizer::new(ResynthConfig::default());
        r.update(8, 127, 200);
        let mut saw_nonzero = false;
        for _ in 0..256 {
            if r.next_sample() != 0 {
                saw_nonzero = true;
                break;
            }
        }
        assert!(saw_nonzero);
    }

    #[test]
    fn output_stays_within_15_bit_clamp() {
        let mut r = Resynthesizer::new(ResynthConfig::default());
        for octave in 1..=HIGHEST_OCTAVE {
            r.update(octave, 64, 255);
        }
        for _ in 0..1000 {
            let s = r.next_sample();
            assert!(s as i32 >= -MAX_OUTPUT_AMPLITUDE && s as i32 <= MAX_OUTPUT_AMPLITUDE);
        }
    }
}
