//! Wavelength/amplitude reporter (C4): every `N` octave-local samples,
//! normalizes the detector's accumulated distance/count/amplitude into a
//! wavelength unit in `[64, 255]` and an amplitude, then resets the
//! accumulators for the next window.

use crate::octave::OctaveState;
use crate::{HIGHEST_OCTAVE, WAVELENGTH_BOTTOM, WAVELENGTH_CENTER, WAVELENGTH_TOP};

/// A raw (pre-clamp, pre-scale) wavelength/amplitude pair emitted by one
/// octave for one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveReport {
    pub wavelength: u8,
    pub amplitude: f64,
}

/// Disabled-by-default overlap-crossover amplitude reduction. The source
/// this is ported from computes this reduction but never actually
/// subtracts it (the relevant lines are dead); here it is wired up for
/// real behind [`crate::analyzer::AnalyzerConfig::crossover_enabled`].
struct CrossoverThresholds {
    begins_overlap_with_higher: i64,
    scale_with_higher: f64,
    begins_overlap_with_lower: i64,
    scale_with_lower: f64,
}

impl CrossoverThresholds {
    fn for_cadence(n: u32) -> Self {
        let n = n as f64;
        let begins_overlap_with_higher = (n * 0.875 * n) as i64;
        let scale_with_higher = n / (begins_overlap_with_higher as f64 - (n * 0.625) as f64);
        let begins_overlap_with_lower = (n * 1.25 * n) as i64;
        let scale_with_lower = n / ((n * 1.75) as i64 as f64 - begins_overlap_with_lower as f64);
        CrossoverThresholds {
            begins_overlap_with_higher,
            scale_with_higher,
            begins_overlap_with_lower,
            scale_with_lower,
        }
    }

    fn reduce(&self, wavelength: i64, n: u32, amplitude: f64) -> f64 {
        let n = n as f64;
        let mut amplitude = amplitude;
        if wavelength < self.begins_overlap_with_higher {
            let reduction = ((self.begins_overlap_with_higher - wavelength) as f64
                * self.scale_with_higher
                / n) as i64 as f64;
            if reduction >= amplitude {
                amplitude = 0.0;
            } else if reduction > 0.0 && reduction < amplitude {
                amplitude -= reduction;
            }
        }
        if wavelength > self.begins_overlap_with_lower {
            let reduction = ((wavelength - self.begins_overlap_with_lower) as f64
                * self.scale_with_lower
                / n) as i64 as f64;
            if reduction >= amplitude {
                amplitude = 0.0;
            } else if reduction > 0.0 && reduction < amplitude {
                amplitude -= reduction;
            }
        }
        amplitude
    }
}

/// Register one octave-local sample and, if this completes a reporting
/// window of `samples_for_report` samples, normalize and reset the
/// accumulators, returning the report.
pub fn tick(
    octave: usize,
    samples_for_report: u32,
    crossover_enabled: bool,
    state: &mut OctaveState,
) -> Option<OctaveReport> {
    state.num_accum += 1;
    if state.num_accum < samples_for_report {
        return None;
    }

    let mut wavelength = if state.count_pt > 0 && state.distance_total > 0 && state.amp_accum > 0.0
    {
        let raw = (WAVELENGTH_CENTER as i64 * state.distance_total)
            / (state.count_pt * crate::CYCLE_DISTANCE_CENTER);
        raw.clamp(WAVELENGTH_BOTTOM as i64, WAVELENGTH_TOP as i64)
    } else {
        state.amp_accum = 0.0;
        0
    };

    let mut amplitude = if state.count_pt > 0 {
        state.amp_accum / state.count_pt as f64
    } else {
        state.amp_accum
    };
    let scale_for_output_amplitude = if octave == HIGHEST_OCTAVE {
        1.0
    } else {
        (1.0f64 / 1.4).powi((HIGHEST_OCTAVE - octave) as i32)
    };
    amplitude *= scale_for_output_amplitude;

    state.reset_accumulators();

    if crossover_enabled {
        let thresholds = CrossoverThresholds::for_cadence(samples_for_report);
        amplitude = thresholds.reduce(wavelength, samples_for_report, amplitude);
    }

    if amplitude < 1.0 {
        wavelength = WAVELENGTH_CENTER as i64;
        amplitude = 0.0;
    }

    Some(OctaveReport {
        wavelength: wavelength as u8,
        amplitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_window_reports_zero_amplitude_and_center_wavelength() {
        let mut state = OctaveState::new(0, 24);
        let mut report = None;
        for _ in 0..24 {
            report = tick(HIGHEST_OCTAVE, 24, false, &mut state);
        }
        let report = report.unwrap();
        assert_eq!(report.amplitude, 0.0);
        assert_eq!(report.wavelength, WAVELENGTH_CENTER);
    }

    #[test]
    fn no_report_before_cadence_elapses() {
        let mut state = OctaveState::new(0, 24);
        for _ in 0..23 {
            assert!(tick(HIGHEST_OCTAVE, 24, false, &mut state).is_none());
        }
    }

    #[test]
    fn matched_cycles_produce_clamped_wavelength() {
        let mut state = OctaveState::new(0, 8);
        state.distance_total = 3;
        state.count_pt = 1;
        state.amp_accum = 500.0;
        let report = tick(HIGHEST_OCTAVE, 8, false, &mut state).unwrap();
        assert_eq!(report.wavelength, WAVELENGTH_CENTER);
        assert!(report.amplitude > 0.0);
    }
}
