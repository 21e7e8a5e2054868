//! Ties the octave cascade (C2), peak/trough detector (C3), and reporter
//! (C4) together behind a per-sample [`QrstAnalyzer::process`] call.

use crate::error::QrstError;
use crate::octave::OctaveState;
use crate::{cascade, detector, reporter};
use crate::{
    DEFAULT_NUM_OCTAVES, DEFAULT_SAMPLES_FOR_REPORT, HIGHEST_OCTAVE, MIN_SAMPLES_FOR_REPORT,
    NUM_OCTAVES,
};

/// Tunable parameters for one analyzer instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// How many of the lowest octaves (counted down from octave 15) to
    /// compute. Must be in `[1, 15]`.
    pub num_octaves: u8,
    /// Octave-local samples between wavelength/amplitude reports. Must be
    /// at least [`MIN_SAMPLES_FOR_REPORT`].
    pub samples_for_wavelength_measurement: u32,
    /// Whether to apply the overlap-crossover amplitude reduction at the
    /// edges of each octave's wavelength range.
    pub crossover_enabled: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            num_octaves: DEFAULT_NUM_OCTAVES,
            samples_for_wavelength_measurement: DEFAULT_SAMPLES_FOR_REPORT,
            crossover_enabled: false,
        }
    }
}

impl AnalyzerConfig {
    fn validate(&self) -> Result<(), QrstError> {
        if self.num_octaves < 1 || self.num_octaves as usize > HIGHEST_OCTAVE {
            return Err(QrstError::InvalidParameter(
                "num_octaves must be in [1, 15]",
            ));
        }
        if self.samples_for_wavelength_measurement < MIN_SAMPLES_FOR_REPORT {
            return Err(QrstError::InvalidParameter(
                "samples_for_wavelength_measurement must be >= 8",
            ));
        }
        Ok(())
    }

    fn lowest_octave(&self) -> usize {
        HIGHEST_OCTAVE + 1 - self.num_octaves as usize
    }
}

/// One octave/wavelength/amplitude result per octave computed this tick;
/// octaves outside the configured range, or not due for a report this
/// tick, report a wavelength/amplitude of `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub wavelength_at_octave: [u8; NUM_OCTAVES],
    pub amplitude_at_octave: [i32; NUM_OCTAVES],
}

impl Default for Report {
    fn default() -> Self {
        Report {
            wavelength_at_octave: [0; NUM_OCTAVES],
            amplitude_at_octave: [0; NUM_OCTAVES],
        }
    }
}

/// Streaming, sample-at-a-time spectral analyzer.
pub struct QrstAnalyzer {
    config: AnalyzerConfig,
    time_counter: u64,
    first_call: bool,
    octaves: Vec<OctaveState>,
}

impl QrstAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, QrstError> {
        config.validate()?;
        Ok(QrstAnalyzer {
            config,
            time_counter: 0,
            first_call: true,
            octaves: Vec::new(),
        })
    }

    /// Re-parameterize the analyzer. Resets all cascade, detector, and
    /// reporter state — the next [`QrstAnalyzer::process`] call re-seeds
    /// every octave's window with the first sample it receives, exactly as
    /// on construction, so no stale state leaks across the change.
    ///
    /// Re-parameterizing with a config identical to the current one is a
    /// no-op: it returns early without touching `time_counter`,
    /// `first_call`, or `octaves`.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> Result<(), QrstError> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        self.config = config;
        self.time_counter = 0;
        self.first_call = true;
        self.octaves.clear();
        log::debug!("analyzer reconfigured: {:?}", config);
        Ok(())
    }

    pub fn config(&self) -> AnalyzerConfig {
        self.config
    }

    /// Feed one raw input sample and advance the cascade by one tick.
    pub fn process(&mut self, sample: i32) -> Report {
        if self.first_call {
            self.first_call = false;
            self.octaves = (0..NUM_OCTAVES)
                .map(|_| OctaveState::new(sample, self.config.samples_for_wavelength_measurement))
                .collect();
        }

        self.time_counter += 1;
        if self.time_counter > 1u64 << (HIGHEST_OCTAVE * 4) {
            self.time_counter = 0;
        }

        let lowest_octave = self.config.lowest_octave();
        let mut report = Report::default();

        for octave in (lowest_octave..=HIGHEST_OCTAVE).rev() {
            if !cascade::is_due(octave, self.time_counter) {
                continue;
            }
            let (track, other_track) = cascade::select_track(octave, self.time_counter);

            let octaves: &mut [OctaveState; NUM_OCTAVES] = self
                .octaves
                .as_mut_slice()
                .try_into()
                .expect("octaves always holds exactly NUM_OCTAVES entries");
            cascade::update_octave(octave, track, other_track, sample, octaves);
            detector::detect_and_adjust(track, &mut octaves[octave]);

            if let Some(r) = reporter::tick(
                octave,
                self.config.samples_for_wavelength_measurement,
                self.config.crossover_enabled,
                &mut octaves[octave],
            ) {
                report.wavelength_at_octave[octave] = r.wavelength;
                report.amplitude_at_octave[octave] = r.amplitude as i32;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_small_cadence() {
        let config = AnalyzerConfig {
            samples_for_wavelength_measurement: 7,
            ..Default::default()
        };
        assert_eq!(
            QrstAnalyzer::new(config).unwrap_err(),
            QrstError::InvalidParameter("samples_for_wavelength_measurement must be >= 8")
        );
    }

    #[test]
    fn rejects_out_of_range_octave_count() {
        let config = AnalyzerConfig {
            num_octaves: 0,
            ..Default::default()
        };
        assert!(QrstAnalyzer::new(config).is_err());

        let config = AnalyzerConfig {
            num_octaves: 16,
            ..Default::default()
        };
        assert!(QrstAnalyzer::new(config).is_err());
    }

    #[test]
    fn dc_signal_eventually_reports_center_wavelength_and_silence() {
        let mut analyzer = QrstAnalyzer::new(AnalyzerConfig {
            num_octaves: 1,
            samples_for_wavelength_measurement: 8,
            crossover_enabled: false,
        })
        .unwrap();
        let mut last = Report::default();
        for _ in 0..64 {
            last = analyzer.process(1000);
        }
        assert_eq!(last.wavelength_at_octave[HIGHEST_OCTAVE], 128);
        assert_eq!(last.amplitude_at_octave[HIGHEST_OCTAVE], 0);
    }

    #[test]
    fn reconfigure_with_identical_config_is_a_no_op() {
        let mut analyzer = QrstAnalyzer::new(AnalyzerConfig::default()).unwrap();
        for i in 0..10 {
            analyzer.process(((i % 5) * 100) as i32);
        }
        let time_counter_before = analyzer.time_counter;
        let first_call_before = analyzer.first_call;
        let octave_count_before = analyzer.octaves.len();

        analyzer.reconfigure(AnalyzerConfig::default()).unwrap();

        assert_eq!(analyzer.time_counter, time_counter_before);
        assert_eq!(analyzer.first_call, first_call_before);
        assert_eq!(analyzer.octaves.len(), octave_count_before);
    }

    #[test]
    fn reconfigure_resets_state() {
        let mut analyzer = QrstAnalyzer::new(AnalyzerConfig::default()).unwrap();
        for i in 0..50 {
            analyzer.process(((i % 7) * 500) as i32);
        }
        analyzer
            .reconfigure(AnalyzerConfig {
                num_octaves: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(analyzer.config().num_octaves, 3);
        // First post-reconfigure call re-seeds state without panicking.
        let _ = analyzer.process(0);
    }
}
