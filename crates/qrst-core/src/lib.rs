//! # qrst-core
//!
//! Quick Rolling Spectral Transform (QRST) — a streaming, sample-at-a-time
//! spectral analyzer (v0.1.0).
//!
//! Decomposes a one-dimensional integer waveform into per-octave
//! (wavelength, amplitude) estimates using an octave cascade of
//! down-averaging filters, a peak/trough distance detector, and a
//! wavelength/amplitude reporter. A symmetric resynthesizer drives a bank
//! of additive sine oscillators from the compressed tuple stream this
//! analyzer produces.
//!
//! ## Architecture
//!
//! - [`octave::Window`] / [`octave::OctaveState`] — per-octave, per-track
//!   sliding window of filtered samples and pending peak/trough
//!   adjustments (C1)
//! - [`cascade`] — the top-down octave filtering pass (C2)
//! - [`detector`] — peak/trough pattern matching and adjustment feedback
//!   (C3)
//! - [`reporter`] — wavelength/amplitude normalization and emission
//!   cadence (C4)
//! - [`analyzer::QrstAnalyzer`] — ties C1–C4 together behind
//!   [`analyzer::QrstAnalyzer::process`]
//! - [`resynth::Resynthesizer`] — additive oscillator bank driven by the
//!   compressed tuple stream (C5)
//! - [`codec`] — the bit-exact compressed wire format shared by C4's
//!   consumer and C5's producer side
//! - [`error::QrstError`] — the error taxonomy

pub mod analyzer;
pub mod cascade;
pub mod codec;
pub mod detector;
pub mod error;
pub mod octave;
pub mod reporter;
pub mod resynth;

pub use analyzer::{AnalyzerConfig, QrstAnalyzer, Report};
pub use error::QrstError;
pub use resynth::{Resynthesizer, ResynthConfig};

/// Highest octave index. Receives every input sample. Must not change.
pub const HIGHEST_OCTAVE: usize = 15;
/// Number of octave slots (0..=15).
pub const NUM_OCTAVES: usize = HIGHEST_OCTAVE + 1;
/// Number of interleaved tracks per octave below [`HIGHEST_OCTAVE`].
pub const NUM_TRACKS: usize = 2;
/// How many recent samples (beyond the minimum 8) each octave/track window
/// retains, bounding how far back the multi-cycle detector can look.
pub const MAX_RECENT_PT_DISTANCE: usize = 12;
/// Sliding window length per (octave, track): `8 + MAX_RECENT_PT_DISTANCE`.
pub const WINDOW_LEN: usize = 8 + MAX_RECENT_PT_DISTANCE;
/// Index of the most recently written sample in a window.
pub const MOST_RECENT: usize = WINDOW_LEN - 1;
/// Index of the second most recently written sample in a window.
pub const NEXT_MOST_RECENT: usize = WINDOW_LEN - 2;
/// Offset used to read delayed samples from the next-higher octave.
pub const DELAYED_POINTER: usize = 1;

/// Canonical wavelength unit lower bound (bottom of an octave).
pub const WAVELENGTH_BOTTOM: u8 = 64;
/// Canonical wavelength unit center of an octave.
pub const WAVELENGTH_CENTER: u8 = 128;
/// Canonical wavelength unit upper bound (top of an octave).
pub const WAVELENGTH_TOP: u8 = 255;
/// Cycle distance at the center of an octave (d spans {2,3,4}).
pub const CYCLE_DISTANCE_CENTER: i64 = 3;

/// Minimum legal emission cadence. `N < 8` is rejected.
pub const MIN_SAMPLES_FOR_REPORT: u32 = 8;
/// Default emission cadence (octave-local samples between reports).
pub const DEFAULT_SAMPLES_FOR_REPORT: u32 = 24;
/// Default count of lowest octaves computed (piano has 7 octaves).
pub const DEFAULT_NUM_OCTAVES: u8 = 7;
