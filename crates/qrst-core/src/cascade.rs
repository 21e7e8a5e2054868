//! Octave cascade (C2): propagates each new sample down through the
//! octaves below [`crate::HIGHEST_OCTAVE`], each octave running at half the
//! rate of the one above it, folding in the peak/trough adjustments the
//! detector (C3) deposited on the octave above during a previous tick.

use crate::octave::{OctaveState, Polarity};
use crate::{DELAYED_POINTER, HIGHEST_OCTAVE, NUM_OCTAVES};

/// The single bit of `time_counter` that must be clear for `octave` to be
/// due for an update: `2 ^ (HIGHEST_OCTAVE - octave)`, except the highest
/// octave itself which updates on every call.
pub fn update_period(octave: usize) -> u64 {
    if octave == HIGHEST_OCTAVE {
        1
    } else {
        1u64 << (HIGHEST_OCTAVE - octave)
    }
}

/// Whether `octave` is due for an update at this `time_counter`.
pub fn is_due(octave: usize, time_counter: u64) -> bool {
    octave == HIGHEST_OCTAVE || time_counter % update_period(octave) == 0
}

/// Which of the two interleaved tracks is updated this time, and which is
/// the other (previously updated) track whose samples also feed this
/// octave's filter below [`HIGHEST_OCTAVE`] - 1.
pub fn select_track(octave: usize, time_counter: u64) -> (usize, usize) {
    if octave == HIGHEST_OCTAVE {
        return (0, 1);
    }
    let bit_at_next_higher = (time_counter / update_period(octave)) % 2;
    if bit_at_next_higher == 0 {
        (1, 0)
    } else {
        (0, 1)
    }
}

/// Advance `octave`/`track` by one filtered sample.
///
/// Shifts the window, zeroing the newest adjustment slot, then computes the
/// new most-recent filtered sample:
/// - at [`HIGHEST_OCTAVE`], the raw input sample passes through unfiltered;
/// - at `HIGHEST_OCTAVE - 1`, it is the sum of two delayed samples from
///   track 0 above, plus half the matching peak/trough adjustments;
/// - below that, it is half the sum of four delayed samples (both tracks)
///   from above, plus half the matching adjustments.
///
/// Adjustments are not generally integers (a freshly written adjustment
/// carries its full fractional value until a later write averages and
/// truncates it — see [`crate::octave::Window::apply_adjustment`]), so the
/// `sum + adjustment * 0.5` arithmetic is done in `f64` and truncated
/// toward zero at the end, exactly matching the source's `int(...)` call
/// rather than an integer-only shortcut that would only be valid once
/// every adjustment slot happened to already hold a whole number.
pub fn update_octave(
    octave: usize,
    track: usize,
    other_track: usize,
    current_sample: i32,
    octaves: &mut [OctaveState; NUM_OCTAVES],
) {
    let (lower, upper) = octaves.split_at_mut(octave + 1);
    lower[octave].tracks[track].shift();

    let filtered = if octave == HIGHEST_OCTAVE {
        current_sample
    } else if octave == HIGHEST_OCTAVE - 1 {
        let higher = &upper[0].tracks[0];
        let sum_two = higher.sample(DELAYED_POINTER) + higher.sample(DELAYED_POINTER + 1);
        let sum_adj = higher.adjustment(Polarity::Peak, DELAYED_POINTER)
            + higher.adjustment(Polarity::Trough, DELAYED_POINTER + 1);
        (sum_two as f64 + sum_adj * 0.5).trunc() as i32
    } else {
        let higher_track = &upper[0].tracks[track];
        let higher_other = &upper[0].tracks[other_track];
        let sum_four = higher_track.sample(DELAYED_POINTER)
            + higher_track.sample(DELAYED_POINTER + 1)
            + higher_other.sample(DELAYED_POINTER)
            + higher_other.sample(DELAYED_POINTER + 1);
        let sum_adj = higher_track.adjustment(Polarity::Peak, DELAYED_POINTER)
            + higher_track.adjustment(Polarity::Trough, DELAYED_POINTER + 1)
            + higher_other.adjustment(Polarity::Peak, DELAYED_POINTER)
            + higher_other.adjustment(Polarity::Trough, DELAYED_POINTER + 1);
        (sum_four as f64 / 2.0 + sum_adj * 0.5).trunc() as i32
    };

    lower[octave].tracks[track].set_newest(filtered);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_octave_always_due() {
        assert!(is_due(HIGHEST_OCTAVE, 0));
        assert!(is_due(HIGHEST_OCTAVE, 7));
    }

    #[test]
    fn next_octave_due_every_other_tick() {
        let octave = HIGHEST_OCTAVE - 1;
        assert!(is_due(octave, 0));
        assert!(!is_due(octave, 1));
        assert!(is_due(octave, 2));
    }

    #[test]
    fn track_alternates_below_highest() {
        let octave = HIGHEST_OCTAVE - 1;
        assert_eq!(select_track(octave, 0), (1, 0));
        assert_eq!(select_track(octave, 2), (0, 1));
        assert_eq!(select_track(octave, 4), (1, 0));
    }

    #[test]
    fn highest_octave_passthrough() {
        let mut octaves: [OctaveState; NUM_OCTAVES] =
            std::array::from_fn(|_| OctaveState::new(0, 24));
        update_octave(HIGHEST_OCTAVE, 0, 1, 1234, &mut octaves);
        assert_eq!(
            octaves[HIGHEST_OCTAVE].tracks[0].sample(crate::MOST_RECENT),
            1234
        );
    }

    #[test]
    fn dc_input_stays_dc_through_cascade() {
        let mut octaves: [OctaveState; NUM_OCTAVES] =
            std::array::from_fn(|_| OctaveState::new(1000, 24));
        for t in 0..8 {
            let (track, other) = select_track(HIGHEST_OCTAVE, t as u64);
            update_octave(HIGHEST_OCTAVE, track, other, 1000, &mut octaves);
            for octave in (0..HIGHEST_OCTAVE).rev() {
                if is_due(octave, t as u64) {
                    let (track, other) = select_track(octave, t as u64);
                    update_octave(octave, track, other, 1000, &mut octaves);
                }
            }
        }
        assert_eq!(
            octaves[HIGHEST_OCTAVE - 1].tracks[0].sample(crate::MOST_RECENT),
            2000
        );
    }
}
