//! Peak/trough detector (C3): fits a straight line across a short span of
//! filtered samples, declares a peak (or trough, for mirrored input) when
//! every sample between the span's endpoints sits clearly below that line,
//! then derives an adjustment that will be fed back into the cascade (C2)
//! to damp this cycle out of the next-lower octave.
//!
//! Troughs are detected by the same code as peaks, just with all samples
//! negated first (`Polarity::sign`), so a trough becomes a peak in the
//! mirrored view.

use crate::octave::{OctaveState, Polarity};
use crate::{MAX_RECENT_PT_DISTANCE, MOST_RECENT, NEXT_MOST_RECENT};

const CANDIDATE_DISTANCES: [i64; 3] = [2, 3, 4];
const GAP_THRESHOLD_SCALE: f64 = 0.01;
const CROSSING_THRESHOLD_SCALE: f64 = 0.2;

struct Match {
    distance: i64,
    largest_gap: f64,
    line_value_at_most_recent: f64,
}

/// Try distances 2, 3, and 4 in order and return the first that fits a
/// peak pattern: a straight line through the two endpoints with every
/// other sample in the span strictly below it, and no sample closer to
/// the line than 1% of the largest gap found.
fn find_match(track_samples: &[i32], polarity: Polarity) -> Option<Match> {
    let sign = polarity.sign();
    for &distance in &CANDIDATE_DISTANCES {
        let number_of_samples_involved = distance + 3;
        let recent = track_samples[NEXT_MOST_RECENT] as f64 * sign;
        let older = track_samples[(NEXT_MOST_RECENT as i64 - distance) as usize] as f64 * sign;
        let slope = (recent - older) / distance as f64;
        let line_value_at_most_recent = recent + slope;

        let mut largest_gap = 0.0f64;
        let mut gaps = Vec::with_capacity(number_of_samples_involved as usize);
        let mut matched = true;
        let start = MOST_RECENT as i64 - number_of_samples_involved + 1;
        for sample_pointer in start..=MOST_RECENT as i64 {
            if sample_pointer == NEXT_MOST_RECENT as i64
                || sample_pointer == NEXT_MOST_RECENT as i64 - distance
            {
                continue;
            }
            let value = track_samples[sample_pointer as usize] as f64 * sign;
            let distance_back = MOST_RECENT as i64 - sample_pointer;
            let gap = value - (line_value_at_most_recent - slope * distance_back as f64);
            if gap >= 0.0 {
                matched = false;
                break;
            }
            let abs_gap = gap.abs();
            if abs_gap > largest_gap {
                largest_gap = abs_gap;
            }
            gaps.push(abs_gap);
        }
        if !matched {
            continue;
        }
        let threshold = largest_gap * GAP_THRESHOLD_SCALE;
        if gaps.iter().any(|&g| g < threshold) {
            continue;
        }
        return Some(Match {
            distance,
            largest_gap,
            line_value_at_most_recent,
        });
    }
    None
}

/// Write (or merge with) the feedback adjustment for the span just
/// matched. The multiplier is the same regardless of position in the span
/// — the original source resets it to `-sign` at both endpoints, which
/// makes it constant for the whole span rather than alternating as the
/// surrounding comments describe; that behavior is preserved here.
///
/// The raw, untruncated value is passed to [`crate::octave::Window::apply_adjustment`] —
/// the source only truncates on the averaging branch, not on a fresh
/// write, so truncating here would lose precision the cascade is meant to
/// still see.
fn apply_feedback(window: &mut crate::octave::Window, polarity: Polarity, m: &Match) {
    let multiplier = -polarity.sign();
    let half_amplitude = (m.largest_gap / 2.0).abs();
    let value = half_amplitude * multiplier;
    let start = (NEXT_MOST_RECENT as i64 - m.distance) as usize;
    for offset in start..=NEXT_MOST_RECENT {
        window.apply_adjustment(polarity, offset, value);
    }
}

/// Bridge a multi-span gap: if a fresh match follows another recent match
/// of the same polarity closely enough, look for line crossings between
/// them and count any extra cycles hidden in the gap.
#[allow(clippy::too_many_arguments)]
fn extend_multi_cycle(
    track_samples: &[i32],
    polarity: Polarity,
    m: &Match,
    state: &mut OctaveState,
) {
    let idx = match polarity {
        Polarity::Peak => 0,
        Polarity::Trough => 1,
    };
    let distance_to_recent = state.recent_pt_distance[idx] as i64;
    if distance_to_recent - m.distance > 2 && distance_to_recent < MAX_RECENT_PT_DISTANCE as i64 {
        let sign = polarity.sign();
        let half_amplitude_at_recent = state.recent_pt_amp[idx] / 2.0;
        let center_of_most_recent =
            (track_samples[NEXT_MOST_RECENT] as f64 - half_amplitude_at_recent) * sign;
        let center_of_previous = (m.line_value_at_most_recent - half_amplitude_at_recent) * sign;
        let slope = (center_of_most_recent - center_of_previous) / distance_to_recent as f64;

        let mut count_of_line_crossings: i64 = 1;
        let mut direction_needed: f64 = -1.0;
        let threshold_for_crossings = CROSSING_THRESHOLD_SCALE * half_amplitude_at_recent;
        for offset in m.distance..=distance_to_recent {
            let sample_pointer = MOST_RECENT as i64 - offset;
            let distance_from_line = center_of_most_recent
                - slope * offset as f64
                - (track_samples[sample_pointer as usize] as f64 * sign);
            if distance_from_line * direction_needed > threshold_for_crossings {
                count_of_line_crossings += 1;
                direction_needed *= -1.0;
            }
        }
        let cycle_count = count_of_line_crossings / 2;
        let additional_distance = distance_to_recent - m.distance - 1;
        state.distance_total += additional_distance;
        state.count_pt += cycle_count;
        state.amp_accum += m.largest_gap * cycle_count as f64;
        state.recent_pt_distance[idx] = 0;
        state.recent_pt_amp[idx] = 0.0;
    }
    state.recent_pt_amp[idx] = m.largest_gap;
    state.recent_pt_distance[idx] = 0;
}

/// Run peak detection, then trough detection, for the track just updated
/// by the cascade at `octave`. Matches update `state`'s distance/count/
/// amplitude accumulators and deposit feedback adjustments into the
/// track's window for the cascade to consume on the next tick.
pub fn detect_and_adjust(track: usize, state: &mut OctaveState) {
    for &polarity in &[Polarity::Peak, Polarity::Trough] {
        let idx = match polarity {
            Polarity::Peak => 0,
            Polarity::Trough => 1,
        };
        let samples: Vec<i32> = (0..crate::WINDOW_LEN)
            .map(|i| state.tracks[track].sample(i))
            .collect();

        if let Some(m) = find_match(&samples, polarity) {
            log::trace!(
                "track {track}: matched {polarity:?} at distance {} (largest_gap {:.1})",
                m.distance,
                m.largest_gap
            );
            state.distance_total += m.distance;
            state.count_pt += 1;
            state.amp_accum += m.largest_gap;

            apply_feedback(&mut state.tracks[track], polarity, &m);
            extend_multi_cycle(&samples, polarity, &m, state);
        }
        state.recent_pt_distance[idx] =
            (state.recent_pt_distance[idx] + 1).min(MAX_RECENT_PT_DISTANCE as u32 + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octave::OctaveState;
    use crate::WINDOW_LEN;

    fn ramp_into(state: &mut OctaveState, track: usize, values: &[i32]) {
        for &v in values {
            state.tracks[track].shift();
            state.tracks[track].set_newest(v);
        }
    }

    #[test]
    fn flat_signal_never_matches() {
        let mut state = OctaveState::new(0, 24);
        ramp_into(&mut state, 0, &[0; WINDOW_LEN]);
        detect_and_adjust(0, &mut state);
        assert_eq!(state.count_pt, 0);
    }

    #[test]
    fn clean_peak_is_detected_at_distance_three() {
        let mut state = OctaveState::new(0, 24);
        // Rising, clear peak, falling: samples around next_most_recent
        // form an unambiguous distance-3 peak.
        let values: [i32; WINDOW_LEN] = [
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1000, 1500, 1000, 400,
        ];
        ramp_into(&mut state, 0, &values);
        detect_and_adjust(0, &mut state);
        assert!(state.count_pt >= 1);
        assert!(state.amp_accum > 0.0);
    }

    #[test]
    fn recent_pt_distance_never_exceeds_clamp() {
        let mut state = OctaveState::new(0, 24);
        for _ in 0..(MAX_RECENT_PT_DISTANCE as u32 + 10) {
            ramp_into(&mut state, 0, &[0]);
            detect_and_adjust(0, &mut state);
        }
        assert!(state.recent_pt_distance[0] <= MAX_RECENT_PT_DISTANCE as u32 + 1);
        assert!(state.recent_pt_distance[1] <= MAX_RECENT_PT_DISTANCE as u32 + 1);
    }
}
