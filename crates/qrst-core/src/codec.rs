//! Bit-exact wire format for the compressed wavelength/amplitude tuple
//! stream: a run of delay bytes (escaped for long gaps) followed by a
//! 4-byte update record `[Δt, channel<<4|octave, wavelength, amplitude]`.

use std::io::{self, Read, Write};

use crate::error::QrstError;
use crate::HIGHEST_OCTAVE;

const MAX_8_BIT: u32 = 255;
const MAX_16_BIT: u32 = 65535;
const CHANNEL_SHIFT: u8 = 4;

/// One decoded wavelength/amplitude update, with the number of samples
/// elapsed since the previous record (or since the stream began).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRecord {
    pub delay: u64,
    pub channel: u8,
    pub octave: u8,
    pub wavelength: u8,
    pub amplitude: u8,
}

/// Reads the compressed tuple stream one record at a time.
pub struct Reader<R> {
    inner: R,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader { inner }
    }

    fn read_u8(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Read the next record, accumulating delay across any number of
    /// `0xFF`-prefixed long-delay escapes. Returns `Ok(None)` at a clean
    /// end of stream, and [`QrstError::TruncatedRecord`] if the stream
    /// ends partway through an escape or a record.
    pub fn next_record(&mut self) -> Result<Option<UpdateRecord>, QrstError> {
        let mut delay: u64 = 0;
        loop {
            let first = match self.read_u8().map_err(|_| QrstError::TruncatedRecord)? {
                Some(b) => b,
                None => return Ok(None),
            };

            if first as u32 == MAX_8_BIT {
                let second = self
                    .read_u8()
                    .map_err(|_| QrstError::TruncatedRecord)?
                    .ok_or(QrstError::TruncatedRecord)?;
                if (second as u32) < MAX_8_BIT {
                    delay += second as u64 * (MAX_8_BIT as u64 + 1);
                } else {
                    let third = self
                        .read_u8()
                        .map_err(|_| QrstError::TruncatedRecord)?
                        .ok_or(QrstError::TruncatedRecord)?;
                    delay += third as u64 * (MAX_16_BIT as u64 + 1);
                }
                continue;
            }

            delay += first as u64;

            let mut rest = [0u8; 3];
            self.inner
                .read_exact(&mut rest)
                .map_err(|_| QrstError::TruncatedRecord)?;
            let channel = rest[0] >> CHANNEL_SHIFT;
            let octave = rest[0] & 0x0F;
            return Ok(Some(UpdateRecord {
                delay,
                channel,
                octave,
                wavelength: rest[1],
                amplitude: rest[2],
            }));
        }
    }
}

/// Writes the compressed tuple stream.
pub struct Writer<W> {
    inner: W,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Writer { inner }
    }

    /// Write `delay` as one normal byte if it fits, otherwise as however
    /// many `0xFF`-escaped long-delay extensions are needed, each
    /// followed by a final normal byte for any remainder.
    fn write_delay(&mut self, mut delay: u64) -> io::Result<()> {
        while delay > MAX_8_BIT as u64 {
            self.inner.write_all(&[MAX_8_BIT as u8])?;
            if delay <= MAX_16_BIT as u64 {
                let scaled = delay / (MAX_8_BIT as u64 + 1);
                self.inner.write_all(&[scaled as u8])?;
                delay -= scaled * (MAX_8_BIT as u64 + 1);
            } else {
                let scaled = (delay / (MAX_16_BIT as u64 + 1)) % (MAX_16_BIT as u64 + 1);
                self.inner.write_all(&[MAX_8_BIT as u8])?;
                self.inner.write_all(&[scaled as u8])?;
                delay -= scaled * (MAX_16_BIT as u64 + 1);
            }
        }
        self.inner.write_all(&[delay as u8])
    }

    /// Write one update record: `delay` octave-local samples since the
    /// previous emitted record, then the channel/octave/wavelength/
    /// amplitude tuple.
    pub fn write_record(&mut self, delay: u64, record: UpdateRecord) -> io::Result<()> {
        self.write_delay(delay)?;
        let combined = (record.channel << CHANNEL_SHIFT) | (record.octave & 0x0F);
        self.inner
            .write_all(&[combined, record.wavelength, record.amplitude])
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Quantize a raw accumulated amplitude (as produced by the reporter) and
/// a scaled wavelength into the 8-bit values the wire format carries.
/// The average amplitude is scaled by `2^-10` first, and only then is the
/// result forced up to `1` if it would otherwise be below `1` or the
/// wavelength is below `1` — applying the force-to-1 floor before the
/// scale would zero out any small positive amplitude that the shift alone
/// would otherwise round down to `0`.
pub fn quantize_amplitude(raw_amplitude: i32, samples_for_report: u32, wavelength: u8) -> u8 {
    let mut scaled = (raw_amplitude / samples_for_report as i32) >> 10;
    if scaled < 1 || (wavelength as i32) < 1 {
        scaled = 1;
    }
    scaled = scaled.clamp(-(MAX_8_BIT as i32), MAX_8_BIT as i32);
    scaled as u8
}

/// Whether a decoded record names a channel/octave this decoder
/// understands. Only channel 1 and octaves `1..=15` are meaningful;
/// anything else is skipped rather than coerced.
pub fn is_known_channel_and_octave(channel: u8, octave: u8) -> bool {
    channel == 1 && octave >= 1 && octave as usize <= HIGHEST_OCTAVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_short_delay_record() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        let record = UpdateRecord {
            delay: 12,
            channel: 1,
            octave: 9,
            wavelength: 128,
            amplitude: 40,
        };
        w.write_record(12, record).unwrap();

        let mut r = Reader::new(buf.as_slice());
        let decoded = r.next_record().unwrap().unwrap();
        assert_eq!(decoded, record);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn round_trips_a_delay_needing_one_escape() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        let record = UpdateRecord {
            delay: 600,
            channel: 1,
            octave: 3,
            wavelength: 200,
            amplitude: 10,
        };
        w.write_record(600, record).unwrap();

        let mut r = Reader::new(buf.as_slice());
        let decoded = r.next_record().unwrap().unwrap();
        assert_eq!(decoded.delay, 600);
        assert_eq!(decoded.octave, 3);
    }

    #[test]
    fn round_trips_a_delay_needing_two_escapes() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf);
        let record = UpdateRecord {
            delay: 200_000,
            channel: 1,
            octave: 15,
            wavelength: 64,
            amplitude: 1,
        };
        w.write_record(200_000, record).unwrap();

        let mut r = Reader::new(buf.as_slice());
        let decoded = r.next_record().unwrap().unwrap();
        assert_eq!(decoded.delay, 200_000);
    }

    #[test]
    fn truncated_stream_after_escape_byte_errors() {
        let mut r = Reader::new([0xFFu8].as_slice());
        assert_eq!(r.next_record(), Err(QrstError::TruncatedRecord));
    }

    #[test]
    fn negative_or_subwavelength_amplitude_quantizes_to_tiny_positive() {
        assert_eq!(quantize_amplitude(-500, 24, 128), 1);
        assert_eq!(quantize_amplitude(500, 24, 0), 1);
    }

    #[test]
    fn small_positive_amplitude_just_under_one_rounds_up_to_one_not_zero() {
        // 1000 / 1 * 2^-10 ≈ 0.977, which must still encode as 1, not 0.
        assert_eq!(quantize_amplitude(1000, 1, 128), 1);
    }

    #[test]
    fn amplitude_comfortably_above_one_is_scaled_and_clamped_normally() {
        assert_eq!(quantize_amplitude(300_000, 1, 128), 255);
    }

    #[test]
    fn unknown_channel_or_octave_rejected() {
        assert!(!is_known_channel_and_octave(2, 5));
        assert!(!is_known_channel_and_octave(1, 0));
        assert!(!is_known_channel_and_octave(1, 16));
        assert!(is_known_channel_and_octave(1, 1));
        assert!(is_known_channel_and_octave(1, 15));
    }
}
