//! Reads the compressed wavelength/amplitude tuple stream and drives
//! [`qrst_core::Resynthesizer`], writing raw headerless little-endian
//! 16-bit PCM.

use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use qrst_core::codec::{self, Reader};
use qrst_core::{ResynthConfig, Resynthesizer};

fn usage(program: &str) {
    eprintln!("QRST resynthesizer (v0.1.0)");
    eprintln!("Usage: {} <input.qrst> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --out FILE            Write raw PCM to FILE (default stdout)");
    eprintln!("  --pitch-calibration N Oscillator pitch calibration constant (default -3)");
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return Err("missing input file".into());
    }
    let input_path = &args[1];

    let pitch_calibration: i32 = flag_value(&args, "--pitch-calibration")
        .and_then(|s| s.parse().ok())
        .unwrap_or(-3);
    let mut resynth = Resynthesizer::new(ResynthConfig { pitch_calibration });

    let input: Box<dyn Read> = if input_path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(input_path).map_err(|e| format!("{input_path}: {e}"))?,
        ))
    };
    let mut reader = Reader::new(input);

    let out_path = flag_value(&args, "--out");
    let mut writer: Box<dyn Write> = match out_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("{path}: {e}"))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let mut samples_written: u64 = 0;
    let mut records_applied: u64 = 0;
    let mut records_skipped: u64 = 0;

    loop {
        let record = match reader.next_record().map_err(|e| e.to_string())? {
            Some(r) => r,
            None => break,
        };

        for _ in 0..record.delay {
            let sample = resynth.next_sample();
            writer
                .write_all(&sample.to_le_bytes())
                .map_err(|e| e.to_string())?;
            samples_written += 1;
        }

        if codec::is_known_channel_and_octave(record.channel, record.octave) {
            resynth.update(record.octave as usize, record.wavelength, record.amplitude);
            records_applied += 1;
        } else {
            log::debug!(
                "skipping record with unknown channel {} octave {}",
                record.channel,
                record.octave
            );
            records_skipped += 1;
        }
    }

    writer.flush().map_err(|e| e.to_string())?;
    log::info!(
        "wrote {samples_written} samples from {records_applied} records ({records_skipped} skipped)"
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qrst-resynth: {e}");
            ExitCode::FAILURE
        }
    }
}
