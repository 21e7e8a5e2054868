//! Synthetic test-signal generator for QRST (v0.1.0).
//!
//! Writes raw little-endian 16-bit PCM, headerless, to stdout or a file.
//!
//! Scenarios:
//! - `dc`: a constant sample value
//! - `square`: a step from one constant value to another partway through
//! - `sweep`: an offset sine wave whose angle increment ramps linearly
//!   from pi/2 down to pi/256 over the run, i.e. from a short wavelength
//!   to a long one

use std::env;
use std::f64::consts::PI;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

fn usage(program: &str) {
    eprintln!("QRST test-signal generator");
    eprintln!("Usage: {} <scenario> [options]", program);
    eprintln!();
    eprintln!("Scenarios: dc  square  sweep");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --samples N      Number of samples to generate (default 20000)");
    eprintln!("  --out FILE       Write to FILE instead of stdout");
    eprintln!("  --offset N       DC offset added to every sample (default 2000)");
    eprintln!("  --amplitude N    Peak amplitude (default 12000)");
    eprintln!("  --level-a N      'square': first level (default offset - amplitude/2)");
    eprintln!("  --level-b N      'square': second level (default offset + amplitude/2)");
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn generate_dc(samples: u32, offset: i32) -> Vec<i16> {
    vec![offset.clamp(i16::MIN as i32, i16::MAX as i32) as i16; samples as usize]
}

fn generate_square(samples: u32, level_a: i32, level_b: i32) -> Vec<i16> {
    let midpoint = samples / 2;
    (0..samples)
        .map(|t| {
            let level = if t < midpoint { level_a } else { level_b };
            level.clamp(i16::MIN as i32, i16::MAX as i32) as i16
        })
        .collect()
}

fn generate_sweep(samples: u32, offset: i32, amplitude: i32) -> Vec<i16> {
    let segment_length = samples as f64 + 1.0;
    let starting_wavelength_increment = PI / 2.0;
    let ending_wavelength_increment = PI / 256.0;
    let mut angle = 0.0f64;
    let mut out = Vec::with_capacity(samples as usize);
    for t in 0..samples {
        let time_count_within_segment = (t % samples.max(1)) as f64;
        let wavelength_increment = ((time_count_within_segment * ending_wavelength_increment)
            + ((segment_length - time_count_within_segment) * starting_wavelength_increment))
            / segment_length;
        angle += wavelength_increment;
        let sample = offset as f64 + amplitude as f64 * angle.sin();
        out.push((sample as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    out
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return Err("missing scenario".into());
    }
    let scenario = args[1].as_str();

    let samples: u32 = flag_value(&args, "--samples")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20_000);
    let offset: i32 = flag_value(&args, "--offset")
        .and_then(|s| s.parse().ok())
        .unwrap_or(2000);
    let amplitude: i32 = flag_value(&args, "--amplitude")
        .and_then(|s| s.parse().ok())
        .unwrap_or(12_000);
    let level_a: i32 = flag_value(&args, "--level-a")
        .and_then(|s| s.parse().ok())
        .unwrap_or(offset - amplitude / 2);
    let level_b: i32 = flag_value(&args, "--level-b")
        .and_then(|s| s.parse().ok())
        .unwrap_or(offset + amplitude / 2);

    let pcm = match scenario {
        "dc" => generate_dc(samples, offset),
        "square" => generate_square(samples, level_a, level_b),
        "sweep" => generate_sweep(samples, offset, amplitude),
        other => return Err(format!("unknown scenario: {other}")),
    };

    let out_path = flag_value(&args, "--out");
    let mut writer: Box<dyn Write> = match out_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("{path}: {e}"))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    for sample in pcm {
        writer
            .write_all(&sample.to_le_bytes())
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;

    log::info!("generated {samples} samples for scenario '{scenario}'");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qrst-gen: {e}");
            ExitCode::FAILURE
        }
    }
}
