//! Reads raw 16-bit PCM and drives [`qrst_core::QrstAnalyzer`], writing the
//! compressed wavelength/amplitude tuple stream [`qrst_core::codec`]
//! defines. Optionally also writes a tab-separated debug plot of every
//! emitted (octave, wavelength, amplitude) tuple.

use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use qrst_core::codec::{self, UpdateRecord, Writer};
use qrst_core::{AnalyzerConfig, QrstAnalyzer, HIGHEST_OCTAVE, NUM_OCTAVES};

fn usage(program: &str) {
    eprintln!("QRST analyzer / compressor (v0.1.0)");
    eprintln!("Usage: {} <input.raw> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --out FILE       Write compressed stream to FILE (default stdout)");
    eprintln!("  --octaves N      Lowest N octaves to compute, 1-15 (default 7)");
    eprintln!("  --cadence N      Samples between reports per octave (default 24)");
    eprintln!("  --crossover      Enable overlap-crossover amplitude reduction");
    eprintln!("  --tsv FILE       Also write a tab-separated debug plot to FILE");
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

    let num_octaves: u8 = flag_value(&args, "--octaves")
        .and_then(|s| s.parse().ok())
        .unwrap_or(qrst_core::DEFAULT_NUM_OCTAVES);
    let cadence: u32 = flag_value(&args, "--cadence")
        .and_then(|s| s.parse().ok())
        .unwrap_or(qrst_core::DEFAULT_SAMPLES_FOR_REPORT);
    let crossover_enabled = args.iter().any(|a| a == "--crossover");

    let config = AnalyzerConfig {
        num_octaves,
        samples_for_wavelength_measurement: cadence,
        crossover_enabled,
    };
    let mut analyzer = QrstAnalyzer::new(config).map_err(|e| e.to_string())?;

    let mut input: Box<dyn Read> = if input_path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(input_path).map_err(|e| format!("{input_path}: {e}"))?,
        ))
    };

    let out_path = flag_value(&args, "--out");
    let mut writer: Writer<Box<dyn Write>> = Writer::new(match out_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("{path}: {e}"))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    });

    let mut tsv: Option<Box<dyn Write>> = match flag_value(&args, "--tsv") {
        Some(path) => Some(Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("{path}: {e}"))?,
        ))),
        None => None,
    };
    if let Some(w) = tsv.as_mut() {
        writeln!(w, "time\toctave\twavelength\tamplitude").map_err(|e| e.to_string())?;
    }

    let lowest_octave = HIGHEST_OCTAVE + 1 - num_octaves as usize;
    let mut previous_wavelength = [0u8; NUM_OCTAVES];
    let mut previous_amplitude = [0i32; NUM_OCTAVES];
    let mut time_counter: u64 = 0;
    let mut time_count_at_last_info: u64 = 0;

    let mut sample_buf = [0u8; 2];
    loop {
        match input.read_exact(&mut sample_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.to_string()),
        }
        let sample = i16::from_le_bytes(sample_buf) as i32;
        let report = analyzer.process(sample);
        time_counter += 1;

        for octave in lowest_octave..=HIGHEST_OCTAVE {
            let wavelength = report.wavelength_at_octave[octave];
            let amplitude = report.amplitude_at_octave[octave];
            let reported_this_tick = wavelength != 0 || amplitude != 0;
            if !reported_this_tick {
                continue;
            }
            if wavelength == previous_wavelength[octave] && amplitude == previous_amplitude[octave]
            {
                continue;
            }
            previous_wavelength[octave] = wavelength;
            previous_amplitude[octave] = amplitude;

            if let Some(w) = tsv.as_mut() {
                writeln!(w, "{time_counter}\t{octave}\t{wavelength}\t{amplitude}")
                    .map_err(|e| e.to_string())?;
            }

            let quantized = codec::quantize_amplitude(amplitude, cadence, wavelength);
            let delay = time_counter - time_count_at_last_info;
            let record = UpdateRecord {
                delay,
                channel: 1,
                octave: octave as u8,
                wavelength,
                amplitude: quantized,
            };
            writer.write_record(delay, record).map_err(|e| e.to_string())?;
            time_count_at_last_info = time_counter;
        }
    }
    writer.flush().map_err(|e| e.to_string())?;
    log::info!("processed {time_counter} samples across {num_octaves} octaves");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qrst-analyze: {e}");
            ExitCode::FAILURE
        }
    }
}
