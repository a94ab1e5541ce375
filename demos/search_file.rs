//! Example: Search a single time-series file for periodic pulses
//!
//! Usage:
//!   cargo run --release --example search_file -- [options] <file>
//!
//! Writes one line per trial period to stdout (or `--output`) and prints the
//! best trial to stderr. Without a file, searches a synthetic pulse train.

use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use stratum_ffa::io::synthetic::{pulse_train, WhiteNoise};
use stratum_ffa::io::time_series::{load_sample_buffer, write_padded_listing, write_time_series, SampleFormat};
use stratum_ffa::{
    prepare_resolution, prepare_series, search_periods, FoldOutput, ProfileMode, ScoreMethod, SearchConfig,
    TextProfileWriter, TextResultWriter,
};

const USAGE: &str = "Usage: search_file [options] [file]\n\
\n\
--format F      u8 | f32 | sigproc (default: u8)\n\
--low N         Low period in samples (default: 128)\n\
--high N        High period in samples (default: 256)\n\
--loops N       Scan N period doublings from --low instead of --high\n\
--score N       Score method 1-5, 7, 8 or name (default: 1)\n\
--ds N          Preliminary downsamples (default: 0)\n\
--mf N          Matched filter width (default: 0)\n\
--dered         Enable red-noise suppression\n\
--dw N          De-reddening window (default: automatic)\n\
--timenorm      MAD-normalize at every resolution\n\
--output PATH   Trial output (default: stdout)\n\
--profiles PATH Dump folded profiles\n\
--norm-profiles Dump MAD-normalized profiles instead of raw ones\n\
--parrot PATH   Dump the padded input buffer\n\
--original PATH Rewrite the input series in the input format\n\
--original-dr PATH Write the first de-reddened working series (needs --dered)\n\
--samples N     Synthetic series length (default: 65536)\n\
--period N      Synthetic pulse period (default: 200)\n\
--width N       Synthetic pulse width (default: 5)\n";

fn value<T: std::str::FromStr>(args: &mut Vec<String>, flag: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + 'static,
{
    if args.is_empty() {
        return Err(format!("{} requires a value", flag).into());
    }
    Ok(args.remove(0).parse::<T>()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config = SearchConfig::default();
    let mut format = SampleFormat::Unsigned8;
    let mut score = ScoreMethod::MatchedFilter;
    let mut output_path: Option<String> = None;
    let mut profile_path: Option<String> = None;
    let mut parrot_path: Option<String> = None;
    let mut original_path: Option<String> = None;
    let mut dereddened_path: Option<String> = None;
    let mut high: Option<usize> = None;
    let mut loops: Option<u32> = None;
    let mut input: Option<String> = None;
    let (mut samples, mut period, mut width) = (65536usize, 200usize, 5usize);

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--format" => format = value(&mut args, "--format")?,
            "--low" => config.low_period = value(&mut args, "--low")?,
            "--high" => high = Some(value(&mut args, "--high")?),
            "--loops" => loops = Some(value(&mut args, "--loops")?),
            "--score" => score = value(&mut args, "--score")?,
            "--ds" => config.prelim_downsamples = value(&mut args, "--ds")?,
            "--mf" => config.matched_filter_width = value(&mut args, "--mf")?,
            "--dered" => config.red_noise = true,
            "--dw" => config.red_noise_window = Some(value(&mut args, "--dw")?),
            "--timenorm" => config.normalize = true,
            "--output" => output_path = Some(value(&mut args, "--output")?),
            "--profiles" => profile_path = Some(value(&mut args, "--profiles")?),
            "--norm-profiles" => config.profile_mode = ProfileMode::Mad,
            "--parrot" => parrot_path = Some(value(&mut args, "--parrot")?),
            "--original" => original_path = Some(value(&mut args, "--original")?),
            "--original-dr" => dereddened_path = Some(value(&mut args, "--original-dr")?),
            "--samples" => samples = value(&mut args, "--samples")?,
            "--period" => period = value(&mut args, "--period")?,
            "--width" => width = value(&mut args, "--width")?,
            "--help" | "-h" => {
                eprintln!("{}", USAGE);
                return Ok(());
            }
            _ => input = Some(a),
        }
    }

    config.high_period = match (high, loops) {
        (Some(_), Some(_)) => return Err("--high and --loops are mutually exclusive".into()),
        (Some(h), None) => h,
        (None, Some(l)) => 1usize
            .checked_shl(l)
            .and_then(|factor| config.low_period.checked_mul(factor))
            .ok_or("--loops overflows the high period")?,
        (None, None) => config.high_period,
    };
    if dereddened_path.is_some() && !config.red_noise {
        return Err("--original-dr requires --dered".into());
    }

    let source = match &input {
        Some(path) => {
            eprintln!("Reading {} ({})", path, format);
            load_sample_buffer(BufReader::new(File::open(path)?), format, config.padding_factor)?
        }
        None => {
            eprintln!("Generating {} samples (period {}, width {})", samples, period, width);
            let mut buffer = pulse_train(samples, period, width, config.padding_factor)?;
            WhiteNoise::new(1).add_to(&mut buffer, 0.5, 0.0);
            buffer
        }
    };

    if let Some(path) = &parrot_path {
        write_padded_listing(BufWriter::new(File::create(path)?), &source)?;
    }

    if let Some(path) = &original_path {
        eprintln!("Writing copy of the input to {}", path);
        write_time_series(BufWriter::new(File::create(path)?), source.samples(), format)?;
    }

    if let Some(path) = &dereddened_path {
        let prepared = prepare_series(&source, &config)?;
        let first = prepare_resolution(&prepared, &config.scan_params(), 0)?;
        eprintln!("Writing de-reddened series ({} samples) to {}", first.logical_len(), path);
        write_time_series(BufWriter::new(File::create(path)?), first.samples(), format)?;
    }

    let sink: Box<dyn Write> = match &output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut results = TextResultWriter::new(sink);
    let mut profiles = match &profile_path {
        Some(path) => Some(TextProfileWriter::new(BufWriter::new(File::create(path)?))),
        None => None,
    };

    let summary = {
        let mut output = FoldOutput::new(&mut results);
        if let Some(writer) = profiles.as_mut() {
            output = output.with_profiles(writer);
        }
        search_periods(&source, &config, &score, &mut output)?
    };

    results.into_inner()?;
    if let Some(writer) = profiles {
        writer.into_inner()?;
    }

    eprintln!("Search Results:");
    eprintln!("  Trials: {} over {} base periods", summary.trials, summary.base_periods);
    if let Some(best) = summary.best {
        eprintln!(
            "  Best: period {:.4} samples (scale {}) score {:.3} [{}]",
            best.period, best.scale_factor, best.score, score
        );
    }

    Ok(())
}
