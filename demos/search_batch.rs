//! Example: Search multiple time-series files in parallel
//!
//! Usage:
//!   cargo run --release --example search_batch -- [--jobs N] [--json] [--format F] [--low N] [--high N] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each search is still single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::time::Instant;
use stratum_ffa::io::time_series::{load_sample_buffer, SampleFormat};
use stratum_ffa::{
    search_periods, FoldOutput, ResultSink, ScanSummary, ScoreMethod, SearchConfig, SearchError, TrialResult,
};

/// Keeps only the summary; per-trial records are dropped
struct Discard;

impl ResultSink for Discard {
    fn record(&mut self, _trial: &TrialResult) -> Result<(), SearchError> {
        Ok(())
    }
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

#[derive(Serialize)]
struct ItemOut {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScanSummary>,
    processing_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn search_file(path: &str, format: SampleFormat, config: &SearchConfig, score: ScoreMethod) -> Result<ScanSummary, SearchError> {
    let source = load_sample_buffer(BufReader::new(File::open(path)?), format, config.padding_factor)?;
    search_periods(&source, config, &score, &mut FoldOutput::new(&mut Discard))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut format = SampleFormat::Unsigned8;
    let mut score = ScoreMethod::MatchedFilter;
    let mut config = SearchConfig::default();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args.first().ok_or("--jobs requires a value")?.parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--format" => {
                format = args.first().ok_or("--format requires a value")?.parse()?;
                args.remove(0);
            }
            "--score" => {
                score = args.first().ok_or("--score requires a value")?.parse()?;
                args.remove(0);
            }
            "--low" => {
                config.low_period = args.first().ok_or("--low requires a value")?.parse()?;
                args.remove(0);
            }
            "--high" => {
                config.high_period = args.first().ok_or("--high requires a value")?.parse()?;
                args.remove(0);
            }
            "--dered" => config.red_noise = true,
            "--help" | "-h" => {
                eprintln!(
                    "Usage: search_batch [--jobs N] [--json] [--format F] [--score N] [--low N] [--high N] [--dered] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one time-series file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let start = Instant::now();
                let result = search_file(path, format, &config, score);
                let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
                match result {
                    Ok(summary) => ItemOut {
                        file: path.clone(),
                        summary: Some(summary),
                        processing_time_ms,
                        error: None,
                    },
                    Err(e) => ItemOut {
                        file: path.clone(),
                        summary: None,
                        processing_time_ms,
                        error: Some(format!("search failed: {e}")),
                    },
                }
            })
            .collect()
    });

    for (idx, o) in outs.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(o)?);
            continue;
        }
        match (&o.summary, &o.error) {
            (Some(summary), _) => match &summary.best {
                Some(best) => println!(
                    "[{}/{}] {}: period={:.4} scale={} score={:.3} trials={} time={:.2}ms",
                    idx + 1,
                    outs.len(),
                    o.file,
                    best.period,
                    best.scale_factor,
                    best.score,
                    summary.trials,
                    o.processing_time_ms
                ),
                None => println!("[{}/{}] {}: no scored trials", idx + 1, outs.len(), o.file),
            },
            (None, error) => println!(
                "[{}/{}] {}: ERROR: {}",
                idx + 1,
                outs.len(),
                o.file,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    let ok = outs.iter().filter(|o| o.summary.is_some()).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
