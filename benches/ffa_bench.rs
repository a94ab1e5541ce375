//! Performance benchmarks for the FFA search

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stratum_ffa::ffa::butterfly::fold;
use stratum_ffa::io::synthetic::{pulse_train, WhiteNoise};
use stratum_ffa::preprocessing::running_median::running_median;
use stratum_ffa::{search_periods, FoldOutput, ScoreMethod, SearchConfig, TrialResult};

fn bench_fold(c: &mut Criterion) {
    // 2^16 samples folded at a single base period
    let mut series = pulse_train(1 << 16, 250, 5, 2.0).expect("pulse train");
    WhiteNoise::new(1).add_to(&mut series, 0.5, 0.0);

    c.bench_function("fold_64k_base_250", |b| {
        b.iter(|| {
            let _ = fold(black_box(&series), black_box(250));
        });
    });
}

fn bench_running_median(c: &mut Criterion) {
    let mut noise = WhiteNoise::new(2);
    let samples: Vec<f64> = (0..1 << 16).map(|_| noise.sample(1.0, 0.0)).collect();

    c.bench_function("running_median_64k_w513", |b| {
        b.iter(|| {
            let _ = running_median(black_box(&samples), black_box(513));
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let mut series = pulse_train(1 << 15, 300, 6, 2.0).expect("pulse train");
    WhiteNoise::new(3).add_to(&mut series, 0.5, 0.0);

    let config = SearchConfig {
        low_period: 256,
        high_period: 320,
        red_noise: true,
        ..SearchConfig::default()
    };

    c.bench_function("search_32k_256_320", |b| {
        b.iter(|| {
            let mut trials: Vec<TrialResult> = Vec::new();
            let _ = search_periods(
                black_box(&series),
                black_box(&config),
                &ScoreMethod::MatchedFilter,
                &mut FoldOutput::new(&mut trials),
            );
        });
    });
}

criterion_group!(benches, bench_fold, bench_running_median, bench_search);
criterion_main!(benches);
