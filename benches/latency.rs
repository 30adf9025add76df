//! Latency benchmarks for the inference pipeline.
//!
//! # Benchmarks
//!
//! ## Track Operations
//! - `track_push`: single observation ingestion
//! - `track_sort_on_construction`: unordered history normalization
//!
//! ## Feature Derivation
//! - `derive_features`: full feature table derivation at several history lengths
//! - `model_vector`: feature row to model vector conversion
//!
//! ## Scaling
//! - `scaler_transform_row`: forward scaling of one feature vector
//! - `scaler_descale`: sparse-vector single-feature inversion
//!
//! ## End-to-End Inference
//! - `forecast_storm`: full single-pass inference (requires a real ONNX model)
//!
//! # Running Benchmarks
//!
//! ```bash
//! # All benchmarks
//! cargo bench
//!
//! # Specific benchmark
//! cargo bench -- derive_features
//!
//! # With a real model (place universal.onnx, scaler.json, hyperparameters.json in benches/)
//! cargo bench -- forecast_storm
//! ```

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hurricane_inference::{derive_features, Observation, RobustScaler, StormTrack};

fn synthetic_observations(n: usize) -> Vec<Observation> {
    let start = Utc.with_ymd_and_hms(2020, 9, 15, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            Observation::new(
                start + Duration::hours(6 * i as i64),
                30.0 + (i as f64 * 0.3).sin() * 20.0 + i as f64 * 0.5,
                20.0 + 0.4 * i as f64,
                -60.0 - 0.3 * i as f64,
                1000.0 - (i as f64 * 0.2).cos() * 15.0,
            )
        })
        .collect()
}

fn fitted_scaler() -> RobustScaler {
    RobustScaler {
        center: vec![
            22.5, -60.0, 85.0, 2.5, 960.0, 0.05, -0.04, 2015.0, 9.0, 15.0, 12.0,
        ],
        scale: vec![6.0, 18.0, 35.0, 4.0, 40.0, 0.1, 0.09, 10.0, 2.0, 8.0, 6.0],
    }
}

//
// Track Benchmarks
//

fn benchmark_track_operations(c: &mut Criterion) {
    c.bench_function("track_push", |b| {
        let mut track = StormTrack::new("al092020", "BENCH", synthetic_observations(60));
        let start = Utc.with_ymd_and_hms(2020, 9, 30, 0, 0, 0).unwrap();
        let mut i = 0i64;

        b.iter(|| {
            track.push(black_box(Observation::new(
                start + Duration::hours(6 * i),
                80.0,
                25.0,
                -70.0,
                950.0,
            )));
            i += 1;
        });
    });

    c.bench_function("track_sort_on_construction", |b| {
        let mut observations = synthetic_observations(120);
        observations.reverse();

        b.iter(|| {
            let _track = StormTrack::new("al092020", "BENCH", black_box(observations.clone()));
        });
    });
}

//
// Feature Derivation Benchmarks
//

fn benchmark_feature_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_features");

    for n in [30, 120, 480].iter() {
        let observations = synthetic_observations(*n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &observations, |b, obs| {
            b.iter(|| {
                let _ = derive_features(black_box(obs), 5);
            });
        });
    }

    group.finish();

    c.bench_function("model_vector", |b| {
        let observations = synthetic_observations(30);
        let rows = derive_features(&observations, 5);

        b.iter(|| {
            let _ = black_box(&rows[0]).to_model_vector();
        });
    });
}

//
// Scaling Benchmarks
//

fn benchmark_scaling(c: &mut Criterion) {
    let scaler = fitted_scaler();
    let observations = synthetic_observations(30);
    let rows = derive_features(&observations, 5);
    let vector = rows[0].to_model_vector();

    c.bench_function("scaler_transform_row", |b| {
        b.iter(|| {
            let _ = scaler.transform_row(black_box(&vector));
        });
    });

    c.bench_function("scaler_descale", |b| {
        b.iter(|| {
            let _ = scaler.descale(black_box(0.42), 2);
        });
    });
}

//
// End-to-End Benchmarks
//
// Note: these require real serialized artifacts.
// Place universal.onnx, scaler.json, and hyperparameters.json in benches/ to enable.
//

fn benchmark_end_to_end(c: &mut Criterion) {
    use std::path::PathBuf;

    let bench_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("benches");
    let model_path = bench_dir.join("universal.onnx");

    if !model_path.exists() {
        eprintln!(
            "Skipping end-to-end benchmarks: model not found at {}",
            model_path.display()
        );
        eprintln!("To enable, place artifacts in benches/ (universal.onnx, scaler.json, hyperparameters.json)");
        return;
    }

    benchmark_with_model(c, &bench_dir);
}

#[allow(dead_code)]
fn benchmark_with_model(c: &mut Criterion, bench_dir: &std::path::Path) {
    use hurricane_inference::{
        forecast_storm, ForecastConfig, ForecastModel, ModelDescriptor, UniversalModel,
    };

    let descriptor = ModelDescriptor::load(&bench_dir.join("hyperparameters.json")).unwrap();
    let scaler = RobustScaler::load(&bench_dir.join("scaler.json")).unwrap();
    let model = ForecastModel::load(
        &bench_dir.join("universal.onnx"),
        descriptor.variant().unwrap(),
        descriptor.forecast_steps,
        scaler,
    )
    .unwrap();
    let mut predictor = UniversalModel::new(model).unwrap();

    let track = StormTrack::new("al092020", "BENCH", synthetic_observations(60));
    let config = ForecastConfig::default();

    c.bench_function("forecast_storm", |b| {
        b.iter(|| {
            let _ = forecast_storm(black_box(&track), &mut predictor, &config);
        });
    });
}

criterion_group!(
    benches,
    benchmark_track_operations,
    benchmark_feature_derivation,
    benchmark_scaling,
    benchmark_end_to_end,
);
criterion_main!(benches);
