//! Criterion benchmarks for calibration functions.
//!
//! Measures expression validation, sandboxed evaluation over growing input
//! sizes, least-squares fitting and numerical versus closed-form inversion.

use calib_core::expr::{validate_expression, Symbol};
use calib_core::types::Interval;
use calib_models::calibration::{Calibration, CalibrationBuilder, FitOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate noiseless quadratic calibration points.
fn generate_points(n: usize) -> (Vec<f64>, Vec<f64>) {
    let xs: Vec<f64> = (0..n).map(|i| 4000.0 * i as f64 / (n - 1) as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| 0.5 + 0.35 * x + 1.0e-6 * x * x).collect();
    (xs, ys)
}

/// Benchmark validation, including the smoke evaluation.
fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    let domain = Interval::default_domain();
    let range = Interval::default_range();

    for (name, text, params) in [
        ("linear", "p[0] + p[1] * x", vec![1.0, 2.0]),
        ("quadratic", "p[0] + p[1] * x + p[2] * x**2", vec![1.0, 2.0, 3.0]),
        ("block", "a = p[0] * x\nb = a / (1 + p[1] * a)\nnp.sqrt(b)", vec![1.0, 0.001]),
    ] {
        group.bench_with_input(BenchmarkId::new("validate", name), &(text, params), |b, (text, params)| {
            b.iter(|| validate_expression(black_box(text), Some(params.as_slice()), Symbol::X, domain, range).unwrap());
        });
    }

    group.finish();
}

/// Benchmark forward evaluation over input slices.
fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    let cal = Calibration::from_polynomial(vec![0.5, 0.35, 1.0e-6]).unwrap();

    for size in [1, 100, 10000] {
        let xs: Vec<f64> = (0..size).map(|i| i as f64).collect();
        group.bench_with_input(BenchmarkId::new("polynomial", size), &xs, |b, xs| {
            b.iter(|| cal.evaluate_many(black_box(xs)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark Levenberg-Marquardt fitting.
fn bench_fitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("fitting");

    for size in [5, 50, 500] {
        let (xs, ys) = generate_points(size);
        group.bench_with_input(BenchmarkId::new("quadratic", size), &(xs, ys), |b, (xs, ys)| {
            b.iter(|| {
                CalibrationBuilder::new("p[0] + p[1] * x + p[2] * x**2", vec![0.0, 0.3, 0.0])
                    .fit_points(black_box(xs), black_box(ys), false, &FitOptions::default())
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark inversion: bracketed root finding vs closed form.
fn bench_inversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("inversion");

    let numerical = Calibration::from_linear(vec![0.5, 0.35]).unwrap();
    let closed_form = CalibrationBuilder::linear(vec![0.5, 0.35])
        .unwrap()
        .inv_expression("(y - p[0]) / p[1]")
        .build()
        .unwrap();

    group.bench_function("numerical", |b| {
        b.iter(|| numerical.inverse(black_box(700.5), None).unwrap());
    });
    group.bench_function("numerical_with_hint", |b| {
        b.iter(|| numerical.inverse(black_box(700.5), Some(1990.0)).unwrap());
    });
    group.bench_function("closed_form", |b| {
        b.iter(|| closed_form.inverse(black_box(700.5), None).unwrap());
    });

    let ys: Vec<f64> = (1..=100).map(|i| 10.0 * i as f64).collect();
    group.bench_with_input(BenchmarkId::new("numerical_many", ys.len()), &ys, |b, ys| {
        b.iter(|| numerical.inverse_many(black_box(ys), None).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_validation,
    bench_evaluation,
    bench_fitting,
    bench_inversion
);
criterion_main!(benches);
