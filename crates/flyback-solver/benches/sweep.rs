//! Benchmarks for Bode sweeps and the full design pipeline.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use flyback_catalog::{CoreCatalog, MemoryCatalog};
use flyback_core::{DesignInputs, Factor, Stage, SweepSpec, TransferFunction};
use flyback_solver::run_pipeline;
use std::f64::consts::PI;

fn loop_like_transfer_function() -> TransferFunction {
    TransferFunction::new()
        .with(Factor::Gain { k: 25.0 })
        .with(Factor::Integrator { omega: 2.0 * PI * 50.0 })
        .with(Factor::Zero { omega: 2.0 * PI * 400.0 })
        .with(Factor::Pole { omega: 2.0 * PI * 8e3 })
        .with(Factor::RhpZero { omega: 2.0 * PI * 60e3 })
        .with(Factor::QuadraticPole {
            omega: PI * 65e3,
            q: 0.6,
        })
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("bode_sweep");
    let tf = loop_like_transfer_function();

    for points_per_decade in [10, 100, 1000] {
        let sweep = SweepSpec::log(10.0, 10e6, points_per_decade);
        group.bench_with_input(
            BenchmarkId::from_parameter(sweep.len()),
            &sweep,
            |bencher, sweep| {
                bencher.iter(|| tf.sweep(black_box(sweep), Stage::OptoFeedback).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let catalog = MemoryCatalog::builtin().unwrap();
    let inputs = DesignInputs::default();

    for model in ["EE25/13/7", "ETD29", "PQ26/25"] {
        let core = catalog.lookup(model).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(model), &core, |bencher, core| {
            bencher.iter(|| run_pipeline(black_box(&inputs), black_box(core)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sweep, bench_pipeline);
criterion_main!(benches);
