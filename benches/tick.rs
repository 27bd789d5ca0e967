//! Benchmarks for the CPU tick loop.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use leonids::{
    AnimationDriver, Curve, EmissionMode, Emitter, EmitterSettings, Modifier, ParticlePool, ValueRange, Vec2, Vec4,
    Velocity,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

fn driver(capacity: usize, modifiers: Vec<Modifier>) -> AnimationDriver {
    let settings = EmitterSettings {
        velocity: Velocity::Polar {
            speed: ValueRange::new(50.0, 200.0),
            angle: ValueRange::new(0.0, 360.0),
        },
        angular_velocity: ValueRange::new(-90.0, 90.0),
        ..EmitterSettings::new(4, Duration::from_secs(3600))
    };
    let emitter = Emitter::new(settings, EmissionMode::Burst(0), StdRng::seed_from_u64(1)).unwrap();
    let mut driver = AnimationDriver::new(ParticlePool::new(capacity).unwrap(), emitter, modifiers).unwrap();
    driver.start(EmissionMode::Burst(capacity as u32)).unwrap();
    driver
}

fn full_chain() -> Vec<Modifier> {
    vec![
        Modifier::Acceleration(Vec2::new(0.0, 98.0)),
        Modifier::Rotation {
            angular_acceleration: 10.0,
        },
        Modifier::scale(1.0, 0.0),
        Modifier::Alpha(Curve::from_keys(vec![(0.0, 0.0), (0.1, 1.0), (0.8, 1.0), (1.0, 0.0)]).unwrap()),
        Modifier::Color(Curve::linear(Vec4::ONE, Vec4::new(1.0, 0.3, 0.0, 1.0))),
    ]
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("motion_only", count), &count, |b, &count| {
            let mut d = driver(count, vec![Modifier::Acceleration(Vec2::ZERO)]);
            b.iter(|| black_box(d.tick(FRAME)))
        });

        group.bench_with_input(BenchmarkId::new("full_chain", count), &count, |b, &count| {
            let mut d = driver(count, full_chain());
            b.iter(|| black_box(d.tick(FRAME)))
        });
    }

    group.finish();
}

fn bench_emission(c: &mut Criterion) {
    c.bench_function("burst_1000_and_cancel", |b| {
        let mut d = driver(1_000, full_chain());
        b.iter(|| {
            d.cancel();
            d.start(EmissionMode::Burst(1_000)).unwrap();
            black_box(d.pool().active_count())
        })
    });
}

fn bench_instances(c: &mut Criterion) {
    let d = driver(10_000, full_chain());
    c.bench_function("instances_10000", |b| {
        b.iter(|| {
            let instances: Vec<_> = d.active_particles().map(|p| p.instance()).collect();
            black_box(instances.len())
        })
    });
}

criterion_group!(benches, bench_tick, bench_emission, bench_instances);
criterion_main!(benches);
