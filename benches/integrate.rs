//! Benchmarks for the CPU-side hot paths.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use swarmsong::audio::{AudioSettings, SoundManager};
use swarmsong::{FrameInput, NoiseField, ParticleField, Shape, ShapeSet, SimulationConfig, Vec3};

fn bench_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate");
    let config = SimulationConfig::default();

    for count in [1_000usize, 20_000, 100_000] {
        let mut rng = SmallRng::seed_from_u64(1);
        let shapes = ShapeSet::generate(count, &mut rng);
        let mut field = ParticleField::new(&shapes, &mut rng);
        field.morph_to(Shape::Cube, &shapes);

        let mut time = 0.0;
        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, _| {
            b.iter(|| {
                time += 1.0 / 60.0;
                let input = FrameInput {
                    interaction_point: Some(Vec3::new(40.0, 20.0, 0.0)),
                    pressed: true,
                    time,
                };
                black_box(field.integrate(&input, &config))
            })
        });
    }

    group.finish();
}

fn bench_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_generate");

    for shape in Shape::ALL {
        group.bench_function(shape.name(), |b| {
            let mut rng = SmallRng::seed_from_u64(7);
            b.iter(|| black_box(shape.generate(20_000, &mut rng)))
        });
    }

    group.finish();
}

fn bench_noise(c: &mut Criterion) {
    c.bench_function("noise_sample4", |b| {
        let mut t = 0.0f32;
        b.iter(|| {
            t += 0.01;
            black_box(NoiseField::sample4(black_box(1.5), black_box(-2.0), black_box(0.25), t))
        })
    });
}

fn bench_audio_render(c: &mut Criterion) {
    let settings = AudioSettings {
        seed: Some(3),
        ..Default::default()
    };
    let mut sound = SoundManager::new(settings).expect("default settings are valid");
    sound.initialize();
    let mut block = vec![0.0f32; 512];

    c.bench_function("audio_render_512", |b| {
        b.iter(|| {
            sound.notify_energy(200.0);
            sound.render(&mut block);
            black_box(block[0])
        })
    });
}

criterion_group!(benches, bench_integrate, bench_shapes, bench_noise, bench_audio_render);
criterion_main!(benches);
