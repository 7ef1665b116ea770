#![allow(clippy::needless_return)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hscavity::cells::{CellIndex, Direction};
use hscavity::{Boundary, SimpleSystem, System, Vector3D};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

/// Random system of `n_particles` at number density 0.5
fn random_system(n_particles: usize) -> SimpleSystem {
    let length = f64::cbrt(n_particles as f64 / 0.5);
    let mut rng = ChaCha8Rng::seed_from_u64(n_particles as u64);

    let mut system = SimpleSystem::new(Boundary::cubic(length));
    for _ in 0..n_particles {
        let position = Vector3D::new(
            rng.gen_range(0.0..length),
            rng.gen_range(0.0..length),
            rng.gen_range(0.0..length),
        );
        system.add_particle(position, Vector3D::zero(), 1.0);
    }
    return system;
}

fn all_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("all pairs");
    group.noise_threshold(0.05);

    for &n_particles in black_box(&[256, 2048, 16384]) {
        let system = random_system(n_particles);
        for &cell_range in &[1, 2] {
            let mut index = CellIndex::new(system.boundary(), 1.0, cell_range).unwrap();
            index.assign_all(&system);

            group.bench_function(format!("n = {}, cell range = {}", n_particles, cell_range), |b| b.iter(|| {
                let mut count = 0;
                for pair in index.pairs() {
                    count += pair.first ^ pair.second;
                }
                return black_box(count);
            }));
        }
    }
}

fn single_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("single target (per particle)");
    group.noise_threshold(0.05);

    for &n_particles in black_box(&[256, 16384]) {
        let system = random_system(n_particles);
        let mut index = CellIndex::new(system.boundary(), 1.0, 1).unwrap();
        index.assign_all(&system);

        group.bench_function(format!("n = {}", n_particles), |b| b.iter_custom(|repeat| {
            let start = std::time::Instant::now();
            for _ in 0..repeat {
                for particle in 0..64 {
                    let pairs = index.pairs_with(particle, Direction::Both).unwrap();
                    black_box(pairs.count());
                }
            }
            start.elapsed() / 64
        }));
    }
}

fn reassign(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell update");
    group.noise_threshold(0.05);

    let mut system = random_system(2048);
    for velocity in system.velocities_mut() {
        *velocity = Vector3D::new(0.3, -0.2, 0.1);
    }
    let mut index = CellIndex::new(system.boundary(), 1.0, 1).unwrap();
    index.assign_all(&system);

    group.bench_function("advance and update all", |b| b.iter(|| {
        system.advance(0.05);
        for (particle, &position) in system.positions().iter().enumerate() {
            index.update(particle, position);
        }
    }));
}

criterion_group!(benches, all_pairs, single_target, reassign);
criterion_main!(benches);
