use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::Vector3D;
use super::{Boundary, SimpleSystem};

/// Build a system of `n_cells^3` cubic cells with four particles each on a
/// face-centered cubic lattice, at the given number density. Velocities are
/// drawn uniformly in `[-1, 1)` and the total momentum is removed.
pub fn fcc_system(n_cells: usize, density: f64, seed: u64) -> SimpleSystem {
    let n_particles = 4 * n_cells * n_cells * n_cells;
    let length = f64::cbrt(n_particles as f64 / density);
    let lattice = length / n_cells as f64;

    let basis = [
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(0.5, 0.5, 0.0),
        Vector3D::new(0.5, 0.0, 0.5),
        Vector3D::new(0.0, 0.5, 0.5),
    ];

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut system = SimpleSystem::new(Boundary::cubic(length));
    for i in 0..n_cells {
        for j in 0..n_cells {
            for k in 0..n_cells {
                let origin = Vector3D::new(i as f64, j as f64, k as f64);
                for b in &basis {
                    let position = lattice * (origin + b) + Vector3D::new(0.1, 0.1, 0.1);
                    let velocity = Vector3D::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    );
                    system.add_particle(position, velocity, 1.0);
                }
            }
        }
    }

    let mut momentum = Vector3D::zero();
    for velocity in system.velocities_mut().iter() {
        momentum += velocity;
    }
    momentum /= n_particles as f64;
    for velocity in system.velocities_mut() {
        *velocity -= momentum;
    }

    return system;
}

/// Two particles of unit mass, at distance `distance` along x, moving toward
/// each other with relative speed `2 * speed`.
pub fn head_on(distance: f64, speed: f64) -> SimpleSystem {
    let mut system = SimpleSystem::new(Boundary::cubic(10.0));
    system.add_particle(Vector3D::new(4.0, 5.0, 5.0), Vector3D::new(speed, 0.0, 0.0), 1.0);
    system.add_particle(Vector3D::new(4.0 + distance, 5.0, 5.0), Vector3D::new(-speed, 0.0, 0.0), 1.0);
    return system;
}
