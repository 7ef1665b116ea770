use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hscavity::cells::CellIndex;
use hscavity::meters::{notify, CollisionListener};
use hscavity::{BondState, MappedCavity, PairedHardSpheres};
use hscavity::{Boundary, SimpleSystem, System, Vector3D};

const RANGE: f64 = 1.5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let steps = match std::env::args().nth(1) {
        Some(steps) => steps.parse()?,
        None => 5000,
    };

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the simulation
    let cavity = time_graph::spanned!("Full simulation", {
        simulate(steps)
    })?;
    println!("y(r) = {}", cavity);

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Simple cubic lattice of 5x5x5 particles with random velocities
fn lattice() -> SimpleSystem {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut system = SimpleSystem::new(Boundary::cubic(8.0));
    for i in 0..5 {
        for j in 0..5 {
            for k in 0..5 {
                let position = 1.6 * Vector3D::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5);
                let velocity = Vector3D::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                system.add_particle(position, velocity, 1.0);
            }
        }
    }
    return system;
}

/// Run `steps` collisions of paired hard spheres, and get the mapped cavity
/// function at the end
fn simulate(steps: usize) -> Result<ndarray::Array1<f64>, Box<dyn std::error::Error>> {
    let mut system = lattice();
    let mut interaction = PairedHardSpheres::from_json(r#"{
        "sigma": 1.0,
        "pair_well": 1.0,
        "hard_core": false,
        "seed": 42
    }"#)?;
    let mut bond = BondState::new();

    let mut cavity = MappedCavity::from_json(r#"{
        "bins": 20,
        "x_max": 1.0,
        "pair_well": 1.0,
        "weighting": "Virial",
        "reset_after_read": false
    }"#, &bond, 0.0)?;

    let mut cells = CellIndex::new(system.boundary(), RANGE, 1)?;
    let mut time = 0.0;
    for step in 0..steps {
        if step % 100 == 0 {
            cells.assign_all(&system);
        }

        let mut next = (f64::INFINITY, 0, 0);
        for pair in cells.pairs() {
            let collision = interaction.collision_time(&system, &bond, pair.first, pair.second, 0.0)?;
            if collision < next.0 {
                next = (collision, pair.first, pair.second);
            }
        }

        // particles must not leave the neighboring cells before the next
        // collision search
        let max_speed = system.velocities().iter().map(|v| v.norm()).fold(0.0, f64::max);
        let max_time = (RANGE - interaction.sigma()) / (2.0 * max_speed);

        let (collision, first, second) = next;
        let elapsed = f64::clamp(collision, 0.0, max_time);
        system.advance(elapsed);
        time += elapsed;
        for (particle, &position) in system.positions().iter().enumerate() {
            cells.update(particle, position);
        }

        if collision <= max_time {
            let event = interaction.resolve(&mut system, &mut bond, first, second, 0.0, time)?;
            let mut listeners: [&mut dyn CollisionListener; 1] = [&mut cavity];
            notify(&mut listeners, &event, &system)?;
        }
    }

    return Ok(cavity.query(time, &system)?);
}
