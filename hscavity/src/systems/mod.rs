use crate::Vector3D;

mod boundary;
pub use self::boundary::Boundary;

mod simple_system;
pub use self::simple_system::SimpleSystem;

#[cfg(test)]
pub(crate) mod test_utils;

/// A `System` deals with the storage of particles and related information.
///
/// Particles are identified by their index in the slices returned by this
/// trait, and these indexes must stay stable during a simulation.
pub trait System {
    /// Get the box containing this system
    fn boundary(&self) -> Boundary;

    /// Get the number of particles in this system
    fn size(&self) -> usize;

    /// Get the positions for all particles in this system. The returned value
    /// must be a slice of length `self.size()`.
    fn positions(&self) -> &[Vector3D];

    /// Get the velocities for all particles in this system. The returned value
    /// must be a slice of length `self.size()`.
    fn velocities(&self) -> &[Vector3D];

    /// Get the inverse of the mass of all particles in this system. A zero
    /// inverse mass corresponds to an immovable particle.
    fn inverse_masses(&self) -> &[f64];

    /// Get mutable access to both positions and velocities at the same time,
    /// as needed to resolve a collision.
    fn dynamics_mut(&mut self) -> (&mut [Vector3D], &mut [Vector3D]);
}

/// Get the kinetic temperature of a system, in units where the Boltzmann
/// constant is 1. Immovable particles do not contribute.
#[allow(clippy::float_cmp)]
pub fn kinetic_temperature(system: &dyn System) -> f64 {
    let mut twice_kinetic = 0.0;
    let mut n_mobile = 0;
    for (velocity, &inverse_mass) in system.velocities().iter().zip(system.inverse_masses()) {
        if inverse_mass == 0.0 {
            continue;
        }
        twice_kinetic += velocity.norm2() / inverse_mass;
        n_mobile += 1;
    }

    if n_mobile == 0 {
        return 0.0;
    }

    return twice_kinetic / (3.0 * n_mobile as f64);
}
