use super::{Boundary, System, Vector3D};

/// A simple implementation of `System` to use when no other is available
#[derive(Clone, Debug)]
pub struct SimpleSystem {
    boundary: Boundary,
    positions: Vec<Vector3D>,
    velocities: Vec<Vector3D>,
    inverse_masses: Vec<f64>,
}

impl SimpleSystem {
    /// Create a new empty system inside the given box
    pub fn new(boundary: Boundary) -> SimpleSystem {
        SimpleSystem {
            boundary: boundary,
            positions: Vec::new(),
            velocities: Vec::new(),
            inverse_masses: Vec::new(),
        }
    }

    /// Add a particle with the given position, velocity and mass to this
    /// system, returning the identifier of the new particle. The mass can be
    /// infinite, to create an immovable particle.
    pub fn add_particle(&mut self, position: Vector3D, velocity: Vector3D, mass: f64) -> usize {
        assert!(mass > 0.0, "Particle mass must be positive");
        self.positions.push(position);
        self.velocities.push(velocity);
        self.inverse_masses.push(1.0 / mass);
        return self.positions.len() - 1;
    }

    /// Change the box of this system, for example when compressing it.
    /// Positions are left untouched.
    pub fn set_boundary(&mut self, boundary: Boundary) {
        self.boundary = boundary;
    }

    /// Get mutable access to the positions of the particles
    pub fn positions_mut(&mut self) -> &mut [Vector3D] {
        &mut self.positions
    }

    /// Get mutable access to the velocities of the particles
    pub fn velocities_mut(&mut self) -> &mut [Vector3D] {
        &mut self.velocities
    }

    /// Move all particles along their velocity for the given `time`, wrapping
    /// them back inside the box afterward.
    pub fn advance(&mut self, time: f64) {
        for (position, velocity) in self.positions.iter_mut().zip(&self.velocities) {
            *position += time * velocity;
            self.boundary.wrap_vector(position);
        }
    }
}

impl System for SimpleSystem {
    fn boundary(&self) -> Boundary {
        self.boundary
    }

    fn size(&self) -> usize {
        self.positions.len()
    }

    fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    fn velocities(&self) -> &[Vector3D] {
        &self.velocities
    }

    fn inverse_masses(&self) -> &[f64] {
        &self.inverse_masses
    }

    fn dynamics_mut(&mut self) -> (&mut [Vector3D], &mut [Vector3D]) {
        (&mut self.positions, &mut self.velocities)
    }
}
