//! The `Boundary` type represents the rectangular box enclosing a simulated
//! system, with periodic boundary conditions along some of the axes.
use crate::Vector3D;

/// A `Boundary` defines the system physical boundaries: an orthorhombic box
/// with side lengths `a, b, c`, where each axis can independently be periodic
/// or not.
///
/// Along non-periodic axis, particles are expected to stay inside `[0, L)`,
/// and vectors are never folded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    /// Lengths of the box along the three axis
    lengths: Vector3D,
    /// Which axis use periodic boundary conditions
    periodic: [bool; 3],
}

impl Boundary {
    /// Create an orthorhombic box with side lengths `a, b, c`, periodic in all
    /// directions.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Boundary {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "Box lengths must be positive");
        assert!(a.is_finite() && b.is_finite() && c.is_finite(), "Box lengths must be finite");
        Boundary {
            lengths: Vector3D::new(a, b, c),
            periodic: [true, true, true],
        }
    }

    /// Create a cubic box with side lengths `length, length, length`,
    /// periodic in all directions.
    pub fn cubic(length: f64) -> Boundary {
        Boundary::orthorhombic(length, length, length)
    }

    /// Set which axis of this box are periodic
    #[must_use]
    pub fn with_periodicity(mut self, periodic: [bool; 3]) -> Boundary {
        self.periodic = periodic;
        return self;
    }

    /// Get the lengths of the box
    pub fn lengths(&self) -> Vector3D {
        self.lengths
    }

    /// Get the periodicity flags of the box
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Get the volume of the box
    pub fn volume(&self) -> f64 {
        self.lengths[0] * self.lengths[1] * self.lengths[2]
    }

    /// Wrap a position in the box, obeying the periodic boundary conditions.
    /// For a cubic box of side length `L`, this produce a vector with all
    /// periodic components in `[0, L)`.
    pub fn wrap_vector(&self, vector: &mut Vector3D) {
        for xyz in 0..3 {
            if self.periodic[xyz] {
                let length = self.lengths[xyz];
                vector[xyz] -= f64::floor(vector[xyz] / length) * length;
                // floor rounding can leave -0.0 + L == L for tiny negative values
                if vector[xyz] >= length {
                    vector[xyz] -= length;
                }
            }
        }
    }

    /// Find the nearest periodic image of a displacement vector. For a cubic
    /// box of side length `L`, this produce a vector with all periodic
    /// components in `[-L/2, L/2]`.
    pub fn nearest_image(&self, vector: &mut Vector3D) {
        for xyz in 0..3 {
            if self.periodic[xyz] {
                let length = self.lengths[xyz];
                vector[xyz] -= f64::round(vector[xyz] / length) * length;
            }
        }
    }

    /// Get the fractional representation of the `position` in this box
    pub fn fractional(&self, position: Vector3D) -> Vector3D {
        Vector3D::new(
            position[0] / self.lengths[0],
            position[1] / self.lengths[1],
            position[2] / self.lengths[2],
        )
    }

    /// Periodic boundary conditions squared distance between the point `u` and
    /// the point `v`
    pub fn distance2(&self, u: Vector3D, v: Vector3D) -> f64 {
        let mut d = v - u;
        self.nearest_image(&mut d);
        return d.norm2();
    }

    /// Periodic boundary conditions distance between the point `u` and
    /// the point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        return f64::sqrt(self.distance2(u, v));
    }
}
