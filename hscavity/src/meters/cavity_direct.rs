use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};

use crate::{BondState, Error, System};

/// Parameters for the direct sampling of the bonded pair separation
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DirectCavityParameters {
    /// Number of histogram bins
    pub bins: usize,
    /// Largest distance in the histogram, usually the diameter of the spheres
    pub x_max: f64,
}

impl DirectCavityParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.bins == 0 {
            return Err(Error::InvalidParameter(
                "expected at least one bin for the direct cavity histogram".into()
            ));
        }

        if !(self.x_max > 0.0 && self.x_max.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive and finite x_max for the direct cavity histogram, got {}",
                self.x_max
            )));
        }

        return Ok(());
    }
}

/// Histogram of the distance between the two particles of the bonded pair,
/// sampled at regular intervals by the caller.
///
/// The histogram is normalized as a radial distribution function over all
/// pairs of particles, giving `g(r)` inside the hard core. The cavity
/// function follows as `y(r) = g(r) / (exp(w) (1 - f))`, where `f` is
/// [`DirectCavity::paired_fraction`]. This is the reference the
/// [`MappedCavity`](super::MappedCavity) estimator should reproduce.
#[derive(Debug, Clone)]
pub struct DirectCavity {
    parameters: DirectCavityParameters,
    bin_width: f64,
    histogram: Array1<f64>,
    samples: u64,
    bonded_samples: u64,
    last_result: Array1<f64>,
}

impl DirectCavity {
    pub fn new(parameters: DirectCavityParameters) -> Result<DirectCavity, Error> {
        parameters.validate()?;
        return Ok(DirectCavity {
            parameters: parameters,
            bin_width: parameters.x_max / parameters.bins as f64,
            histogram: Array1::from_elem(parameters.bins, 0.0),
            samples: 0,
            bonded_samples: 0,
            last_result: Array1::from_elem(parameters.bins, 0.0),
        });
    }

    /// Create a new histogram from JSON-formatted parameters
    pub fn from_json(parameters: &str) -> Result<DirectCavity, Error> {
        let parameters = serde_json::from_str::<DirectCavityParameters>(parameters)?;
        return DirectCavity::new(parameters);
    }

    pub fn parameters(&self) -> &DirectCavityParameters {
        &self.parameters
    }

    /// Get the raw number of samples in each bin
    pub fn raw(&self) -> ArrayView1<'_, f64> {
        self.histogram.view()
    }

    /// Get the center of each bin, `(i + 1/2) * x_max / bins`
    pub fn positions(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.parameters.bins, |i| (i as f64 + 0.5) * self.bin_width)
    }

    /// Number of samples taken since the last reset
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Fraction of the samples taken with a bonded pair. This is zero if no
    /// samples were taken.
    pub fn paired_fraction(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        return self.bonded_samples as f64 / self.samples as f64;
    }

    /// Add the current configuration of the `system` to the histogram
    pub fn sample(&mut self, system: &dyn System, bond: &BondState) {
        self.samples += 1;

        let pair = match bond.pair() {
            Some(pair) => pair,
            None => return,
        };
        self.bonded_samples += 1;

        let positions = system.positions();
        let r = system.boundary().distance(positions[pair.first()], positions[pair.second()]);
        if r < self.parameters.x_max {
            let bin = usize::min((r / self.bin_width) as usize, self.parameters.bins - 1);
            self.histogram[bin] += 1.0;
        }
    }

    /// Restart the accumulation
    pub fn reset(&mut self) {
        self.histogram.fill(0.0);
        self.samples = 0;
        self.bonded_samples = 0;
    }

    /// Get the normalized histogram, evaluated at
    /// [`DirectCavity::positions`].
    ///
    /// If no samples were taken, or if the system contains less than two
    /// particles, this returns the result of the previous query (or zeros if
    /// there was none).
    pub fn query(&mut self, system: &dyn System) -> Array1<f64> {
        if self.samples == 0 {
            return self.last_result.clone();
        }

        let n_particles = system.size() as f64;
        if system.size() < 2 {
            log::warn!(
                "can not normalize the direct cavity with {} particles, using the previous result",
                system.size()
            );
            return self.last_result.clone();
        }

        let n_pairs = 0.5 * n_particles * (n_particles - 1.0);
        let pair_density = n_pairs / system.boundary().volume();
        let dx = self.bin_width;

        let result = Array1::from_shape_fn(self.parameters.bins, |bin| {
            let r_0 = bin as f64 * dx;
            let r_1 = (bin + 1) as f64 * dx;
            let shell = 4.0 / 3.0 * PI * (r_1 * r_1 * r_1 - r_0 * r_0 * r_0);
            self.histogram[bin] / (self.samples as f64 * pair_density * shell)
        });

        self.last_result.assign(&result);
        return result;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use crate::{Boundary, SimpleSystem, Vector3D};
    use super::*;

    fn parameters() -> DirectCavityParameters {
        DirectCavityParameters {
            bins: 4,
            x_max: 1.0,
        }
    }

    fn bonded(a: usize, b: usize) -> BondState {
        let mut bond = BondState::new();
        bond.set(a, b);
        return bond;
    }

    /// Particles 0 and 1 overlap across the periodic boundary, 0.6 apart
    fn overlapping_system() -> SimpleSystem {
        let mut system = SimpleSystem::new(Boundary::cubic(10.0));
        system.add_particle(Vector3D::new(0.2, 5.0, 5.0), Vector3D::zero(), 1.0);
        system.add_particle(Vector3D::new(9.6, 5.0, 5.0), Vector3D::zero(), 1.0);
        system.add_particle(Vector3D::new(3.0, 3.0, 3.0), Vector3D::zero(), 1.0);
        system.add_particle(Vector3D::new(7.0, 7.0, 7.0), Vector3D::zero(), 1.0);
        return system;
    }

    #[test]
    fn invalid_parameters() {
        let mut parameters = parameters();
        parameters.bins = 0;
        assert!(DirectCavity::new(parameters).is_err());

        parameters.bins = 10;
        parameters.x_max = f64::INFINITY;
        assert!(DirectCavity::new(parameters).is_err());

        let meter = DirectCavity::from_json(r#"{"bins": 20, "x_max": 1.0}"#).unwrap();
        assert_eq!(meter.raw().len(), 20);
        assert!(DirectCavity::from_json(r#"{"bins": 20, "x_max": 1.0, "pair_well": 2.0}"#).is_err());

        let schema = schemars::schema_for!(DirectCavityParameters);
        assert!(serde_json::to_string(&schema).unwrap().contains("x_max"));
    }

    #[test]
    fn positions() {
        let meter = DirectCavity::new(parameters()).unwrap();
        assert_eq!(meter.positions().to_vec(), [0.125, 0.375, 0.625, 0.875]);
    }

    #[test]
    fn histogram() {
        let system = overlapping_system();
        let mut meter = DirectCavity::new(parameters()).unwrap();

        meter.sample(&system, &bonded(0, 1));
        meter.sample(&system, &bonded(1, 0));
        meter.sample(&system, &BondState::new());
        // bonded, but outside of the histogram
        meter.sample(&system, &bonded(2, 3));

        assert_eq!(meter.samples(), 4);
        assert_relative_eq!(meter.paired_fraction(), 0.75);
        assert_eq!(meter.raw().to_vec(), [0.0, 0.0, 2.0, 0.0]);

        let result = meter.query(&system);
        let shell = 4.0 / 3.0 * PI * (0.75 * 0.75 * 0.75 - 0.5 * 0.5 * 0.5);
        let expected = 2.0 / (4.0 * (6.0 / 1000.0) * shell);
        assert_eq!(result[0], 0.0);
        assert_eq!(result[1], 0.0);
        assert_relative_eq!(result[2], expected, max_relative = 1e-12);
        assert_eq!(result[3], 0.0);
    }

    #[test]
    fn degenerate_queries() {
        let system = overlapping_system();
        let mut meter = DirectCavity::new(parameters()).unwrap();
        assert_eq!(meter.query(&system).to_vec(), [0.0; 4]);

        meter.sample(&system, &bonded(0, 1));
        let previous = meter.query(&system);

        let mut single = SimpleSystem::new(Boundary::cubic(10.0));
        single.add_particle(Vector3D::zero(), Vector3D::zero(), 1.0);
        assert_eq!(meter.query(&single), previous);

        meter.reset();
        assert_eq!(meter.samples(), 0);
        assert_eq!(meter.paired_fraction(), 0.0);
        assert_eq!(meter.raw().sum(), 0.0);
        assert_eq!(meter.query(&system), previous);
    }
}
