use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};

use crate::{BondState, CollisionEvent, CollisionOutcome, Error, System, Vector3D};

use super::{BondClock, CollisionListener};

/// Which quantity is deposited in the histogram for bridging collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum Weighting {
    /// Momentum transfer projected on the separation, with the `4π`
    /// normalization
    Virial,
    /// Momentum transfer divided by the normal relative speed of the
    /// collision, with the `4π^1.5` normalization
    Momentum,
}

/// Parameters for the mapped averaging estimator of the cavity function
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MappedCavityParameters {
    /// Number of histogram bins
    pub bins: usize,
    /// Largest distance in the histogram, usually the diameter of the spheres
    pub x_max: f64,
    /// Reduced well depth of the interaction, used to relate the bonded time
    /// to the integral of the cavity function inside the core
    pub pair_well: f64,
    /// Quantity deposited in the histogram
    pub weighting: Weighting,
    /// Restart the accumulation after each call to `query`
    pub reset_after_read: bool,
}

impl MappedCavityParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.bins == 0 {
            return Err(Error::InvalidParameter(
                "expected at least one bin for the mapped cavity histogram".into()
            ));
        }

        if !(self.x_max > 0.0 && self.x_max.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive and finite x_max for the mapped cavity histogram, got {}",
                self.x_max
            )));
        }

        if self.pair_well.is_nan() {
            return Err(Error::InvalidParameter(
                "pair_well for the mapped cavity histogram can not be NaN".into()
            ));
        }

        return Ok(());
    }
}

/// Mapped averaging estimator of the cavity function `y(r)` for `r` inside
/// the hard core.
///
/// Every collision where exactly one of the two particles belongs to the
/// bonded pair (a bridging collision) deposits the momentum transferred to
/// the other particle, projected on its separation from the bonded partner.
/// The contribution goes in the bin of this separation. Queries turn the
/// accumulated histogram into the cavity function by normalization, reverse
/// cumulative sum, a shift matching the measured bonded time, and a rescale
/// by the ratio of external to internal collisions.
#[derive(Debug, Clone)]
pub struct MappedCavity {
    parameters: MappedCavityParameters,
    bin_width: f64,
    /// raw accumulated contributions, one per bin
    histogram: Array1<f64>,
    total_collisions: u64,
    internal_collisions: u64,
    clock: BondClock,
    /// result of the last query, with `bins + 1` points
    last_result: Array1<f64>,
}

impl MappedCavity {
    /// Create a new estimator starting to accumulate at time `time`, with the
    /// given initial `bond` state.
    pub fn new(parameters: MappedCavityParameters, bond: &BondState, time: f64) -> Result<MappedCavity, Error> {
        parameters.validate()?;
        return Ok(MappedCavity {
            parameters: parameters,
            bin_width: parameters.x_max / parameters.bins as f64,
            histogram: Array1::from_elem(parameters.bins, 0.0),
            total_collisions: 0,
            internal_collisions: 0,
            clock: BondClock::new(bond, time),
            last_result: Array1::from_elem(parameters.bins + 1, 0.0),
        });
    }

    /// Create a new estimator from JSON-formatted parameters
    pub fn from_json(parameters: &str, bond: &BondState, time: f64) -> Result<MappedCavity, Error> {
        let parameters = serde_json::from_str::<MappedCavityParameters>(parameters)?;
        return MappedCavity::new(parameters, bond, time);
    }

    pub fn parameters(&self) -> &MappedCavityParameters {
        &self.parameters
    }

    /// Get the raw accumulated contribution in each bin
    pub fn raw(&self) -> ArrayView1<'_, f64> {
        self.histogram.view()
    }

    /// Get the distances at which the cavity function is evaluated by
    /// [`MappedCavity::query`], `i * x_max / bins` for `i` in `0..=bins`
    pub fn positions(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.parameters.bins + 1, |i| i as f64 * self.bin_width)
    }

    /// Number of collisions seen since the last reset
    pub fn total_collisions(&self) -> u64 {
        self.total_collisions
    }

    /// Number of internal bounces and escapes seen since the last reset
    pub fn internal_collisions(&self) -> u64 {
        self.internal_collisions
    }

    /// Fraction of the time spent with a bonded pair since the last reset.
    /// This is zero if no time elapsed.
    #[allow(clippy::float_cmp)]
    pub fn paired_fraction(&self, time: f64) -> Result<f64, Error> {
        let (bonded, unbonded) = self.clock.times(time)?;
        if bonded + unbonded == 0.0 {
            return Ok(0.0);
        }
        return Ok(bonded / (bonded + unbonded));
    }

    /// Restart the accumulation at `time`. The bonded state is kept.
    pub fn reset(&mut self, time: f64) -> Result<(), Error> {
        self.clock.reset(time)?;
        self.histogram.fill(0.0);
        self.total_collisions = 0;
        self.internal_collisions = 0;
        return Ok(());
    }

    /// Get the cavity function accumulated between the last reset and
    /// `time`, evaluated at [`MappedCavity::positions`].
    ///
    /// If no time elapsed since the last reset, or if the system contains
    /// less than two particles, this returns the result of the previous
    /// query (or zeros if there was none).
    #[allow(clippy::float_cmp)]
    #[time_graph::instrument(name = "MappedCavity::query")]
    pub fn query(&mut self, time: f64, system: &dyn System) -> Result<Array1<f64>, Error> {
        let elapsed = time - self.clock.reset_time();
        if elapsed < 0.0 {
            return Err(Error::Inconsistent(format!(
                "can not query the mapped cavity at time {} before the last reset at {}",
                time, self.clock.reset_time()
            )));
        }

        if elapsed == 0.0 {
            return Ok(self.last_result.clone());
        }

        if system.size() < 2 {
            log::warn!(
                "can not normalize the mapped cavity with {} particles, using the previous result",
                system.size()
            );
            return Ok(self.last_result.clone());
        }

        let n_bins = self.parameters.bins;
        let n_particles = system.size() as f64;
        let volume = system.boundary().volume();
        let density = n_particles / volume;

        let angular = match self.parameters.weighting {
            Weighting::Virial => 4.0 * PI,
            Weighting::Momentum => 4.0 * PI.powf(1.5),
        };
        let normalization = elapsed * n_particles * density * angular;

        let mut result = Array1::from_elem(n_bins + 1, 0.0);
        for bin in 0..n_bins {
            result[bin] = self.histogram[bin] / normalization;
        }

        // reverse cumulative sum
        for bin in (0..n_bins).rev() {
            result[bin] += result[bin + 1];
        }

        let (bonded, unbonded) = self.clock.times(time)?;
        if bonded > 0.0 && unbonded > 0.0 && self.parameters.pair_well.is_finite() {
            let n_pairs = 0.5 * n_particles * (n_particles - 1.0);
            let target = (bonded / unbonded) * volume / (n_pairs * f64::exp(self.parameters.pair_well));

            let dx = self.bin_width;
            let mut integral = 0.0;
            for bin in 0..n_bins {
                let r_0 = bin as f64 * dx;
                let r_1 = (bin + 1) as f64 * dx;
                let f_0 = result[bin] * 4.0 * PI * r_0 * r_0;
                let f_1 = result[bin + 1] * 4.0 * PI * r_1 * r_1;
                integral += 0.5 * (f_0 + f_1) * dx;
            }

            let x_max = self.parameters.x_max;
            let shift = (target - integral) / (4.0 / 3.0 * PI * x_max * x_max * x_max);
            result += shift;
        }

        if self.internal_collisions > 0 {
            let internal = self.internal_collisions as f64;
            let external = (self.total_collisions - self.internal_collisions) as f64;
            result *= external / internal;
        }

        self.last_result.assign(&result);
        if self.parameters.reset_after_read {
            self.reset(time)?;
        }

        return Ok(result);
    }

    /// Get the contribution of a bridging collision, and the distance
    /// between the particle outside of the bonded pair and the bonded
    /// partner of the other particle. Returns `None` for non-bridging
    /// collisions.
    fn bridging_contribution(&self, event: &CollisionEvent, system: &dyn System) -> Option<(f64, f64)> {
        let pair = event.bond.pair()?;
        let (inside, outside) = match (pair.contains(event.first), pair.contains(event.second)) {
            (true, false) => (event.first, event.second),
            (false, true) => (event.second, event.first),
            _ => return None,
        };
        let partner = pair.partner(inside)?;

        let boundary = system.boundary();
        let positions = system.positions();
        let velocities = system.velocities();
        let at_event = |particle: usize| positions[particle] + event.false_time * velocities[particle];

        let mut r_vector = at_event(outside) - at_event(partner);
        boundary.nearest_image(&mut r_vector);
        let r2 = r_vector.norm2();
        if r2 < 1e-12 {
            log::warn!(
                "particles {} and {} are at the same position, ignoring this collision",
                outside, partner
            );
            return None;
        }
        let r = f64::sqrt(r2);

        let momentum = if outside == event.first { event.impulse } else { -event.impulse };
        let mut contribution = (momentum * r_vector) / (r * r2);

        if self.parameters.weighting == Weighting::Momentum {
            let mut contact: Vector3D = at_event(event.second) - at_event(event.first);
            boundary.nearest_image(&mut contact);
            let dv = velocities[event.second] - velocities[event.first];
            let normal_speed = f64::abs(contact * dv) / contact.norm();
            contribution /= normal_speed;
        }

        return Some((r, contribution));
    }
}

impl CollisionListener for MappedCavity {
    #[allow(clippy::float_cmp)]
    fn collision_action(&mut self, event: &CollisionEvent, system: &dyn System) -> Result<(), Error> {
        self.clock.record(event)?;

        self.total_collisions += 1;
        if event.outcome.is_internal() {
            self.internal_collisions += 1;
        }

        if event.outcome != CollisionOutcome::ExternalBounce || event.virial == 0.0 {
            return Ok(());
        }

        if let Some((r, contribution)) = self.bridging_contribution(event, system) {
            if r < self.parameters.x_max && contribution.is_finite() {
                let bin = usize::min((r / self.bin_width) as usize, self.parameters.bins - 1);
                self.histogram[bin] += contribution;
            }
        }

        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use crate::meters::tests::event;
    use crate::{Boundary, SimpleSystem};
    use crate::{PairedHardSpheres, PairedHardSpheresParameters};
    use super::*;

    fn parameters() -> MappedCavityParameters {
        MappedCavityParameters {
            bins: 4,
            x_max: 2.0,
            pair_well: 0.0,
            weighting: Weighting::Virial,
            reset_after_read: false,
        }
    }

    fn bonded(a: usize, b: usize) -> BondState {
        let mut bond = BondState::new();
        bond.set(a, b);
        return bond;
    }

    /// Bonded pair (0, 1) with particle 2 about to collide with particle 1,
    /// and particle 3 far away.
    fn bridging_system() -> SimpleSystem {
        let mut system = SimpleSystem::new(Boundary::cubic(10.0));
        system.add_particle(Vector3D::new(4.0, 5.0, 5.0), Vector3D::zero(), 1.0);
        system.add_particle(Vector3D::new(4.5, 5.0, 5.0), Vector3D::new(1.0, 0.0, 0.0), 1.0);
        system.add_particle(Vector3D::new(5.5, 5.0, 5.0), Vector3D::new(-1.0, 0.0, 0.0), 1.0);
        system.add_particle(Vector3D::new(8.0, 8.0, 8.0), Vector3D::zero(), 1.0);
        return system;
    }

    /// Resolve the bridging collision in `bridging_system`
    fn bridging_event(system: &mut SimpleSystem, time: f64) -> CollisionEvent {
        let mut interaction = PairedHardSpheres::new(PairedHardSpheresParameters {
            sigma: 1.0,
            pair_well: 0.0,
            hard_core: false,
            seed: 0,
        }).unwrap();

        let mut bond = bonded(0, 1);
        return interaction.resolve(system, &mut bond, 1, 2, 0.0, time).unwrap();
    }

    #[test]
    fn invalid_parameters() {
        let mut parameters = parameters();
        parameters.bins = 0;
        assert!(MappedCavity::new(parameters, &BondState::new(), 0.0).is_err());

        parameters.bins = 10;
        parameters.x_max = 0.0;
        assert!(MappedCavity::new(parameters, &BondState::new(), 0.0).is_err());

        let json = r#"{"bins": 10, "x_max": 1.0, "pair_well": 2.0, "weighting": "Momentum", "reset_after_read": true}"#;
        let meter = MappedCavity::from_json(json, &BondState::new(), 0.0).unwrap();
        assert_eq!(meter.parameters().weighting, Weighting::Momentum);
        assert_eq!(meter.raw().len(), 10);

        let json = r#"{"bins": 10, "x_max": 1.0, "pair_well": 2.0, "weighting": "Other", "reset_after_read": true}"#;
        assert!(MappedCavity::from_json(json, &BondState::new(), 0.0).is_err());
    }

    #[test]
    fn json_schema() {
        let schema = schemars::schema_for!(MappedCavityParameters);
        let schema = serde_json::to_string(&schema).unwrap();
        assert!(schema.contains("reset_after_read"));
        assert!(schema.contains("Momentum"));
    }

    #[test]
    fn positions() {
        let meter = MappedCavity::new(parameters(), &BondState::new(), 0.0).unwrap();
        assert_eq!(meter.positions().to_vec(), [0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn bridging_deposit() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);
        assert_eq!(event.outcome, CollisionOutcome::ExternalBounce);
        assert_relative_eq!(event.virial, -2.0);

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();

        // particle 2 received 2 along x, at distance 1.5 of particle 0
        let expected = 2.0 * 1.5 / (1.5 * 1.5 * 1.5);
        assert_eq!(meter.total_collisions(), 1);
        assert_eq!(meter.internal_collisions(), 0);
        assert_relative_eq!(meter.raw()[3], expected);
        assert_eq!(meter.raw()[0], 0.0);
        assert_eq!(meter.raw()[1], 0.0);
        assert_eq!(meter.raw()[2], 0.0);

        // internal bounces and non-bridging collisions do not deposit
        let internal = crate::meters::tests::event(0, 1, CollisionOutcome::InternalBounce, 1.5, bonded(0, 1));
        meter.collision_action(&internal, &system).unwrap();
        let mut external = crate::meters::tests::event(2, 3, CollisionOutcome::ExternalBounce, 1.5, bonded(0, 1));
        external.virial = -1.0;
        meter.collision_action(&external, &system).unwrap();

        assert_eq!(meter.total_collisions(), 3);
        assert_eq!(meter.internal_collisions(), 1);
        assert_relative_eq!(meter.raw().sum(), expected);
    }

    #[test]
    fn momentum_weighting() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut parameters = parameters();
        parameters.weighting = Weighting::Momentum;
        let mut meter = MappedCavity::new(parameters, &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();

        // normal relative speed of the collision is 2
        let expected = 2.0 * 1.5 / (1.5 * 1.5 * 1.5) / 2.0;
        assert_relative_eq!(meter.raw()[3], expected);
    }

    #[test]
    fn no_internal_collisions() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();

        let result = meter.query(2.0, &system).unwrap();
        assert_eq!(result.len(), 5);

        // always bonded, so no shift; no internal collisions, so no rescale
        let normalization = 2.0 * 4.0 * (4.0 / 1000.0) * 4.0 * PI;
        let expected = 2.0 * 1.5 / (1.5 * 1.5 * 1.5) / normalization;
        for &value in result.iter().take(4) {
            assert!(value.is_finite());
            assert_relative_eq!(value, expected, max_relative = 1e-12);
        }
        assert_eq!(result[4], 0.0);
    }

    #[test]
    fn internal_rescale() {
        let mut system = bridging_system();
        let bridging = bridging_event(&mut system, 1.0);

        let mut reference = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        reference.collision_action(&bridging, &system).unwrap();
        let reference = reference.query(2.0, &system).unwrap();

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&bridging, &system).unwrap();
        let mut external = event(2, 3, CollisionOutcome::ExternalBounce, 1.0, bonded(0, 1));
        external.virial = -1.0;
        meter.collision_action(&external, &system).unwrap();
        meter.collision_action(&external, &system).unwrap();
        let internal = event(0, 1, CollisionOutcome::InternalBounce, 1.0, bonded(0, 1));
        meter.collision_action(&internal, &system).unwrap();

        let result = meter.query(2.0, &system).unwrap();
        for (value, reference) in result.iter().zip(&reference) {
            assert_relative_eq!(*value, 3.0 * reference);
        }
    }

    #[test]
    fn bonded_time_shift() {
        let system = bridging_system();
        let mut meter = MappedCavity::new(parameters(), &BondState::new(), 0.0).unwrap();
        let capture = event(0, 1, CollisionOutcome::Capture, 1.0, bonded(0, 1));
        meter.collision_action(&capture, &system).unwrap();

        assert_relative_eq!(meter.paired_fraction(3.0).unwrap(), 2.0 / 3.0);

        // empty histogram, the whole curve comes from the shift. 2 time units
        // bonded for 1 unbonded, 6 pairs, volume 1000 and w = 0
        let result = meter.query(3.0, &system).unwrap();
        let expected = 2.0 * 1000.0 / 6.0 / (4.0 / 3.0 * PI * 8.0);
        for &value in &result {
            assert_relative_eq!(value, expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn query_idempotence() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut parameters = parameters();
        parameters.reset_after_read = true;
        let mut meter = MappedCavity::new(parameters, &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();

        let first = meter.query(2.0, &system).unwrap();
        assert_eq!(meter.total_collisions(), 0);
        assert_eq!(meter.raw().sum(), 0.0);

        // no time elapsed since the reset
        let second = meter.query(2.0, &system).unwrap();
        assert_eq!(first, second);
        let third = meter.query(2.0, &system).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn empty_query() {
        let system = bridging_system();
        let mut meter = MappedCavity::new(parameters(), &BondState::new(), 5.0).unwrap();
        let result = meter.query(5.0, &system).unwrap();
        assert_eq!(result.to_vec(), [0.0; 5]);

        // unbonded the whole time, with no collision
        let result = meter.query(6.0, &system).unwrap();
        assert_eq!(result.to_vec(), [0.0; 5]);
    }

    #[test]
    fn too_few_particles() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();
        let previous = meter.query(2.0, &system).unwrap();

        let empty = SimpleSystem::new(Boundary::cubic(10.0));
        let result = meter.query(3.0, &empty).unwrap();
        assert_eq!(result, previous);

        let mut single = SimpleSystem::new(Boundary::cubic(10.0));
        single.add_particle(Vector3D::zero(), Vector3D::zero(), 1.0);
        let result = meter.query(3.0, &single).unwrap();
        assert_eq!(result, previous);
        assert!(result.iter().all(|v| v.is_finite()));

        // nothing was queried before
        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();
        assert_eq!(meter.query(2.0, &empty).unwrap().to_vec(), [0.0; 5]);
    }

    #[test]
    fn reset() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 0.0).unwrap();
        meter.collision_action(&event, &system).unwrap();
        assert!(meter.raw().sum() != 0.0);

        meter.reset(1.5).unwrap();
        assert_eq!(meter.raw().sum(), 0.0);
        assert_eq!(meter.total_collisions(), 0);
        assert_eq!(meter.internal_collisions(), 0);
        // still bonded after the reset
        assert_eq!(meter.paired_fraction(2.5).unwrap(), 1.0);
    }

    #[test]
    fn out_of_order() {
        let mut system = bridging_system();
        let event = bridging_event(&mut system, 1.0);

        let mut meter = MappedCavity::new(parameters(), &bonded(0, 1), 2.0).unwrap();
        let error = meter.collision_action(&event, &system).unwrap_err();
        assert!(matches!(error, Error::Inconsistent(_)));

        let error = meter.query(1.0, &system).unwrap_err();
        assert!(matches!(error, Error::Inconsistent(_)));
    }
}
