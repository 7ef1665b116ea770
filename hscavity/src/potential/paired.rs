use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{Error, System, Vector3D};

use super::{BondState, PairState, CollisionEvent, CollisionOutcome};
use super::{approach_time, separation_time};

/// Parameters for the paired hard spheres interaction
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PairedHardSpheresParameters {
    /// Diameter of the hard spheres
    pub sigma: f64,
    /// Reduced well depth `w` controlling how often pairs get captured and
    /// escape. A pair colliding with an empty bond slot is captured with
    /// probability `min(1, exp(w))`, and the bonded pair escapes with
    /// probability `min(1, exp(-w))`. This can be infinite when building the
    /// parameters from Rust.
    pub pair_well: f64,
    /// Disable capture and escape: the bonded pair (if any) stays bonded
    /// forever, and all other pairs are plain hard spheres
    pub hard_core: bool,
    /// Seed for the random number generator deciding capture and escape
    pub seed: u64,
}

impl PairedHardSpheresParameters {
    /// Validate all the parameters
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive and finite sigma for paired hard spheres, got {}",
                self.sigma
            )));
        }

        if self.pair_well.is_nan() {
            return Err(Error::InvalidParameter(
                "pair_well for paired hard spheres can not be NaN".into()
            ));
        }

        return Ok(());
    }
}

/// Hard spheres interaction where one pair of particles (the bonded pair) is
/// allowed to overlap.
///
/// The interaction does not store which pair is bonded; the [`BondState`] is
/// owned by the caller and given to both [`PairedHardSpheres::collision_time`]
/// and [`PairedHardSpheres::resolve`]. Prediction does not change the bond
/// state, resolution updates it on captures and escapes.
#[derive(Debug, Clone)]
pub struct PairedHardSpheres {
    parameters: PairedHardSpheresParameters,
    sigma2: f64,
    rng: ChaCha8Rng,
}

impl PairedHardSpheres {
    /// Create a new interaction with the given parameters
    pub fn new(parameters: PairedHardSpheresParameters) -> Result<PairedHardSpheres, Error> {
        parameters.validate()?;
        log::debug!(
            "paired hard spheres with sigma={}, pair_well={}, hard_core={}",
            parameters.sigma, parameters.pair_well, parameters.hard_core
        );

        return Ok(PairedHardSpheres {
            parameters: parameters,
            sigma2: parameters.sigma * parameters.sigma,
            rng: ChaCha8Rng::seed_from_u64(parameters.seed),
        });
    }

    /// Create a new interaction from JSON-formatted parameters
    pub fn from_json(parameters: &str) -> Result<PairedHardSpheres, Error> {
        let parameters = serde_json::from_str::<PairedHardSpheresParameters>(parameters)?;
        return PairedHardSpheres::new(parameters);
    }

    /// Get the parameters used to create this interaction
    pub fn parameters(&self) -> &PairedHardSpheresParameters {
        &self.parameters
    }

    /// Get the diameter of the spheres
    pub fn sigma(&self) -> f64 {
        self.parameters.sigma
    }

    /// Probability for a colliding pair to be captured when no pair is bonded
    pub fn capture_probability(&self) -> f64 {
        if self.parameters.hard_core {
            return 0.0;
        }
        return f64::min(1.0, f64::exp(self.parameters.pair_well));
    }

    /// Probability for the bonded pair to escape when it reaches the contact
    /// distance from inside.
    ///
    /// This is `min(1, exp(-w))` and not `1 - exp(-w)`: together with the
    /// capture probability `min(1, exp(w))` it keeps detailed balance between
    /// the bonded and unbonded states for any sign of `w`.
    pub fn escape_probability(&self) -> f64 {
        if self.parameters.hard_core {
            return 0.0;
        }
        return f64::min(1.0, f64::exp(-self.parameters.pair_well));
    }

    /// Get the time until the next collision between `first` and `second`.
    ///
    /// The positions stored in the `system` correspond to the current time
    /// minus `false_time`: the position of particle `i` now is `positions[i] +
    /// false_time * velocities[i]`. The returned time is measured from the
    /// stored positions, and includes `false_time`. If the particles will
    /// never collide, this returns `f64::INFINITY`.
    ///
    /// For the bonded pair, this is the time at which the two particles reach
    /// the contact distance from inside. If they are not overlapping, the
    /// bond state is corrupted and this returns `Error::Inconsistent`.
    pub fn collision_time(
        &self,
        system: &dyn System,
        bond: &BondState,
        first: usize,
        second: usize,
        false_time: f64,
    ) -> Result<f64, Error> {
        let (dr, dv) = relative_motion(system, first, second, false_time);

        let time = match bond.classify(first, second) {
            PairState::Bonded => {
                separation_time(dr, dv, self.sigma2).ok_or_else(|| Error::Inconsistent(format!(
                    "bonded pair ({}, {}) is not overlapping: distance is {} for sigma={}",
                    first, second, dr.norm(), self.parameters.sigma
                )))?
            }
            PairState::Candidate | PairState::Blocked => approach_time(dr, dv, self.sigma2),
        };

        return Ok(time + false_time);
    }

    /// Resolve the collision between `first` and `second` happening
    /// `false_time` after the stored positions, at simulation time `time`.
    ///
    /// This decides the outcome of the collision, updates the velocities of
    /// both particles and the bond state, and corrects the stored positions
    /// so that the particles are exactly at contact after `false_time`.
    #[allow(clippy::float_cmp)]
    #[time_graph::instrument(name = "PairedHardSpheres::resolve")]
    pub fn resolve(
        &mut self,
        system: &mut dyn System,
        bond: &mut BondState,
        first: usize,
        second: usize,
        false_time: f64,
        time: f64,
    ) -> Result<CollisionEvent, Error> {
        let (dr, dv) = relative_motion(&*system, first, second, false_time);
        let r2 = dr.norm2();
        let bij = dr * dv;
        if r2 == 0.0 {
            return Err(Error::Inconsistent(format!(
                "particles {} and {} are at the same position", first, second
            )));
        }

        let state = bond.classify(first, second);
        if state == PairState::Bonded {
            let discriminant = bij * bij - dv.norm2() * (r2 - self.sigma2);
            if discriminant < 0.0 {
                return Err(Error::Inconsistent(format!(
                    "bonded pair ({}, {}) is not overlapping: distance is {} for sigma={}",
                    first, second, r2.sqrt(), self.parameters.sigma
                )));
            }
        }

        let outcome = match state {
            PairState::Bonded => {
                if bij <= 0.0 {
                    return Err(Error::Inconsistent(format!(
                        "bonded pair ({}, {}) resolved while moving toward each other",
                        first, second
                    )));
                }

                if self.draw(self.escape_probability()) {
                    CollisionOutcome::Escape
                } else {
                    CollisionOutcome::InternalBounce
                }
            }
            PairState::Candidate => {
                if bij <= 0.0 && self.draw(self.capture_probability()) {
                    CollisionOutcome::Capture
                } else {
                    CollisionOutcome::ExternalBounce
                }
            }
            PairState::Blocked => CollisionOutcome::ExternalBounce,
        };

        let inverse_masses = system.inverse_masses();
        let (inv_mass_first, inv_mass_second) = (inverse_masses[first], inverse_masses[second]);

        let virial = match outcome {
            CollisionOutcome::Capture | CollisionOutcome::Escape => 0.0,
            CollisionOutcome::InternalBounce | CollisionOutcome::ExternalBounce => {
                let inverse_masses_sum = inv_mass_first + inv_mass_second;
                if inverse_masses_sum == 0.0 {
                    return Err(Error::Inconsistent(format!(
                        "collision between two immovable particles ({}, {})",
                        first, second
                    )));
                }
                2.0 * bij / inverse_masses_sum
            }
        };

        let impulse = (virial / r2) * dr;
        if virial != 0.0 {
            let (positions, velocities) = system.dynamics_mut();
            velocities[first] += inv_mass_first * impulse;
            velocities[second] -= inv_mass_second * impulse;
            positions[first] -= (false_time * inv_mass_first) * impulse;
            positions[second] += (false_time * inv_mass_second) * impulse;
        }

        match outcome {
            CollisionOutcome::Capture => {
                log::debug!("pair ({}, {}) captured at t={}", first, second, time);
                bond.set(first, second);
            }
            CollisionOutcome::Escape => {
                log::debug!("pair ({}, {}) escaped at t={}", first, second, time);
                bond.clear();
            }
            CollisionOutcome::InternalBounce | CollisionOutcome::ExternalBounce => {}
        }

        return Ok(CollisionEvent {
            first: first,
            second: second,
            outcome: outcome,
            virial: virial,
            impulse: impulse,
            time: time,
            false_time: false_time,
            bond: *bond,
        });
    }

    /// Draw a random number and check it against `probability`. Certain
    /// events do not consume random numbers.
    fn draw(&mut self, probability: f64) -> bool {
        if probability >= 1.0 {
            return true;
        } else if probability <= 0.0 {
            return false;
        }
        return self.rng.gen::<f64>() < probability;
    }
}

/// Get the nearest image separation `r_second - r_first` and relative
/// velocity `v_second - v_first` of two particles, `false_time` after the
/// stored positions.
fn relative_motion(system: &dyn System, first: usize, second: usize, false_time: f64) -> (Vector3D, Vector3D) {
    let positions = system.positions();
    let velocities = system.velocities();

    let dv = velocities[second] - velocities[first];
    let mut dr = positions[second] - positions[first] + false_time * dv;
    system.boundary().nearest_image(&mut dr);

    return (dr, dv);
}
