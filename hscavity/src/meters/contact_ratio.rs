use crate::{BondState, CollisionEvent, Error, System};

use super::{BondClock, CollisionListener};

/// Ratio of the contact collision rate of the bonded pair, seen from inside
/// the core, to the contact collision rate of any other pair, seen from
/// outside.
///
/// Internal contacts are internal bounces and escapes, counted per unit of
/// time spent bonded. External contacts are external bounces and captures,
/// counted per pair of particles and per unit of time.
#[derive(Debug, Clone)]
pub struct ContactRatio {
    clock: BondClock,
    internal: u64,
    external: u64,
}

impl ContactRatio {
    /// Start measuring at `time`, with the given initial `bond` state
    pub fn new(bond: &BondState, time: f64) -> ContactRatio {
        ContactRatio {
            clock: BondClock::new(bond, time),
            internal: 0,
            external: 0,
        }
    }

    /// Number of internal contacts since the last reset
    pub fn internal_contacts(&self) -> u64 {
        self.internal
    }

    /// Number of external contacts since the last reset
    pub fn external_contacts(&self) -> u64 {
        self.external
    }

    /// Get the contact ratio between the last reset and `time`. This is
    /// `None` when no time was spent bonded, when there was no external
    /// contact, or when the system contains less than two particles.
    #[allow(clippy::float_cmp)]
    pub fn ratio(&self, time: f64, system: &dyn System) -> Result<Option<f64>, Error> {
        let (bonded, unbonded) = self.clock.times(time)?;
        let n_particles = system.size() as f64;
        if bonded == 0.0 || self.external == 0 || system.size() < 2 {
            return Ok(None);
        }

        let n_pairs = 0.5 * n_particles * (n_particles - 1.0);
        let internal_rate = self.internal as f64 / bonded;
        let external_rate = self.external as f64 / (n_pairs * (bonded + unbonded));
        return Ok(Some(internal_rate / external_rate));
    }

    /// Restart the measurement at `time`
    pub fn reset(&mut self, time: f64) -> Result<(), Error> {
        self.clock.reset(time)?;
        self.internal = 0;
        self.external = 0;
        return Ok(());
    }
}

impl CollisionListener for ContactRatio {
    fn collision_action(&mut self, event: &CollisionEvent, _: &dyn System) -> Result<(), Error> {
        self.clock.record(event)?;
        if event.outcome.is_internal() {
            self.internal += 1;
        } else {
            self.external += 1;
        }
        return Ok(());
    }
}
