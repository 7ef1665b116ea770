use crate::{BondState, CollisionEvent, Error, System};

use super::{BondClock, CollisionListener};

/// Fraction of the simulation time during which a pair is bonded
#[derive(Debug, Clone)]
pub struct PairedFraction {
    clock: BondClock,
}

impl PairedFraction {
    /// Start measuring at `time`, with the given initial `bond` state
    pub fn new(bond: &BondState, time: f64) -> PairedFraction {
        PairedFraction {
            clock: BondClock::new(bond, time),
        }
    }

    /// Get the fraction of time spent bonded between the last reset and
    /// `time`. This is zero if no time elapsed.
    #[allow(clippy::float_cmp)]
    pub fn fraction(&self, time: f64) -> Result<f64, Error> {
        let (bonded, unbonded) = self.clock.times(time)?;
        if bonded + unbonded == 0.0 {
            return Ok(0.0);
        }
        return Ok(bonded / (bonded + unbonded));
    }

    /// Restart the measurement at `time`
    pub fn reset(&mut self, time: f64) -> Result<(), Error> {
        self.clock.reset(time)
    }
}

impl CollisionListener for PairedFraction {
    fn collision_action(&mut self, event: &CollisionEvent, _: &dyn System) -> Result<(), Error> {
        self.clock.record(event)
    }
}
