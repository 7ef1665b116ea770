//! Measurements driven by resolved collisions.
//!
//! Meters implement [`CollisionListener`] and receive every
//! [`CollisionEvent`] right after it was resolved, together with the system
//! in its post-collision state. [`DirectCavity`] is the exception, and
//! samples configurations at the times chosen by the caller.

use crate::{BondState, CollisionEvent, CollisionOutcome, Error, System};

mod cavity;
pub use self::cavity::{MappedCavity, MappedCavityParameters, Weighting};

mod cavity_direct;
pub use self::cavity_direct::{DirectCavity, DirectCavityParameters};

mod contact_ratio;
pub use self::contact_ratio::ContactRatio;

mod paired_fraction;
pub use self::paired_fraction::PairedFraction;

mod pressure;
pub use self::pressure::PressureHard;

/// Trait for everything that needs to know about resolved collisions
pub trait CollisionListener {
    /// Process a single collision `event`. The `system` contains the
    /// particles after the collision was resolved.
    fn collision_action(&mut self, event: &CollisionEvent, system: &dyn System) -> Result<(), Error>;
}

/// Send the same `event` to all the `listeners`, in order, stopping at the
/// first error.
pub fn notify(
    listeners: &mut [&mut dyn CollisionListener],
    event: &CollisionEvent,
    system: &dyn System,
) -> Result<(), Error> {
    for listener in listeners {
        listener.collision_action(event, system)?;
    }
    return Ok(());
}

/// Time accounting of the bonded and unbonded states, driven by capture and
/// escape events.
#[derive(Debug, Clone)]
pub(crate) struct BondClock {
    /// is a pair currently bonded
    bonded: bool,
    /// time of the last reset
    reset_time: f64,
    /// time of the last capture, escape or reset
    last_switch: f64,
    /// time of the last event
    last_event: f64,
    /// time spent bonded between the last reset and the last switch
    bonded_time: f64,
    /// time spent unbonded between the last reset and the last switch
    unbonded_time: f64,
}

impl BondClock {
    pub fn new(bond: &BondState, time: f64) -> BondClock {
        BondClock {
            bonded: bond.is_bonded(),
            reset_time: time,
            last_switch: time,
            last_event: time,
            bonded_time: 0.0,
            unbonded_time: 0.0,
        }
    }

    pub fn reset_time(&self) -> f64 {
        self.reset_time
    }

    /// Check that `time` is not before any time this clock already saw
    pub fn check_time(&self, time: f64) -> Result<(), Error> {
        if time < self.last_event {
            return Err(Error::Inconsistent(format!(
                "got time {} after an event at time {}", time, self.last_event
            )));
        }
        return Ok(());
    }

    /// Update the clock with a new event
    pub fn record(&mut self, event: &CollisionEvent) -> Result<(), Error> {
        self.check_time(event.time)?;
        self.last_event = event.time;

        match event.outcome {
            CollisionOutcome::Capture => {
                if self.bonded {
                    return Err(Error::Inconsistent(format!(
                        "pair ({}, {}) captured while another pair is bonded",
                        event.first, event.second
                    )));
                }
                self.unbonded_time += event.time - self.last_switch;
                self.last_switch = event.time;
                self.bonded = true;
            }
            CollisionOutcome::Escape => {
                if !self.bonded {
                    return Err(Error::Inconsistent(format!(
                        "pair ({}, {}) escaped while no pair is bonded",
                        event.first, event.second
                    )));
                }
                self.bonded_time += event.time - self.last_switch;
                self.last_switch = event.time;
                self.bonded = false;
            }
            CollisionOutcome::InternalBounce | CollisionOutcome::ExternalBounce => {}
        }

        return Ok(());
    }

    /// Get the time spent bonded and unbonded since the last reset, up to
    /// `time`
    pub fn times(&self, time: f64) -> Result<(f64, f64), Error> {
        self.check_time(time)?;
        let current = time - self.last_switch;
        if self.bonded {
            return Ok((self.bonded_time + current, self.unbonded_time));
        } else {
            return Ok((self.bonded_time, self.unbonded_time + current));
        }
    }

    /// Restart the time accounting at `time`, keeping the bonded state
    pub fn reset(&mut self, time: f64) -> Result<(), Error> {
        self.check_time(time)?;
        self.reset_time = time;
        self.last_switch = time;
        self.last_event = time;
        self.bonded_time = 0.0;
        self.unbonded_time = 0.0;
        return Ok(());
    }
}
