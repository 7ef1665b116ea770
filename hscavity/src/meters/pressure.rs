use crate::systems::kinetic_temperature;
use crate::{CollisionEvent, Error, System};

use super::CollisionListener;

/// Pressure of a hard spheres system, from the kinetic temperature and the
/// virial of all collisions: `P = ρT - Σ virial / (3 V t)`.
#[derive(Debug, Clone)]
pub struct PressureHard {
    reset_time: f64,
    last_event: f64,
    virial_sum: f64,
    last_pressure: f64,
}

impl PressureHard {
    /// Start measuring at `time`
    pub fn new(time: f64) -> PressureHard {
        PressureHard {
            reset_time: time,
            last_event: time,
            virial_sum: 0.0,
            last_pressure: 0.0,
        }
    }

    /// Sum of the collision virials since the last reset
    pub fn virial_sum(&self) -> f64 {
        self.virial_sum
    }

    /// Get the pressure averaged between the last reset and `time`. If no
    /// time elapsed, this returns the previous pressure.
    #[allow(clippy::float_cmp)]
    pub fn pressure(&mut self, time: f64, system: &dyn System) -> Result<f64, Error> {
        if time < self.last_event {
            return Err(Error::Inconsistent(format!(
                "can not compute the pressure at time {} after an event at time {}",
                time, self.last_event
            )));
        }

        let elapsed = time - self.reset_time;
        if elapsed == 0.0 {
            return Ok(self.last_pressure);
        }

        let volume = system.boundary().volume();
        let density = system.size() as f64 / volume;
        let temperature = kinetic_temperature(system);

        self.last_pressure = density * temperature - self.virial_sum / (3.0 * volume * elapsed);
        return Ok(self.last_pressure);
    }

    /// Restart the measurement at `time`
    pub fn reset(&mut self, time: f64) -> Result<(), Error> {
        if time < self.last_event {
            return Err(Error::Inconsistent(format!(
                "can not reset the pressure at time {} after an event at time {}",
                time, self.last_event
            )));
        }
        self.reset_time = time;
        self.last_event = time;
        self.virial_sum = 0.0;
        return Ok(());
    }
}

impl CollisionListener for PressureHard {
    fn collision_action(&mut self, event: &CollisionEvent, _: &dyn System) -> Result<(), Error> {
        if event.time < self.last_event {
            return Err(Error::Inconsistent(format!(
                "got a collision at time {} after an event at time {}",
                event.time, self.last_event
            )));
        }
        self.last_event = event.time;
        self.virial_sum += event.virial;
        return Ok(());
    }
}
