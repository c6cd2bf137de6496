use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters of one integration run. Immutable once constructed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationSettings {
    mass: f64,
    gravity: f64,
    dt: f64,
    end_time: f64,
}

impl SimulationSettings {
    /// Validates all parameters up front; nothing steps before this passes.
    pub fn new(mass: f64, gravity: f64, dt: f64, end_time: f64) -> Result<Self> {
        if !(mass > 0.0) {
            return Err(Error::config(format!("mass must be positive, got {mass}")));
        }
        if !(gravity > 0.0) {
            return Err(Error::config(format!(
                "gravity must be positive, got {gravity}"
            )));
        }
        if !(dt > 0.0) {
            return Err(Error::config(format!(
                "time step must be positive, got {dt}"
            )));
        }
        if !(end_time > dt) {
            return Err(Error::config(format!(
                "end time ({end_time}) must exceed the time step ({dt})"
            )));
        }
        Ok(Self {
            mass,
            gravity,
            dt,
            end_time,
        })
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Number of samples produced by the fixed-step path: `floor(end_time/dt)`.
    pub fn num_samples(&self) -> usize {
        (self.end_time / self.dt).floor() as usize
    }
}

/// State at `t = 0`, consumed once at the start of a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InitialConditions {
    pub z0: f64,
    pub v0: f64,
}

impl InitialConditions {
    pub fn new(z0: f64, v0: f64) -> Self {
        Self { z0, v0 }
    }
}

/// Mass of a solid cylinder, `pi r^2 h rho`. The reference magnet is a short
/// cylinder described by radius, height and density.
pub fn cylinder_mass(radius: f64, height: f64, density: f64) -> f64 {
    std::f64::consts::PI * radius * radius * height * density
}
