//! Solver configuration.
//!
//! Time-integration parameters for dynamic solves and the runtime
//! settings consumed by the static and live session drivers.

use formfind_types::constants::{
    DEFAULT_DAMPING, DEFAULT_LIVE_ITERATIONS, DEFAULT_MASS, DEFAULT_STATIC_ITERATIONS,
    DEFAULT_TIME_STEP,
};
use formfind_types::{FormfindError, FormfindResult};
use serde::{Deserialize, Serialize};

/// Mass, damping and time step for dynamic (time-stepped) solves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dynamics {
    /// Uniform per-point mass (> 0).
    pub mass: f64,
    /// Velocity retention factor in `[0, 1]`; 1.0 keeps all velocity.
    pub damping: f64,
    /// Time step `h` (> 0).
    pub time_step: f64,
}

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            mass: DEFAULT_MASS,
            damping: DEFAULT_DAMPING,
            time_step: DEFAULT_TIME_STEP,
        }
    }
}

impl Dynamics {
    /// Heavily damped preset: settles quickly, useful for form-finding.
    pub fn settling() -> Self {
        Self {
            damping: 0.5,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FormfindResult<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(FormfindError::InvalidConfig(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        validate_damping(self.damping)?;
        validate_time_step(self.time_step)
    }

    /// Inertia coefficient `m / h²` on the system diagonal.
    pub fn inertia(&self) -> f64 {
        self.mass / (self.time_step * self.time_step)
    }
}

pub(crate) fn validate_damping(damping: f64) -> FormfindResult<()> {
    if (0.0..=1.0).contains(&damping) {
        Ok(())
    } else {
        Err(FormfindError::InvalidConfig(format!(
            "damping must lie in [0, 1], got {damping}"
        )))
    }
}

pub(crate) fn validate_time_step(time_step: f64) -> FormfindResult<()> {
    if time_step.is_finite() && time_step > 0.0 {
        Ok(())
    } else {
        Err(FormfindError::InvalidConfig(format!(
            "time step must be positive, got {time_step}"
        )))
    }
}

fn validate_iterations(iterations: u32) -> FormfindResult<()> {
    if iterations == 0 {
        return Err(FormfindError::InvalidConfig(
            "iterations must be at least 1".into(),
        ));
    }
    Ok(())
}

/// How `initialize()` builds the global system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SolveMode {
    /// Pure constraint projection: system `AᵀA`.
    #[default]
    Static,
    /// Time-stepped: system `M/h² + AᵀA`, forces and velocities.
    Dynamic(Dynamics),
}

impl SolveMode {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, SolveMode::Dynamic(_))
    }
}

/// Settings for a one-shot static run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticSettings {
    pub iterations: u32,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_STATIC_ITERATIONS,
        }
    }
}

impl StaticSettings {
    pub fn validate(&self) -> FormfindResult<()> {
        validate_iterations(self.iterations)
    }
}

/// Settings for one step of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveSettings {
    /// Local/global iterations per step.
    pub iterations: u32,
    pub mass: f64,
    pub damping: f64,
    pub time_step: f64,
    /// Time-stepped (`true`) or static projection (`false`).
    pub dynamic: bool,
    /// Ask the caller not to schedule another step.
    pub pause: bool,
    /// Rebuild the solver from the current points and signatures.
    pub reset: bool,
    /// Uniform force on every point, dynamic mode only.
    #[serde(rename = "unaryForceVector", skip_serializing_if = "Option::is_none")]
    pub unary_force: Option<[f64; 3]>,
}

impl Default for LiveSettings {
    fn default() -> Self {
        let dynamics = Dynamics::default();
        Self {
            iterations: DEFAULT_LIVE_ITERATIONS,
            mass: dynamics.mass,
            damping: dynamics.damping,
            time_step: dynamics.time_step,
            dynamic: true,
            pause: false,
            reset: true,
            unary_force: None,
        }
    }
}

impl LiveSettings {
    pub fn dynamics(&self) -> Dynamics {
        Dynamics {
            mass: self.mass,
            damping: self.damping,
            time_step: self.time_step,
        }
    }

    /// Static or dynamic mode as requested.
    pub fn solve_mode(&self) -> SolveMode {
        if self.dynamic {
            SolveMode::Dynamic(self.dynamics())
        } else {
            SolveMode::Static
        }
    }

    pub fn validate(&self) -> FormfindResult<()> {
        validate_iterations(self.iterations)?;
        self.dynamics().validate()
    }
}

/// Runtime settings for either driver, tagged by `"mode"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RuntimeSettings {
    Static(StaticSettings),
    Live(LiveSettings),
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        RuntimeSettings::Static(StaticSettings::default())
    }
}

impl RuntimeSettings {
    /// Parses and validates settings sent by the host.
    pub fn from_json(text: &str) -> FormfindResult<Self> {
        let settings: Self = serde_json::from_str(text)
            .map_err(|e| FormfindError::Serialization(format!("runtime settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn iterations(&self) -> u32 {
        match self {
            RuntimeSettings::Static(s) => s.iterations,
            RuntimeSettings::Live(l) => l.iterations,
        }
    }

    pub fn validate(&self) -> FormfindResult<()> {
        match self {
            RuntimeSettings::Static(s) => s.validate(),
            RuntimeSettings::Live(l) => l.validate(),
        }
    }
}
