//! Immutable batch configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};

/// Which family of transform the solver should estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMethod {
    /// Rigid body (rotation + translation).
    Rigid,
    /// Free-form displacement grid.
    Spline,
}

/// What to do with attempts completed before a cancellation arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Rank and persist whatever candidates finished (default).
    RankPartial,
    /// Discard partial results and report the subject as cancelled.
    Discard,
}

/// Immutable per-batch configuration, passed into the orchestrator
/// constructor. No ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Index of the moving-volume channel to register.
    pub registration_channel: usize,
    /// Transform family requested from the solver.
    pub method: RegistrationMethod,
    /// Number of randomized attempts per subject (>= 1).
    pub runs: usize,
    /// How many top-ranked candidates to expose for review.
    pub plot_best_n: usize,
    /// Retain each ranked candidate's warped volume for downstream rendering.
    pub save_images: bool,
    /// Base seed; per-attempt seeds are derived from it deterministically.
    pub base_seed: u64,
    /// Optional Gaussian presmoothing sigma (mm) for feature extraction.
    pub smoothing_sigma: Option<f64>,
    /// Policy for partially-completed subjects on cancellation.
    pub cancel_policy: CancelPolicy,
    /// Bound for the attempt worker pool; `None` uses the global pool.
    pub max_parallel_attempts: Option<usize>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            registration_channel: 0,
            method: RegistrationMethod::Rigid,
            runs: 10,
            plot_best_n: 3,
            save_images: false,
            base_seed: 0x5eed_0bad_cafe_f00d,
            smoothing_sigma: None,
            cancel_policy: CancelPolicy::RankPartial,
            max_parallel_attempts: None,
        }
    }
}

impl RegistrationConfig {
    /// Check the configuration for values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(RegistrationError::invalid_configuration(
                "runs must be a positive attempt count",
            ));
        }
        if let Some(workers) = self.max_parallel_attempts {
            if workers == 0 {
                return Err(RegistrationError::invalid_configuration(
                    "max_parallel_attempts must be at least 1 when set",
                ));
            }
        }
        Ok(())
    }
}
