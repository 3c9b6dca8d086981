//! Multi-run stochastic registration orchestration.
//!
//! Drives per-subject registration: derive gradient-magnitude feature
//! volumes, invoke a black-box solver `runs` times with randomized seeds,
//! score each candidate with a mask-weighted composite metric, rank by
//! `composite + native/2`, and persist the winner idempotently. Attempt
//! failures are isolated; subject failures never abort a batch.

pub mod cancel;
pub mod config;
pub mod error;
pub mod metric;
pub mod orchestrator;
pub mod provider;
pub mod ranking;
pub mod review;
pub mod solver;
pub mod store;

pub use cancel::CancelToken;
pub use config::{CancelPolicy, RegistrationConfig, RegistrationMethod};
pub use error::{RegistrationError, Result};
pub use metric::{MaskedMeanAbsoluteDifference, RegionMetric, RegionScore};
pub use orchestrator::{BatchSummary, Orchestrator, SubjectOutcome};
pub use provider::{SubjectData, SubjectDataProvider, WeightedMask};
pub use ranking::{rank_order, select_best, Candidate};
pub use review::{ReviewCandidate, ReviewDecision, ReviewSession};
pub use solver::{AttemptContext, RegistrationSolver, SolverOutput};
pub use store::TransformStore;
