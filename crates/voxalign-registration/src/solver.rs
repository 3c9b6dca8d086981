//! Registration solver contract.
//!
//! The concrete optimizer is an external collaborator; the orchestrator only
//! depends on this trait. Solvers are non-deterministic across invocations by
//! design (randomized initialization), so the per-attempt seed is an explicit
//! input rather than hidden global randomness.

use burn::tensor::backend::Backend;
use voxalign_core::{AnyTransform, Volume};

use crate::cancel::CancelToken;
use crate::config::RegistrationMethod;
use crate::error::Result;

/// Per-attempt context handed to the solver.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    /// Zero-based attempt index within the subject's run loop.
    pub attempt: usize,
    /// Seed for this attempt's randomized initialization.
    pub seed: u64,
    /// Requested transform family.
    pub method: RegistrationMethod,
    /// Cooperative cancellation; solvers should poll this during iteration.
    pub cancel: CancelToken,
}

/// One candidate transform plus the solver's own similarity measure.
#[derive(Debug, Clone)]
pub struct SolverOutput {
    /// Mapping from fixed physical space into moving physical space.
    pub transform: AnyTransform,
    /// Native similarity, lower is better. Comparable across attempts for
    /// one subject, not across subjects.
    pub native_score: f64,
}

/// A black-box registration solver.
///
/// `fixed` and `moving` are feature volumes (the moving side carries the
/// negated feature response, see the orchestrator). Each invocation is
/// logically independent; callers must not assume determinism across calls
/// with identical inputs unless the implementation is seed-faithful.
/// Numerical non-convergence is reported as [`crate::RegistrationError::Solver`]
/// and treated as a per-attempt failure, never a per-subject one.
pub trait RegistrationSolver<B: Backend>: Sync {
    /// Estimate one candidate transform aligning `moving` onto `fixed`.
    fn register(
        &self,
        fixed: &Volume<B>,
        moving: &Volume<B>,
        ctx: &AttemptContext,
    ) -> Result<SolverOutput>;
}
