//! Candidate ranking and winner selection.

use burn::tensor::backend::Backend;
use voxalign_core::{AnyTransform, Volume};

use crate::error::{RegistrationError, Result};

/// The outcome of one registration attempt.
///
/// Ephemeral: candidates live only until ranking completes and are never
/// persisted themselves.
#[derive(Debug, Clone)]
pub struct Candidate<B: Backend> {
    /// Zero-based attempt index that produced this candidate.
    pub attempt: usize,
    /// Candidate mapping from fixed into moving physical space.
    pub transform: AnyTransform,
    /// Mask-weighted composite disagreement (lower is better).
    pub composite_score: f64,
    /// Per-region breakdown in input mask order.
    pub per_region: Vec<f64>,
    /// The solver's native similarity (lower is better).
    pub native_score: f64,
    /// Warped moving volume, retained only when `save_images` is set.
    pub warped: Option<Volume<B>>,
}

impl<B: Backend> Candidate<B> {
    /// The fixed combination rule reconciling the two metrics:
    /// `composite_score + native_score / 2`. Ascending; lower is better.
    pub fn ranking_key(&self) -> f64 {
        self.composite_score + self.native_score / 2.0
    }
}

/// Candidate indices ordered best-first by ranking key.
///
/// The sort is stable, so ties keep the original attempt order. NaN keys sink
/// to the end rather than poisoning the order.
pub fn rank_order<B: Backend>(candidates: &[Candidate<B>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let ka = candidates[a].ranking_key();
        let kb = candidates[b].ranking_key();
        match (ka.is_nan(), kb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal),
        }
    });
    order
}

/// Select the winning candidate's index.
///
/// Fails with [`RegistrationError::NoCandidates`] on an empty sequence: a
/// batch where every attempt failed is a distinct, reportable condition. The
/// identity fallback is the orchestrator's policy, never the ranker's.
pub fn select_best<B: Backend>(candidates: &[Candidate<B>]) -> Result<usize> {
    rank_order(candidates)
        .into_iter()
        .next()
        .ok_or(RegistrationError::NoCandidates)
}
