//! State-gated human review and override.
//!
//! An override is only meaningful once a subject's run has reached a terminal
//! state, so a [`ReviewSession`] can only be built from a [`SubjectOutcome`]
//! — there is no way to override a subject whose attempts are still in
//! flight. The override itself reuses the store interface with
//! `overwrite = true`.

use burn::tensor::backend::Backend;
use voxalign_core::AnyTransform;

use crate::error::{RegistrationError, Result};
use crate::orchestrator::SubjectOutcome;
use crate::store::TransformStore;

/// Scores and transform of one reviewable candidate; no voxel data.
#[derive(Debug, Clone)]
pub struct ReviewCandidate {
    pub attempt: usize,
    pub transform: AnyTransform,
    pub composite_score: f64,
    pub native_score: f64,
    pub ranking_key: f64,
}

/// A reviewer's verdict for one subject.
#[derive(Debug, Clone)]
pub enum ReviewDecision {
    /// Persist the k-th reviewable candidate (best-first order).
    Accept(usize),
    /// Reject every candidate and persist the identity transform.
    RejectAll,
}

/// Review context for a subject whose run has completed.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    subject_id: String,
    candidates: Vec<ReviewCandidate>,
}

impl ReviewSession {
    /// Build a session from a terminal outcome.
    ///
    /// Returns `None` for outcomes that are not reviewable (`Skipped`,
    /// `Cancelled`): the candidates for those subjects are no longer known.
    pub fn from_outcome<B: Backend>(
        subject_id: impl Into<String>,
        outcome: &SubjectOutcome<B>,
    ) -> Option<Self> {
        let candidates = match outcome {
            SubjectOutcome::Persisted { review, .. } => review
                .iter()
                .map(|c| ReviewCandidate {
                    attempt: c.attempt,
                    transform: c.transform.clone(),
                    composite_score: c.composite_score,
                    native_score: c.native_score,
                    ranking_key: c.ranking_key(),
                })
                .collect(),
            // Reportable/fallback subjects can still be overridden, but only
            // with a rejection (no candidates survive).
            SubjectOutcome::AllAttemptsFailed { .. }
            | SubjectOutcome::FallbackPersisted { .. } => Vec::new(),
            SubjectOutcome::Skipped | SubjectOutcome::Cancelled => return None,
        };
        Some(Self {
            subject_id: subject_id.into(),
            candidates,
        })
    }

    /// The reviewable candidates, best first.
    pub fn candidates(&self) -> &[ReviewCandidate] {
        &self.candidates
    }

    /// The subject under review.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Apply the reviewer's decision through the store, overwriting any
    /// previously persisted transform.
    pub fn apply(&self, store: &TransformStore, decision: &ReviewDecision) -> Result<()> {
        let transform = match decision {
            ReviewDecision::Accept(k) => self
                .candidates
                .get(*k)
                .map(|c| c.transform.clone())
                .ok_or_else(|| {
                    RegistrationError::invalid_configuration(format!(
                        "candidate index {k} out of range ({} reviewable)",
                        self.candidates.len()
                    ))
                })?,
            ReviewDecision::RejectAll => AnyTransform::Identity,
        };
        store.save(&self.subject_id, &transform, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::Candidate;
    use burn_ndarray::NdArray;
    use tempfile::TempDir;
    use voxalign_core::RigidTransform;

    type B = NdArray<f32>;

    fn persisted_outcome() -> SubjectOutcome<B> {
        let winner = Candidate {
            attempt: 1,
            transform: AnyTransform::Rigid(RigidTransform::translation_only([1.0, 0.0, 0.0])),
            composite_score: 0.1,
            per_region: vec![0.1],
            native_score: 0.2,
            warped: None,
        };
        SubjectOutcome::Persisted {
            review: vec![winner.clone()],
            winner,
        }
    }

    #[test]
    fn test_not_reviewable_while_unknown() {
        assert!(ReviewSession::from_outcome("s", &SubjectOutcome::<B>::Skipped).is_none());
        assert!(ReviewSession::from_outcome("s", &SubjectOutcome::<B>::Cancelled).is_none());
    }

    #[test]
    fn test_accept_overwrites_record() {
        let dir = TempDir::new().unwrap();
        let store = TransformStore::new(dir.path()).unwrap();
        store.save("s", &AnyTransform::Identity, false).unwrap();

        let session = ReviewSession::from_outcome("s", &persisted_outcome()).unwrap();
        session.apply(&store, &ReviewDecision::Accept(0)).unwrap();

        let loaded = store.load("s").unwrap();
        assert!(!loaded.is_identity());
    }

    #[test]
    fn test_reject_all_persists_identity() {
        let dir = TempDir::new().unwrap();
        let store = TransformStore::new(dir.path()).unwrap();
        store
            .save(
                "s",
                &AnyTransform::Rigid(RigidTransform::translation_only([1.0, 0.0, 0.0])),
                false,
            )
            .unwrap();

        let session = ReviewSession::from_outcome("s", &persisted_outcome()).unwrap();
        session.apply(&store, &ReviewDecision::RejectAll).unwrap();

        assert!(store.load("s").unwrap().is_identity());
    }

    #[test]
    fn test_accept_out_of_range_rejected() {
        let dir = TempDir::new().unwrap();
        let store = TransformStore::new(dir.path()).unwrap();
        let session = ReviewSession::from_outcome("s", &persisted_outcome()).unwrap();
        assert!(session.apply(&store, &ReviewDecision::Accept(5)).is_err());
    }
}
