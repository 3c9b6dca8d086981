//! Subject data provisioning contract.
//!
//! Loading and decoding medical images is an external concern; the
//! orchestrator consumes it through this trait only.

use burn::tensor::backend::Backend;
use voxalign_core::Volume;

use crate::error::Result;

/// A region-of-interest mask with its importance weight.
///
/// Masks are aligned to the fixed volume's grid and may be binary or soft.
/// Weights are used as given in composite scoring, never renormalized.
#[derive(Debug, Clone)]
pub struct WeightedMask<B: Backend> {
    pub mask: Volume<B>,
    pub weight: f64,
}

/// Everything needed to register one subject.
#[derive(Debug, Clone)]
pub struct SubjectData<B: Backend> {
    /// Stationary reference volume.
    pub fixed: Volume<B>,
    /// Candidate moving volumes, one per imaging channel; the batch
    /// configuration selects which channel is registered.
    pub moving_channels: Vec<Volume<B>>,
    /// Ordered region masks; order defines the per-region score breakdown.
    pub regions: Vec<WeightedMask<B>>,
}

/// External data provisioning collaborator.
///
/// A failure is reported as [`crate::RegistrationError::DataUnavailable`] and
/// recovered by persisting the identity fallback for that subject; it never
/// aborts the batch.
pub trait SubjectDataProvider<B: Backend>: Sync {
    /// Load the volumes and region masks for one subject.
    fn subject_data(&self, subject_id: &str) -> Result<SubjectData<B>>;
}
