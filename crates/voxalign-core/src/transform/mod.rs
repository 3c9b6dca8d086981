//! Spatial transform types.
//!
//! All persisted transforms belong to the closed [`AnyTransform`] set so the
//! store can reconstruct forward-mapping parameters exactly from disk.

pub mod rigid;
pub mod spline;
pub mod trait_;

pub use rigid::RigidTransform;
pub use spline::SplineTransform;
pub use trait_::SpatialTransform;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// The closed set of transforms voxalign produces and persists.
///
/// `Identity` doubles as the fallback sentinel written when a subject's data
/// cannot be loaded or a reviewer rejects every candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyTransform {
    /// No-op mapping; also the fallback sentinel.
    Identity,
    /// Rigid body transform.
    Rigid(RigidTransform),
    /// Coarse displacement-grid transform.
    Spline(SplineTransform),
}

impl AnyTransform {
    /// True for the identity/fallback sentinel.
    pub fn is_identity(&self) -> bool {
        matches!(self, AnyTransform::Identity)
    }
}

impl<B: Backend> SpatialTransform<B> for AnyTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            AnyTransform::Identity => points,
            AnyTransform::Rigid(t) => t.transform_points(points),
            AnyTransform::Spline(t) => t.transform_points(points),
        }
    }
}
