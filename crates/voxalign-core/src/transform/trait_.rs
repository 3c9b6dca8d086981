//! Spatial transform trait.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// A forward-applicable spatial mapping between physical spaces.
///
/// By the resampling convention used throughout voxalign, a transform maps
/// points of the *fixed* (reference) physical space into the *moving*
/// (source) physical space, which is the direction needed to pull moving
/// voxels onto the fixed grid.
pub trait SpatialTransform<B: Backend> {
    /// Apply the transform to a batch of `(x, y, z)` points of shape `[N, 3]`.
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}
