//! Resampling of a volume onto another volume's grid through a transform.

use burn::tensor::backend::Backend;
use burn::tensor::Shape;

use crate::error::{CoreError, Result};
use crate::grid::dense_index_grid;
use crate::interpolation::trilinear;
use crate::transform::SpatialTransform;
use crate::volume::Volume;

/// Resample `input` onto the grid of `reference` through `transform`.
///
/// The transform maps reference physical points into input physical space
/// (the resampling direction). The result always has the reference grid's
/// shape, origin, spacing and direction, which is the invariant every
/// persisted transform must satisfy. Fails when the input volume has an
/// empty extent (there is nothing to sample) or a singular direction matrix.
pub fn resample_onto<B: Backend, T: SpatialTransform<B>>(
    input: &Volume<B>,
    reference: &Volume<B>,
    transform: &T,
) -> Result<Volume<B>> {
    if input.is_empty() {
        return Err(CoreError::transform(format!(
            "cannot resample from a volume with empty extent {:?}",
            input.shape()
        )));
    }

    let device = input.data().device();
    let shape = reference.shape();

    // 1. Dense grid of reference indices
    let ref_indices = dense_index_grid::<B>(shape, &device);

    // 2. Reference indices -> reference physical points
    let ref_points = reference.index_to_world_tensor(ref_indices);

    // 3. Map into input physical space
    let input_points = transform.transform_points(ref_points);

    // 4. Input physical points -> input continuous indices
    let input_indices = input.world_to_index_tensor(input_points)?;

    // 5. Sample and reshape to the reference grid
    let flat = trilinear(input.data(), input_indices);
    let data = flat.reshape(Shape::new(shape));

    Ok(Volume::new(
        data,
        *reference.origin(),
        *reference.spacing(),
        *reference.direction(),
    ))
}
