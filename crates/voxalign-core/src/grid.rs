//! Dense index grid generation.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the dense grid of continuous indices for a `[Z, Y, X]` shape.
///
/// Returns a tensor of shape `[N, 3]` where `N = Z * Y * X`, with `(x, y, z)`
/// rows in voxel scan order (z slowest, x fastest) — the same order produced
/// by flattening the volume tensor.
pub fn dense_index_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let [d, h, w] = shape;
    let total = d * h * w;

    let mut grid = Vec::with_capacity(total * 3);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}
