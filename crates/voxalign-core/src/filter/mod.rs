//! Volume filters: separable convolution, Gaussian smoothing and the
//! gradient-magnitude feature filter.

pub mod gaussian;
pub mod gradient;

pub use gaussian::GaussianSmoothing;
pub use gradient::GradientMagnitudeFilter;

use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{Shape, Tensor};

/// Convolve a `[Z, Y, X]` tensor with a 1-D kernel along one axis.
///
/// The kernel must have odd length; borders are zero-padded so the output
/// shape matches the input shape. `conv1d` computes cross-correlation, so
/// kernels are passed in output order (no flipping).
pub(crate) fn convolve_axis<B: Backend>(
    input: Tensor<B, 3>,
    kernel: Tensor<B, 1>,
    axis: usize,
) -> Tensor<B, 3> {
    let dims: [usize; 3] = input.shape().dims();

    // Permute the target axis to the last position.
    let (perm, inv_perm): ([isize; 3], [isize; 3]) = match axis {
        0 => ([1, 2, 0], [2, 0, 1]),
        1 => ([0, 2, 1], [0, 2, 1]),
        2 => ([0, 1, 2], [0, 1, 2]),
        _ => panic!("Axis must be 0, 1 or 2"),
    };
    let permuted = input.permute(perm);

    let len = dims[axis];
    let batch: usize = (0..3).filter(|&i| i != axis).map(|i| dims[i]).product();

    // [Batch, Channels=1, Length] for conv1d
    let reshaped = permuted.reshape([batch, 1, len]);

    let kernel_size = kernel.dims()[0];
    let kernel = kernel.reshape([1, 1, kernel_size]);

    let padding = kernel_size / 2;
    let options = ConvOptions::new([1], [padding], [1], 1);
    let convolved = burn::tensor::module::conv1d(reshaped, kernel, None, options);

    // Restore the permuted shape, then undo the permutation.
    let mut permuted_shape = [0usize; 3];
    let mut idx = 0;
    for i in 0..3 {
        if i != axis {
            permuted_shape[idx] = dims[i];
            idx += 1;
        }
    }
    permuted_shape[2] = len;

    convolved.reshape(Shape::new(permuted_shape)).permute(inv_perm)
}
