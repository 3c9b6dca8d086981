//! Gaussian smoothing via separable 1-D convolutions.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::convolve_axis;
use crate::spatial::Spacing3;
use crate::volume::Volume;

/// Gaussian smoothing filter with a physical-unit standard deviation.
///
/// The kernel width adapts to each axis' spacing so the smoothing extent is
/// isotropic in physical space.
pub struct GaussianSmoothing {
    sigma: f64,
    max_kernel_width: usize,
}

impl GaussianSmoothing {
    /// Create a smoothing filter with `sigma` in physical units (mm).
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            max_kernel_width: 32,
        }
    }

    /// Cap the kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width;
        self
    }

    /// Smooth a volume; metadata is preserved.
    pub fn apply<B: Backend>(&self, volume: &Volume<B>) -> Volume<B> {
        let data = self.apply_tensor(volume.data().clone(), volume.spacing());
        volume.with_data(data)
    }

    /// Smooth a raw tensor given the spacing of its grid.
    pub fn apply_tensor<B: Backend>(&self, input: Tensor<B, 3>, spacing: &Spacing3) -> Tensor<B, 3> {
        if self.sigma <= 1e-6 {
            return input;
        }

        let mut data = input;
        let device = data.device();

        for axis in 0..3 {
            // Tensor axis 0 is Z; spacing components are ordered (x, y, z).
            let spacing_val = spacing[2 - axis];
            let pixel_sigma = self.sigma / spacing_val;
            let radius = (3.0 * pixel_sigma).ceil() as usize;
            let width = (2 * radius + 1).min(self.max_kernel_width);
            let actual_radius = (width.saturating_sub(1)) / 2;

            let kernel = gaussian_kernel(pixel_sigma, actual_radius);
            let kernel = Tensor::<B, 1>::from_floats(kernel.as_slice(), &device);
            data = convolve_axis(data, kernel, axis);
        }
        data
    }
}

fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut sum = 0.0;

    for i in 0..=(2 * radius) {
        let x = i as f64 - radius as f64;
        let val = (-x * x / two_sigma2).exp();
        kernel.push(val as f32);
        sum += val;
    }
    for val in &mut kernel {
        *val /= sum as f32;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_kernel_normalized() {
        let kernel = gaussian_kernel(1.5, 4);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 9);
    }

    #[test]
    fn test_smoothing_preserves_constant_interior() {
        let device = Default::default();
        let data = vec![2.0f32; 7 * 7 * 7];
        let volume = Volume::from_data(Tensor::<B, 3>::from_data(
            TensorData::new(data, [7, 7, 7]),
            &device,
        ));

        let smoothed = GaussianSmoothing::new(0.5).apply(&volume);
        let out = smoothed.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap();
        // Center voxel, away from zero-padded borders.
        let center = 3 * 49 + 3 * 7 + 3;
        assert!((slice[center] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_sigma_is_noop() {
        let device = Default::default();
        let data: Vec<f32> = (0..27).map(|v| v as f32).collect();
        let volume = Volume::from_data(Tensor::<B, 3>::from_data(
            TensorData::new(data.clone(), [3, 3, 3]),
            &device,
        ));

        let smoothed = GaussianSmoothing::new(0.0).apply(&volume);
        let out = smoothed.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap();
        for (got, want) in slice.iter().zip(data.iter()) {
            assert_eq!(got, want);
        }
    }
}
