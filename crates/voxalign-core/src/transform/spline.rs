//! Coarse displacement-grid transform (free-form spline).

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use serde::{Deserialize, Serialize};

use super::trait_::SpatialTransform;
use crate::error::{CoreError, Result};
use crate::interpolation::trilinear;

/// Free-form deformation over an axis-aligned grid of control points.
///
/// Each control point carries an `(x, y, z)` displacement in mm; the
/// displacement at an arbitrary physical point is the trilinear interpolation
/// of the surrounding control points, and the forward mapping is
/// `p' = p + d(p)`. Points outside the control grid take the displacement of
/// the nearest border control point.
///
/// Parameters are plain `f64` for exact serde round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineTransform {
    /// Control grid shape `[Z, Y, X]`.
    grid_shape: [usize; 3],
    /// Physical position `(x, y, z)` of control point `(0, 0, 0)`.
    grid_origin: [f64; 3],
    /// Control point spacing `(x, y, z)`, strictly positive.
    grid_spacing: [f64; 3],
    /// Per-control-point displacement `(x, y, z)`, flattened in Z-Y-X order.
    displacement: Vec<[f64; 3]>,
}

impl SplineTransform {
    /// Create a displacement-grid transform.
    ///
    /// Fails when the displacement list does not cover the grid or the
    /// control spacing is not strictly positive.
    pub fn new(
        grid_shape: [usize; 3],
        grid_origin: [f64; 3],
        grid_spacing: [f64; 3],
        displacement: Vec<[f64; 3]>,
    ) -> Result<Self> {
        let expected = grid_shape[0] * grid_shape[1] * grid_shape[2];
        if displacement.len() != expected {
            return Err(CoreError::transform(format!(
                "displacement grid needs {} control points, got {}",
                expected,
                displacement.len()
            )));
        }
        if grid_spacing.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(CoreError::transform(format!(
                "control grid spacing must be strictly positive, got {grid_spacing:?}"
            )));
        }
        Ok(Self {
            grid_shape,
            grid_origin,
            grid_spacing,
            displacement,
        })
    }

    /// Control grid shape `[Z, Y, X]`.
    pub fn grid_shape(&self) -> [usize; 3] {
        self.grid_shape
    }

    /// Per-control-point displacements.
    pub fn displacement(&self) -> &[[f64; 3]] {
        &self.displacement
    }

    fn axis_volume<B: Backend>(&self, axis: usize, device: &B::Device) -> Tensor<B, 3> {
        let values: Vec<f32> = self.displacement.iter().map(|d| d[axis] as f32).collect();
        let total = values.len();
        Tensor::<B, 1>::from_data(TensorData::new(values, Shape::new([total])), device)
            .reshape(self.grid_shape)
    }
}

impl<B: Backend> SpatialTransform<B> for SplineTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();

        // Continuous control-grid indices: (p - origin) / spacing, grid axes
        // are world-aligned.
        let origin_vec: Vec<f32> = self.grid_origin.iter().map(|&v| v as f32).collect();
        let origin = Tensor::<B, 1>::from_data(TensorData::new(origin_vec, Shape::new([3])), &device)
            .reshape([1, 3]);
        let inv_spacing_vec: Vec<f32> =
            self.grid_spacing.iter().map(|&s| (1.0 / s) as f32).collect();
        let inv_spacing =
            Tensor::<B, 1>::from_data(TensorData::new(inv_spacing_vec, Shape::new([3])), &device)
                .reshape([1, 3]);

        let indices = (points.clone() - origin) * inv_spacing;

        let dx = trilinear(&self.axis_volume::<B>(0, &device), indices.clone());
        let dy = trilinear(&self.axis_volume::<B>(1, &device), indices.clone());
        let dz = trilinear(&self.axis_volume::<B>(2, &device), indices);

        let displacement = Tensor::cat(
            vec![
                dx.unsqueeze_dim(1),
                dy.unsqueeze_dim(1),
                dz.unsqueeze_dim(1),
            ],
            1,
        );

        points + displacement
    }
}
