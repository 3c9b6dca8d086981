//! Volume type: a 3-D scalar grid with physical metadata.
//!
//! Index space uses tensor layout `[Z, Y, X]`; physical points are `(x, y, z)`
//! row vectors, so point component 0 addresses the last (fastest) tensor axis.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{CoreError, Result};
use crate::spatial::{Direction3, Point3, Spacing3};

/// A 3-D scalar volume with physical space metadata.
///
/// Volumes are read-only: every operation that changes voxel data produces a
/// new `Volume`. Two coordinate systems are involved:
///
/// * **Index space** — continuous voxel indices `(x, y, z)`.
/// * **Physical space** — continuous coordinates in mm.
///
/// The mapping is `point = origin + direction * (index .* spacing)`.
#[derive(Debug, Clone)]
pub struct Volume<B: Backend> {
    data: Tensor<B, 3>,
    origin: Point3,
    spacing: Spacing3,
    direction: Direction3,
}

impl<B: Backend> Volume<B> {
    /// Create a new volume from voxel data and metadata.
    pub fn new(data: Tensor<B, 3>, origin: Point3, spacing: Spacing3, direction: Direction3) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Convenience constructor for an axis-aligned volume at the world origin
    /// with unit spacing. Common in tests and synthetic data.
    pub fn from_data(data: Tensor<B, 3>) -> Self {
        Self::new(
            data,
            Point3::origin(),
            crate::spatial::uniform_spacing(1.0),
            Direction3::identity(),
        )
    }

    /// The voxel data tensor.
    pub fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    /// Physical coordinate of voxel `(0, 0, 0)`.
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Physical distance between adjacent voxels per axis.
    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    /// Orientation of the volume axes.
    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    /// Tensor shape as `[Z, Y, X]`.
    pub fn shape(&self) -> [usize; 3] {
        self.data
            .shape()
            .dims
            .try_into()
            .expect("Tensor rank mismatch")
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        let [d, h, w] = self.shape();
        d * h * w
    }

    /// True when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.shape().iter().any(|&d| d == 0)
    }

    /// New volume with the same metadata but different voxel data.
    ///
    /// The data must have the same shape as the current volume.
    pub fn with_data(&self, data: Tensor<B, 3>) -> Self {
        Self::new(data, self.origin, self.spacing, self.direction)
    }

    /// True when `other` lives on the same grid (shape, origin, spacing and
    /// direction all match).
    pub fn same_grid_as(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.origin == other.origin
            && self.spacing == other.spacing
            && self.direction == other.direction
    }

    /// Batch transform physical points to continuous indices.
    ///
    /// `points` has shape `[N, 3]` with `(x, y, z)` rows; the result has the
    /// same shape and contains continuous `(x, y, z)` indices. Fails when the
    /// direction matrix is singular and cannot be inverted.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let device = points.device();

        let origin_vec: Vec<f32> = (0..3).map(|i| self.origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(
            TensorData::new(origin_vec, Shape::new([3])),
            &device,
        )
        .reshape([1, 3]);

        // I = (P - O) @ T with T[r][c] = inv_dir[(c, r)] / spacing[c]
        let inv_dir = self.direction.try_inverse().ok_or_else(|| {
            CoreError::transform(format!(
                "direction matrix is singular: {:?}",
                self.direction
            ))
        })?;

        let mut t_data = Vec::with_capacity(9);
        for r in 0..3 {
            for c in 0..3 {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor =
            Tensor::<B, 2>::from_data(TensorData::new(t_data, Shape::new([3, 3])), &device);

        Ok((points - origin_tensor).matmul(t_tensor))
    }

    /// Batch transform continuous indices to physical points.
    ///
    /// Inverse of [`Self::world_to_index_tensor`].
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();

        let origin_vec: Vec<f32> = (0..3).map(|i| self.origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(
            TensorData::new(origin_vec, Shape::new([3])),
            &device,
        )
        .reshape([1, 3]);

        // P = O + I @ M with M[r][c] = spacing[r] * direction[(c, r)]
        let mut m_data = Vec::with_capacity(9);
        for r in 0..3 {
            for c in 0..3 {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m_tensor =
            Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([3, 3])), &device);

        indices.matmul(m_tensor) + origin_tensor
    }
}
