//! Rigid transform: rotation about a center plus translation.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};

use super::trait_::SpatialTransform;

/// Rigid body transform parameterized by Euler angles, a translation and a
/// rotation center, all in physical units.
///
/// The forward mapping is `p' = R (p - c) + c + t`. Parameters are stored as
/// plain `f64` so the transform round-trips exactly through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Euler angles `(rx, ry, rz)` in radians (roll, pitch, yaw).
    rotation: [f64; 3],
    /// Translation `(tx, ty, tz)` in mm.
    translation: [f64; 3],
    /// Rotation center `(cx, cy, cz)` in mm.
    center: [f64; 3],
}

impl RigidTransform {
    /// Create a rigid transform from explicit parameters.
    pub fn new(rotation: [f64; 3], translation: [f64; 3], center: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
            center,
        }
    }

    /// Pure translation, no rotation.
    pub fn translation_only(translation: [f64; 3]) -> Self {
        Self::new([0.0; 3], translation, [0.0; 3])
    }

    /// Euler angles `(rx, ry, rz)`.
    pub fn rotation(&self) -> [f64; 3] {
        self.rotation
    }

    /// Translation vector.
    pub fn translation(&self) -> [f64; 3] {
        self.translation
    }

    /// Rotation center.
    pub fn center(&self) -> [f64; 3] {
        self.center
    }

    fn rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.rotation[0], self.rotation[1], self.rotation[2])
    }
}

impl<B: Backend> SpatialTransform<B> for RigidTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let r = self.rotation_matrix();

        // Row-vector form: p' = (p - c) @ R^T + (c + t).
        // M[r][c] = R[(c, r)] so that points.matmul(M) applies R.
        let mut m_data = Vec::with_capacity(9);
        for row in 0..3 {
            for col in 0..3 {
                m_data.push(r.matrix()[(col, row)] as f32);
            }
        }
        let m_tensor =
            Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([3, 3])), &device);

        let center_vec: Vec<f32> = self.center.iter().map(|&v| v as f32).collect();
        let center = Tensor::<B, 1>::from_data(TensorData::new(center_vec, Shape::new([3])), &device)
            .reshape([1, 3]);

        let offset_vec: Vec<f32> = (0..3)
            .map(|i| (self.center[i] + self.translation[i]) as f32)
            .collect();
        let offset = Tensor::<B, 1>::from_data(TensorData::new(offset_vec, Shape::new([3])), &device)
            .reshape([1, 3]);

        (points - center).matmul(m_tensor) + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_pure_translation() {
        let device = Default::default();
        let transform = RigidTransform::translation_only([1.0, 2.0, 3.0]);

        let points = Tensor::<B, 2>::from_floats([[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]], &device);
        let out = SpatialTransform::<B>::transform_points(&transform, points).into_data();
        let slice = out.as_slice::<f32>().unwrap();

        assert!((slice[0] - 1.0).abs() < 1e-6);
        assert!((slice[1] - 2.0).abs() < 1e-6);
        assert!((slice[2] - 3.0).abs() < 1e-6);
        assert!((slice[3] - 2.0).abs() < 1e-6);
        assert!((slice[4] - 3.0).abs() < 1e-6);
        assert!((slice[5] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_about_center() {
        let device = Default::default();
        // 90 degrees around Z, centered at (1, 0, 0): (2, 0, 0) -> (1, 1, 0)
        let transform =
            RigidTransform::new([0.0, 0.0, std::f64::consts::FRAC_PI_2], [0.0; 3], [1.0, 0.0, 0.0]);

        let points = Tensor::<B, 2>::from_floats([[2.0, 0.0, 0.0]], &device);
        let out = SpatialTransform::<B>::transform_points(&transform, points).into_data();
        let slice = out.as_slice::<f32>().unwrap();

        assert!((slice[0] - 1.0).abs() < 1e-5);
        assert!((slice[1] - 1.0).abs() < 1e-5);
        assert!(slice[2].abs() < 1e-5);
    }

    #[test]
    fn test_serde_roundtrip_exact() {
        let transform = RigidTransform::new(
            [0.1234567890123, -0.5, 0.25],
            [1.5, -2.25, 0.125],
            [10.0, 20.0, 30.0],
        );
        let json = serde_json::to_string(&transform).unwrap();
        let back: RigidTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(transform, back);
    }
}
