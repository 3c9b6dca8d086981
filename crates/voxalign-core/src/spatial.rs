//! Spatial metadata types for 3-D volumes.
//!
//! Thin aliases over nalgebra types. Point components are ordered `(x, y, z)`,
//! where `x` corresponds to the fastest-varying tensor axis (see [`crate::volume`]).

/// A position in physical space, in mm.
pub type Point3 = nalgebra::Point3<f64>;

/// A displacement in physical space.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Physical distance between adjacent voxels along each axis.
///
/// Alias to [`Vector3`] for semantic clarity; component `i` is the spacing
/// along point axis `i` (x, y, z).
pub type Spacing3 = Vector3;

/// Orientation of the volume axes in physical space; column `i` is the
/// direction of point axis `i`.
pub type Direction3 = nalgebra::Matrix3<f64>;

/// Uniform spacing with the same value for every axis.
pub fn uniform_spacing(value: f64) -> Spacing3 {
    Spacing3::new(value, value, value)
}

/// Axis-aligned orientation.
pub fn identity_direction() -> Direction3 {
    Direction3::identity()
}

/// True when every spacing component is strictly positive and finite.
pub fn spacing_is_valid(spacing: &Spacing3) -> bool {
    (0..3).all(|i| spacing[i].is_finite() && spacing[i] > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_spacing() {
        let s = uniform_spacing(2.5);
        assert_eq!(s, Spacing3::new(2.5, 2.5, 2.5));
    }

    #[test]
    fn test_spacing_validity() {
        assert!(spacing_is_valid(&Spacing3::new(1.0, 0.5, 2.0)));
        assert!(!spacing_is_valid(&Spacing3::new(1.0, 0.0, 2.0)));
        assert!(!spacing_is_valid(&Spacing3::new(-1.0, 1.0, 1.0)));
        assert!(!spacing_is_valid(&Spacing3::new(f64::NAN, 1.0, 1.0)));
    }
}
