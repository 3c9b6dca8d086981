//! Core primitives for voxalign: 3-D volumes with physical metadata,
//! spatial transforms, resampling and feature filters.
//!
//! Voxel data lives in `burn` tensors so that all per-voxel math is expressed
//! as tensor operations generic over the backend; spatial metadata (origin,
//! spacing, direction) uses `nalgebra` on the CPU.

pub mod error;
pub mod filter;
pub mod grid;
pub mod interpolation;
pub mod resample;
pub mod spatial;
pub mod transform;
pub mod volume;

pub use error::{CoreError, Result};
pub use transform::{AnyTransform, RigidTransform, SpatialTransform, SplineTransform};
pub use volume::Volume;
