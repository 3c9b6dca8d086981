//! Mask-weighted composite disagreement metric.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use voxalign_core::{CoreError, Volume};

use crate::error::Result;
use crate::provider::WeightedMask;

/// Composite score plus the per-region breakdown, in input mask order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionScore {
    /// `sum(weight_i * region_value_i)` over all regions.
    pub composite: f64,
    /// Unweighted per-region disagreement values.
    pub per_region: Vec<f64>,
}

/// Region-localized quality metric for a warped candidate.
///
/// Implementations must be pure functions of their inputs: zero for a perfect
/// match and monotonically increasing with misalignment.
pub trait RegionMetric<B: Backend>: Sync {
    /// Score the disagreement between the warped and fixed feature volumes
    /// over the given weighted regions.
    fn evaluate(
        &self,
        fixed: &Volume<B>,
        warped: &Volume<B>,
        regions: &[WeightedMask<B>],
    ) -> Result<RegionScore>;
}

/// Masked mean absolute difference.
///
/// Per region: `sum(|warped - fixed| * mask) / sum(mask)` over the mask's
/// active voxels. An empty mask (no active voxels) contributes the defined
/// sentinel value `0.0` rather than a division by zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskedMeanAbsoluteDifference;

impl MaskedMeanAbsoluteDifference {
    /// Create the metric.
    pub fn new() -> Self {
        Self
    }
}

const EMPTY_MASK_EPS: f64 = 1e-12;

impl<B: Backend> RegionMetric<B> for MaskedMeanAbsoluteDifference {
    fn evaluate(
        &self,
        fixed: &Volume<B>,
        warped: &Volume<B>,
        regions: &[WeightedMask<B>],
    ) -> Result<RegionScore> {
        if fixed.shape() != warped.shape() {
            return Err(CoreError::ShapeMismatch {
                expected: fixed.shape(),
                actual: warped.shape(),
            }
            .into());
        }

        let diff = (warped.data().clone() - fixed.data().clone()).abs();

        let mut composite = 0.0;
        let mut per_region = Vec::with_capacity(regions.len());
        for region in regions {
            if region.mask.shape() != fixed.shape() {
                return Err(CoreError::ShapeMismatch {
                    expected: fixed.shape(),
                    actual: region.mask.shape(),
                }
                .into());
            }

            let mask = region.mask.data().clone();
            let active = scalar(mask.clone().sum());
            let value = if active <= EMPTY_MASK_EPS {
                0.0
            } else {
                scalar((diff.clone() * mask).sum()) / active
            };

            composite += region.weight * value;
            per_region.push(value);
        }

        Ok(RegionScore {
            composite,
            per_region,
        })
    }
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}
