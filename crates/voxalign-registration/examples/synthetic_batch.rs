//! Synthetic Batch Example
//!
//! Runs the multi-attempt orchestrator over an in-memory cohort of two
//! synthetic subjects. Each moving volume is the fixed volume with its origin
//! shifted, so the ground-truth alignment is a pure translation; a toy solver
//! proposes noisy translations and the metric ranks the attempts.
//!
//! Usage:
//!   cargo run --example synthetic_batch

use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use voxalign_core::spatial::Point3;
use voxalign_core::{AnyTransform, RigidTransform, Volume};
use voxalign_registration::{
    AttemptContext, CancelToken, Orchestrator, RegistrationConfig, RegistrationError,
    RegistrationSolver, Result, SolverOutput, SubjectData, SubjectDataProvider, TransformStore,
    WeightedMask,
};

type Backend = NdArray<f32>;

const SIZE: usize = 16;

fn blob_volume(origin: Point3) -> Volume<Backend> {
    let device = Default::default();
    let mut values = vec![0.0f32; SIZE * SIZE * SIZE];
    for z in 5..9 {
        for y in 5..9 {
            for x in 5..9 {
                values[z * SIZE * SIZE + y * SIZE + x] = 100.0;
            }
        }
    }
    let data = Tensor::<Backend, 3>::from_data(TensorData::new(values, [SIZE, SIZE, SIZE]), &device);
    Volume::new(
        data,
        origin,
        voxalign_core::spatial::uniform_spacing(1.0),
        voxalign_core::spatial::identity_direction(),
    )
}

fn ones_mask() -> Volume<Backend> {
    let device = Default::default();
    Volume::from_data(Tensor::<Backend, 3>::from_data(
        TensorData::new(vec![1.0f32; SIZE * SIZE * SIZE], [SIZE, SIZE, SIZE]),
        &device,
    ))
}

/// Cohort where each subject's moving volume is offset by a known translation.
struct SyntheticCohort;

impl SyntheticCohort {
    fn true_offset(subject_id: &str) -> Option<[f64; 3]> {
        match subject_id {
            "subject-a" => Some([2.0, 0.0, 0.0]),
            "subject-b" => Some([0.0, -1.5, 1.0]),
            _ => None,
        }
    }
}

impl SubjectDataProvider<Backend> for SyntheticCohort {
    fn subject_data(&self, subject_id: &str) -> Result<SubjectData<Backend>> {
        let offset = Self::true_offset(subject_id).ok_or_else(|| {
            RegistrationError::data_unavailable(subject_id, "not part of the synthetic cohort")
        })?;
        Ok(SubjectData {
            fixed: blob_volume(Point3::origin()),
            moving_channels: vec![blob_volume(Point3::new(offset[0], offset[1], offset[2]))],
            regions: vec![WeightedMask {
                mask: ones_mask(),
                weight: 1.0,
            }],
        })
    }
}

/// Toy solver: the true translation plus seed-driven noise. Later attempts
/// are not better by construction; the ranking has to find the closest one.
struct NoisyTranslationSolver;

impl RegistrationSolver<Backend> for NoisyTranslationSolver {
    fn register(
        &self,
        fixed: &Volume<Backend>,
        moving: &Volume<Backend>,
        ctx: &AttemptContext,
    ) -> Result<SolverOutput> {
        let mut rng = StdRng::seed_from_u64(ctx.seed);
        let truth = moving.origin() - fixed.origin();
        let noise = rng.random_range(0.0..1.5);
        let direction: [f64; 3] = [
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ];
        let norm = (direction.iter().map(|c| c * c).sum::<f64>()).sqrt().max(1e-9);
        let translation = [
            truth.x + noise * direction[0] / norm,
            truth.y + noise * direction[1] / norm,
            truth.z + noise * direction[2] / norm,
        ];
        Ok(SolverOutput {
            transform: AnyTransform::Rigid(RigidTransform::translation_only(translation)),
            native_score: noise,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let output_dir = std::path::Path::new("demo_output/transforms");
    std::fs::create_dir_all(output_dir)?;
    let store = TransformStore::new(output_dir)?;

    let config = RegistrationConfig {
        runs: 8,
        plot_best_n: 3,
        base_seed: 7,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(config, SyntheticCohort, NoisyTranslationSolver, store)?;

    let subjects = ["subject-a", "subject-b", "subject-missing"];
    let summary = orchestrator.run_batch(&subjects, &CancelToken::new());

    println!("Batch finished: {summary:?}");
    for subject in subjects {
        let transform = orchestrator.store().load(subject)?;
        match transform {
            AnyTransform::Rigid(rigid) => {
                let truth = SyntheticCohort::true_offset(subject).unwrap_or([0.0; 3]);
                println!(
                    "{subject}: translation {:?} (truth {:?})",
                    rigid.translation(),
                    truth
                );
            }
            other => println!("{subject}: {other:?}"),
        }
    }
    Ok(())
}
