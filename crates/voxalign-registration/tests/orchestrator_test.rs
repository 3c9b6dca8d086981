use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use tempfile::TempDir;

use voxalign_core::resample::resample_onto;
use voxalign_core::{AnyTransform, RigidTransform, Volume};
use voxalign_registration::{
    AttemptContext, CancelPolicy, CancelToken, Orchestrator, RegistrationConfig,
    RegistrationError, RegistrationSolver, Result, SolverOutput, SubjectData,
    SubjectDataProvider, SubjectOutcome, TransformStore, WeightedMask,
};

type B = NdArray<f32>;

const N: usize = 6;

/// 6x6x6 volume with a bright 2x2x2 blob, enough structure for the gradient
/// features to discriminate a shifted candidate from an aligned one.
fn blob_volume() -> Volume<B> {
    let device = Default::default();
    let mut data = vec![0.0f32; N * N * N];
    for z in 2..4 {
        for y in 2..4 {
            for x in 2..4 {
                data[z * N * N + y * N + x] = 1.0;
            }
        }
    }
    Volume::from_data(Tensor::<B, 3>::from_data(TensorData::new(data, [N, N, N]), &device))
}

fn mask_volume(value: f32) -> Volume<B> {
    let device = Default::default();
    Volume::from_data(Tensor::<B, 3>::from_data(
        TensorData::new(vec![value; N * N * N], [N, N, N]),
        &device,
    ))
}

fn subject_data(mask_value: f32) -> SubjectData<B> {
    SubjectData {
        fixed: blob_volume(),
        moving_channels: vec![blob_volume()],
        regions: vec![WeightedMask {
            mask: mask_volume(mask_value),
            weight: 1.0,
        }],
    }
}

struct MapProvider {
    data: HashMap<String, SubjectData<B>>,
}

impl MapProvider {
    fn with_subject(id: &str, data: SubjectData<B>) -> Self {
        let mut map = HashMap::new();
        map.insert(id.to_owned(), data);
        Self { data: map }
    }
}

impl SubjectDataProvider<B> for MapProvider {
    fn subject_data(&self, subject_id: &str) -> Result<SubjectData<B>> {
        self.data.get(subject_id).cloned().ok_or_else(|| {
            RegistrationError::data_unavailable(subject_id, "not in fixture set")
        })
    }
}

#[derive(Clone)]
enum Scripted {
    Converge { translation: [f64; 3], native: f64 },
    Fail,
}

/// Solver scripted per attempt index; records seeds and call counts.
struct ScriptedSolver {
    script: Vec<Scripted>,
    calls: AtomicUsize,
    seeds: Mutex<HashMap<usize, u64>>,
}

impl ScriptedSolver {
    fn new(script: Vec<Scripted>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            seeds: Mutex::new(HashMap::new()),
        }
    }
}

impl RegistrationSolver<B> for ScriptedSolver {
    fn register(
        &self,
        _fixed: &Volume<B>,
        _moving: &Volume<B>,
        ctx: &AttemptContext,
    ) -> Result<SolverOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seeds.lock().unwrap().insert(ctx.attempt, ctx.seed);
        match &self.script[ctx.attempt % self.script.len()] {
            Scripted::Fail => Err(RegistrationError::solver("scripted non-convergence")),
            Scripted::Converge { translation, native } => Ok(SolverOutput {
                transform: AnyTransform::Rigid(RigidTransform::translation_only(*translation)),
                native_score: *native,
            }),
        }
    }
}

fn orchestrator(
    config: RegistrationConfig,
    provider: MapProvider,
    solver: ScriptedSolver,
) -> (TempDir, Orchestrator<B, MapProvider, ScriptedSolver>) {
    let dir = TempDir::new().unwrap();
    let store = TransformStore::new(dir.path()).unwrap();
    let orch = Orchestrator::new(config, provider, solver, store).unwrap();
    (dir, orch)
}

#[test]
fn test_data_unavailable_persists_identity_fallback() {
    let provider = MapProvider {
        data: HashMap::new(),
    };
    let solver = ScriptedSolver::new(vec![Scripted::Fail]);
    let (_dir, orch) = orchestrator(RegistrationConfig::default(), provider, solver);

    let outcome = orch.run_subject("S1", &CancelToken::new()).unwrap();
    assert!(matches!(outcome, SubjectOutcome::FallbackPersisted { .. }));

    assert!(orch.store().exists("S1"));
    let loaded = orch.store().load("S1").unwrap();
    assert!(loaded.is_identity());

    // Identity property: resampling through the fallback reproduces the input.
    let volume = blob_volume();
    let resampled = resample_onto(&volume, &volume, &loaded).unwrap();
    let a = resampled.data().clone().into_data();
    let b = volume.data().clone().into_data();
    for (got, want) in a
        .as_slice::<f32>()
        .unwrap()
        .iter()
        .zip(b.as_slice::<f32>().unwrap())
    {
        assert!((got - want).abs() < 1e-5);
    }
}

#[test]
fn test_combined_key_selects_winner_end_to_end() {
    // Empty masks make every composite exactly 0 (the defined sentinel), so
    // the ranking key reduces to native/2: natives [1.0, _, 0.8, _, 0.6]
    // give keys [0.5, 0.4, 0.3] and the fifth attempt wins.
    let provider = MapProvider::with_subject("S2", subject_data(0.0));
    let solver = ScriptedSolver::new(vec![
        Scripted::Converge {
            translation: [0.1, 0.0, 0.0],
            native: 1.0,
        },
        Scripted::Fail,
        Scripted::Converge {
            translation: [0.2, 0.0, 0.0],
            native: 0.8,
        },
        Scripted::Fail,
        Scripted::Converge {
            translation: [0.3, 0.0, 0.0],
            native: 0.6,
        },
    ]);
    let config = RegistrationConfig {
        runs: 5,
        plot_best_n: 2,
        ..Default::default()
    };
    let (_dir, orch) = orchestrator(config, provider, solver);

    let outcome = orch.run_subject("S2", &CancelToken::new()).unwrap();
    let SubjectOutcome::Persisted { winner, review } = outcome else {
        panic!("expected a persisted outcome");
    };

    assert_eq!(winner.attempt, 4);
    assert!((winner.composite_score - 0.0).abs() < 1e-12);
    assert!((winner.ranking_key() - 0.3).abs() < 1e-12);
    assert_eq!(review.len(), 2);
    assert_eq!(review[0].attempt, 4);
    assert_eq!(review[1].attempt, 2);

    let loaded = orch.store().load("S2").unwrap();
    assert_eq!(loaded, winner.transform);
}

#[test]
fn test_composite_score_discriminates_misalignment() {
    // Equal natives; the aligned candidate (identity-like tiny shift) must
    // beat a clearly shifted one through the composite term alone. The
    // aligned candidate comes second so ties cannot mask the comparison.
    let provider = MapProvider::with_subject("S3", subject_data(1.0));
    let solver = ScriptedSolver::new(vec![
        Scripted::Converge {
            translation: [2.0, 0.0, 0.0],
            native: 1.0,
        },
        Scripted::Converge {
            translation: [0.0, 0.0, 0.0],
            native: 1.0,
        },
    ]);
    let config = RegistrationConfig {
        runs: 2,
        ..Default::default()
    };
    let (_dir, orch) = orchestrator(config, provider, solver);

    let outcome = orch.run_subject("S3", &CancelToken::new()).unwrap();
    let SubjectOutcome::Persisted { winner, .. } = outcome else {
        panic!("expected a persisted outcome");
    };
    assert_eq!(winner.attempt, 1);
    assert!(winner.composite_score < 1e-4);
}

#[test]
fn test_all_attempts_failed_reports_without_persisting() {
    let provider = MapProvider::with_subject("S4", subject_data(1.0));
    let solver = ScriptedSolver::new(vec![Scripted::Fail]);
    let config = RegistrationConfig {
        runs: 10,
        ..Default::default()
    };
    let (_dir, orch) = orchestrator(config, provider, solver);

    let outcome = orch.run_subject("S4", &CancelToken::new()).unwrap();
    assert!(matches!(
        outcome,
        SubjectOutcome::AllAttemptsFailed { attempts: 10 }
    ));
    assert!(!orch.store().exists("S4"));
    assert!(matches!(
        orch.store().load("S4"),
        Err(RegistrationError::NotFound { .. })
    ));
}

#[test]
fn test_existing_record_skips_subject_entirely() {
    let provider = MapProvider::with_subject("S5", subject_data(1.0));
    let solver = ScriptedSolver::new(vec![Scripted::Converge {
        translation: [0.0, 0.0, 0.0],
        native: 0.0,
    }]);
    let (_dir, orch) = orchestrator(RegistrationConfig::default(), provider, solver);

    orch.store()
        .save("S5", &AnyTransform::Identity, false)
        .unwrap();

    let outcome = orch.run_subject("S5", &CancelToken::new()).unwrap();
    assert!(matches!(outcome, SubjectOutcome::Skipped));
    // The skip happens before loading or solving.
    assert_eq!(orch.solver_calls(), 0);
}

#[test]
fn test_cancel_discard_policy_persists_nothing() {
    let provider = MapProvider::with_subject("S6", subject_data(1.0));
    let solver = ScriptedSolver::new(vec![Scripted::Converge {
        translation: [0.0, 0.0, 0.0],
        native: 0.0,
    }]);
    let config = RegistrationConfig {
        cancel_policy: CancelPolicy::Discard,
        ..Default::default()
    };
    let (_dir, orch) = orchestrator(config, provider, solver);

    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = orch.run_subject("S6", &cancel).unwrap();
    assert!(matches!(outcome, SubjectOutcome::Cancelled));
    assert!(!orch.store().exists("S6"));
}

#[test]
fn test_seeds_are_reproducible_across_passes() {
    let run_once = |dir: &TempDir| -> HashMap<usize, u64> {
        let provider = MapProvider::with_subject("S7", subject_data(0.0));
        let solver = ScriptedSolver::new(vec![Scripted::Converge {
            translation: [0.0, 0.0, 0.0],
            native: 0.0,
        }]);
        let store = TransformStore::new(dir.path()).unwrap();
        let config = RegistrationConfig {
            runs: 4,
            base_seed: 42,
            ..Default::default()
        };
        let orch = Orchestrator::new(config, provider, solver, store).unwrap();
        orch.run_subject("S7", &CancelToken::new()).unwrap();
        orch.recorded_seeds()
    };

    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let seeds_a = run_once(&dir_a);
    let seeds_b = run_once(&dir_b);
    assert_eq!(seeds_a.len(), 4);
    assert_eq!(seeds_a, seeds_b);
}

#[test]
fn test_batch_processes_every_subject_once() {
    let mut data = HashMap::new();
    data.insert("good".to_owned(), subject_data(0.0));
    // "missing" is absent from the fixture set -> DataUnavailable -> fallback.
    let provider = MapProvider { data };
    let solver = ScriptedSolver::new(vec![Scripted::Converge {
        translation: [0.0, 0.0, 0.0],
        native: 0.0,
    }]);
    let config = RegistrationConfig {
        runs: 2,
        max_parallel_attempts: Some(2),
        ..Default::default()
    };
    let (_dir, orch) = orchestrator(config, provider, solver);

    let subjects = ["good".to_owned(), "missing".to_owned()];
    let summary = orch.run_batch(&subjects, &CancelToken::new());

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.fallback, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.total(), 2);
    assert!(orch.store().exists("good"));
    assert!(orch.store().exists("missing"));

    // A second pass skips both.
    let summary = orch.run_batch(&subjects, &CancelToken::new());
    assert_eq!(summary.skipped, 2);
}

/// Test-only accessors for the scripted solver's recordings.
trait SolverIntrospection {
    fn solver_calls(&self) -> usize;
    fn recorded_seeds(&self) -> HashMap<usize, u64>;
}

impl SolverIntrospection for Orchestrator<B, MapProvider, ScriptedSolver> {
    fn solver_calls(&self) -> usize {
        self.solver().calls.load(Ordering::SeqCst)
    }

    fn recorded_seeds(&self) -> HashMap<usize, u64> {
        self.solver().seeds.lock().unwrap().clone()
    }
}
