//! Per-subject registration state machine and batch driver.
//!
//! Each subject moves through `Pending -> Loading -> Running(i/N) -> Ranking
//! -> Persisted`, with two error exits: `LoadFailed -> FallbackPersisted`
//! (identity persisted) and `AllAttemptsFailed -> Reported` (nothing
//! persisted, eligible for retry on the next batch run). Attempt-level
//! failures never escape the running loop; subject-level failures never abort
//! the batch.

use std::marker::PhantomData;

use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use voxalign_core::filter::GradientMagnitudeFilter;
use voxalign_core::resample::resample_onto;
use voxalign_core::{AnyTransform, Volume};

use crate::cancel::CancelToken;
use crate::config::{CancelPolicy, RegistrationConfig};
use crate::error::{RegistrationError, Result};
use crate::metric::{MaskedMeanAbsoluteDifference, RegionMetric};
use crate::provider::{SubjectData, SubjectDataProvider};
use crate::ranking::{rank_order, select_best, Candidate};
use crate::solver::{AttemptContext, RegistrationSolver, SolverOutput};
use crate::store::TransformStore;

/// Terminal state of one subject after an orchestrator pass.
#[derive(Debug)]
pub enum SubjectOutcome<B: Backend> {
    /// A transform record already existed; nothing was recomputed.
    Skipped,
    /// A winning candidate was ranked and persisted.
    Persisted {
        /// The winning candidate.
        winner: Candidate<B>,
        /// Top-ranked candidates (best first, `plot_best_n` entries) exposed
        /// for external review.
        review: Vec<Candidate<B>>,
    },
    /// Data provisioning failed; the identity fallback was persisted.
    FallbackPersisted { reason: String },
    /// Every attempt failed; reported without persisting, retryable.
    AllAttemptsFailed { attempts: usize },
    /// Cancelled before a result could be produced or kept.
    Cancelled,
}

/// Aggregate counts for one batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub persisted: usize,
    pub fallback: usize,
    pub reported: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub errors: usize,
}

impl BatchSummary {
    fn record<B: Backend>(&mut self, outcome: &SubjectOutcome<B>) {
        match outcome {
            SubjectOutcome::Skipped => self.skipped += 1,
            SubjectOutcome::Persisted { .. } => self.persisted += 1,
            SubjectOutcome::FallbackPersisted { .. } => self.fallback += 1,
            SubjectOutcome::AllAttemptsFailed { .. } => self.reported += 1,
            SubjectOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Number of subjects that reached any terminal state.
    pub fn total(&self) -> usize {
        self.persisted + self.fallback + self.reported + self.skipped + self.cancelled + self.errors
    }
}

/// Multi-run stochastic registration orchestrator.
///
/// Owns the immutable batch configuration and the external collaborators
/// (data provider, solver, transform store). Feature extraction, scoring and
/// ranking are pure, so the orchestrator shares no mutable state across
/// subjects or attempts.
pub struct Orchestrator<B: Backend, P, S> {
    config: RegistrationConfig,
    provider: P,
    solver: S,
    store: TransformStore,
    metric: MaskedMeanAbsoluteDifference,
    pool: Option<rayon::ThreadPool>,
    _backend: PhantomData<B>,
}

impl<B, P, S> Orchestrator<B, P, S>
where
    B: Backend,
    Volume<B>: Send + Sync,
    P: SubjectDataProvider<B>,
    S: RegistrationSolver<B>,
{
    /// Create an orchestrator; fails on invalid configuration.
    pub fn new(
        config: RegistrationConfig,
        provider: P,
        solver: S,
        store: TransformStore,
    ) -> Result<Self> {
        config.validate()?;
        let pool = match config.max_parallel_attempts {
            Some(workers) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| {
                        RegistrationError::invalid_configuration(format!(
                            "failed to build attempt worker pool: {e}"
                        ))
                    })?,
            ),
            None => None,
        };
        Ok(Self {
            config,
            provider,
            solver,
            store,
            metric: MaskedMeanAbsoluteDifference::new(),
            pool,
            _backend: PhantomData,
        })
    }

    /// The batch configuration.
    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// The transform store backing this orchestrator.
    pub fn store(&self) -> &TransformStore {
        &self.store
    }

    /// The registration solver driving the attempts.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Process every subject exactly once.
    ///
    /// Subject failures are logged and counted, never propagated; the batch
    /// always terminates with each subject in a terminal state.
    pub fn run_batch(&self, subjects: &[impl AsRef<str>], cancel: &CancelToken) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for subject in subjects {
            let subject = subject.as_ref();
            if cancel.is_cancelled() {
                summary.cancelled += 1;
                continue;
            }
            match self.run_subject(subject, cancel) {
                Ok(outcome) => summary.record(&outcome),
                Err(err) => {
                    tracing::error!(subject, error = %err, "subject failed outside the attempt loop");
                    summary.errors += 1;
                }
            }
        }
        tracing::info!(?summary, "batch complete");
        summary
    }

    /// Drive one subject through the state machine.
    pub fn run_subject(&self, subject_id: &str, cancel: &CancelToken) -> Result<SubjectOutcome<B>> {
        if self.store.exists(subject_id) {
            tracing::info!(subject = subject_id, "transform record present, skipping");
            return Ok(SubjectOutcome::Skipped);
        }

        // Loading.
        let data = match self.provider.subject_data(subject_id) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(
                    subject = subject_id,
                    error = %err,
                    "data unavailable, persisting identity fallback"
                );
                return self.persist_fallback(subject_id, &err);
            }
        };
        let moving = data
            .moving_channels
            .get(self.config.registration_channel)
            .ok_or_else(|| {
                RegistrationError::invalid_configuration(format!(
                    "registration channel {} out of range ({} channels)",
                    self.config.registration_channel,
                    data.moving_channels.len()
                ))
            })?;

        // Feature derivation is deterministic, so a failure here would repeat
        // on every attempt; treat it as the subject's attempts all failing.
        let filter = self.feature_filter();
        let features = filter
            .apply(&data.fixed)
            .and_then(|fixed| filter.clone().negated().apply(moving).map(|m| (fixed, m)));
        let (fixed_feature, moving_feature) = match features {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(subject = subject_id, error = %err, "feature derivation failed");
                return Ok(SubjectOutcome::AllAttemptsFailed {
                    attempts: self.config.runs,
                });
            }
        };

        // Running(i of N): independent attempts on the worker pool.
        let mut rng = StdRng::seed_from_u64(self.config.base_seed);
        let seeds: Vec<u64> = (0..self.config.runs).map(|_| rng.random()).collect();

        let run_attempts = || -> Vec<Result<Candidate<B>>> {
            seeds
                .par_iter()
                .enumerate()
                .map(|(attempt, &seed)| {
                    self.run_attempt(
                        attempt,
                        seed,
                        &data,
                        moving,
                        &fixed_feature,
                        &moving_feature,
                        cancel,
                    )
                })
                .collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run_attempts),
            None => run_attempts(),
        };

        let mut candidates = Vec::new();
        for (attempt, result) in results.into_iter().enumerate() {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(RegistrationError::Cancelled) => {
                    tracing::debug!(subject = subject_id, attempt, "attempt cancelled");
                }
                Err(err) => {
                    tracing::warn!(subject = subject_id, attempt, error = %err, "attempt failed");
                }
            }
        }

        if cancel.is_cancelled() {
            let rank_partial = self.config.cancel_policy == CancelPolicy::RankPartial;
            if !rank_partial || candidates.is_empty() {
                tracing::info!(subject = subject_id, "subject cancelled, nothing persisted");
                return Ok(SubjectOutcome::Cancelled);
            }
            tracing::info!(
                subject = subject_id,
                completed = candidates.len(),
                "cancelled, ranking partial results"
            );
        }

        // Ranking.
        if candidates.is_empty() {
            tracing::warn!(
                subject = subject_id,
                attempts = self.config.runs,
                "all attempts failed, reporting without persisting"
            );
            return Ok(SubjectOutcome::AllAttemptsFailed {
                attempts: self.config.runs,
            });
        }
        let winner_idx = select_best(&candidates)?;

        // Persisted.
        match self
            .store
            .save(subject_id, &candidates[winner_idx].transform, false)
        {
            Ok(()) => {}
            Err(RegistrationError::AlreadyExists { .. }) => {
                tracing::warn!(
                    subject = subject_id,
                    "record appeared concurrently, keeping the existing transform"
                );
                return Ok(SubjectOutcome::Skipped);
            }
            Err(err) => return Err(err),
        }

        let winner = candidates[winner_idx].clone();
        tracing::info!(
            subject = subject_id,
            attempt = winner.attempt,
            composite = winner.composite_score,
            native = winner.native_score,
            key = winner.ranking_key(),
            "persisted winning transform"
        );

        let review = rank_order(&candidates)
            .into_iter()
            .take(self.config.plot_best_n)
            .map(|i| candidates[i].clone())
            .collect();

        Ok(SubjectOutcome::Persisted { winner, review })
    }

    fn feature_filter(&self) -> GradientMagnitudeFilter {
        GradientMagnitudeFilter::new().with_optional_smoothing(self.config.smoothing_sigma)
    }

    fn persist_fallback(
        &self,
        subject_id: &str,
        cause: &RegistrationError,
    ) -> Result<SubjectOutcome<B>> {
        match self.store.save(subject_id, &AnyTransform::Identity, false) {
            Ok(()) => Ok(SubjectOutcome::FallbackPersisted {
                reason: cause.to_string(),
            }),
            Err(RegistrationError::AlreadyExists { .. }) => Ok(SubjectOutcome::Skipped),
            Err(err) => Err(err),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_attempt(
        &self,
        attempt: usize,
        seed: u64,
        data: &SubjectData<B>,
        moving: &Volume<B>,
        fixed_feature: &Volume<B>,
        moving_feature: &Volume<B>,
        cancel: &CancelToken,
    ) -> Result<Candidate<B>> {
        if cancel.is_cancelled() {
            return Err(RegistrationError::Cancelled);
        }

        let ctx = AttemptContext {
            attempt,
            seed,
            method: self.config.method,
            cancel: cancel.clone(),
        };
        let SolverOutput {
            transform,
            native_score,
        } = self.solver.register(fixed_feature, moving_feature, &ctx)?;

        if cancel.is_cancelled() {
            return Err(RegistrationError::Cancelled);
        }

        // Warp the raw moving volume onto the fixed grid, then score its
        // feature response against the fixed features.
        let warped = resample_onto(moving, &data.fixed, &transform)?;
        let warped_feature = self.feature_filter().apply(&warped)?;
        let score = self
            .metric
            .evaluate(fixed_feature, &warped_feature, &data.regions)?;

        tracing::debug!(
            attempt,
            seed,
            composite = score.composite,
            native = native_score,
            "attempt scored"
        );

        Ok(Candidate {
            attempt,
            transform,
            composite_score: score.composite,
            per_region: score.per_region,
            native_score,
            warped: self.config.save_images.then_some(warped),
        })
    }
}
