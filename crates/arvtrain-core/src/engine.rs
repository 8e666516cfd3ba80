//! Trainer orchestrator.
//!
//! Wires the collaborators to the pure core: loads progress, gates and starts
//! units, records finished sessions, persists the result and logs a summary.
//! Store and sink failures never fail a unit; they are logged and dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::aggregate::{headline, RankingPolicy};
use crate::curriculum::{Catalog, Curriculum, CurriculumId, UnitResult};
use crate::error::{AssessmentError, Result};
use crate::model::RegionFilter;
use crate::progression::{
    gate_open, is_certified, record_unit_result, reset_curriculum, unit_state, unit_states,
    ProgressRecord, UnitState,
};
use crate::report::UnitSummary;
use crate::session::{GradingPolicy, UnitSession};
use crate::traits::{trainee_key, ProgressStore, PropertySource, ResultSink};

/// Configuration for the trainer.
#[derive(Debug, Clone, Default)]
pub struct TrainerConfig {
    pub policy: GradingPolicy,
    pub ranking: RankingPolicy,
}

/// Result of completing a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub passed: bool,
    pub state: UnitState,
    /// The curriculum is certified after this attempt.
    pub certified: bool,
    /// This attempt is the one that certified it.
    pub newly_certified: bool,
    pub result: UnitResult,
    pub summary: UnitSummary,
}

/// A session bound to the trainee, curriculum and unit it was started for.
///
/// Only [`Trainer::begin_unit`] builds one, so a completed session always
/// carries the items drawn for that unit.
#[derive(Debug, Clone)]
pub struct StartedUnit {
    trainee: String,
    curriculum: CurriculumId,
    unit: usize,
    pub session: UnitSession,
}

impl StartedUnit {
    pub fn trainee(&self) -> &str {
        &self.trainee
    }

    pub fn curriculum(&self) -> &CurriculumId {
        &self.curriculum
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    fn check(&self, trainee: &str, curriculum: &CurriculumId, unit: usize) -> Result<()> {
        let trainee = trainee_key(trainee);
        if self.trainee != trainee || &self.curriculum != curriculum || self.unit != unit {
            return Err(AssessmentError::InvalidTransition(format!(
                "session was started for unit {} of {} ({}), not unit {} of {curriculum} ({})",
                self.unit + 1,
                self.curriculum,
                self.trainee,
                unit + 1,
                trainee
            )));
        }
        Ok(())
    }
}

/// One curriculum as seen by a trainee.
#[derive(Debug, Clone, PartialEq)]
pub struct CurriculumStatus {
    pub id: CurriculumId,
    pub name: String,
    pub requires: Option<CurriculumId>,
    pub gate_open: bool,
    pub certified: bool,
    pub units: Vec<(String, UnitState)>,
}

/// The training orchestrator.
pub struct Trainer {
    source: Arc<dyn PropertySource>,
    store: Arc<dyn ProgressStore>,
    sink: Arc<dyn ResultSink>,
    catalog: Catalog,
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(
        source: Arc<dyn PropertySource>,
        store: Arc<dyn ProgressStore>,
        sink: Arc<dyn ResultSink>,
        catalog: Catalog,
        config: TrainerConfig,
    ) -> Self {
        Self {
            source,
            store,
            sink,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn curriculum(&self, id: &CurriculumId) -> Result<&Curriculum> {
        self.catalog.get(id)
    }

    /// Read a trainee's record. Missing or unreadable records start empty.
    pub async fn load_progress(&self, trainee: &str) -> ProgressRecord {
        match self.store.load(&trainee_key(trainee)).await {
            Ok(Some(record)) => record,
            Ok(None) => ProgressRecord::new(),
            Err(e) => {
                tracing::warn!(trainee, "progress unavailable, starting empty: {e:#}");
                ProgressRecord::new()
            }
        }
    }

    async fn persist(&self, trainee: &str, record: &ProgressRecord) {
        if let Err(e) = self.store.save(&trainee_key(trainee), record).await {
            tracing::warn!(trainee, "failed to persist progress: {e:#}");
        }
    }

    /// Derived state of every curriculum in the catalog.
    pub async fn overview(&self, trainee: &str) -> Vec<CurriculumStatus> {
        let progress = self.load_progress(trainee).await;
        self.catalog
            .iter()
            .map(|c| CurriculumStatus {
                id: c.id.clone(),
                name: c.name.clone(),
                requires: c.requires.clone(),
                gate_open: gate_open(c, &progress),
                certified: is_certified(c, &progress),
                units: c
                    .units
                    .iter()
                    .map(|u| u.name.clone())
                    .zip(unit_states(c, &progress))
                    .collect(),
            })
            .collect()
    }

    /// Start a unit: check it is unlocked, draw its items, build the session.
    ///
    /// Fails before any item is presented when the unit is locked, the data
    /// source is unavailable or holds too few gradable properties.
    pub async fn begin_unit<R: Rng + ?Sized>(
        &self,
        trainee: &str,
        curriculum: &CurriculumId,
        unit: usize,
        region: &RegionFilter,
        rng: &mut R,
    ) -> Result<StartedUnit> {
        let curriculum = self.curriculum(curriculum)?;
        let definition = curriculum.unit(unit)?;
        let progress = self.load_progress(trainee).await;
        if unit_state(curriculum, unit, &progress)? == UnitState::Locked {
            return Err(AssessmentError::InvalidTransition(format!(
                "unit {} ({}) of {} is locked",
                unit + 1,
                definition.name,
                curriculum.id
            )));
        }

        let required = definition.kind.properties_required();
        let items = if required > 0 {
            let dataset = self.source.load().await.map_err(|e| {
                AssessmentError::DataUnavailable(format!("{} source: {e:#}", self.source.name()))
            })?;
            dataset.sample(required, region, rng)?
        } else {
            Vec::new()
        };

        tracing::info!(
            trainee,
            curriculum = %curriculum.id,
            unit,
            kind = definition.kind.label(),
            items = items.len(),
            "unit started"
        );
        let session = UnitSession::start(&definition.kind, items, &self.config.policy, rng)?;
        Ok(StartedUnit {
            trainee: trainee_key(trainee),
            curriculum: curriculum.id.clone(),
            unit,
            session,
        })
    }

    /// Record a finished session against the trainee's progress.
    ///
    /// The session must have been started for the same trainee, curriculum
    /// and unit.
    pub async fn complete_unit(
        &self,
        trainee: &str,
        curriculum: &CurriculumId,
        unit: usize,
        started: &StartedUnit,
    ) -> Result<UnitOutcome> {
        started.check(trainee, curriculum, unit)?;
        let curriculum = self.curriculum(curriculum)?;
        let definition = curriculum.unit(unit)?;
        let result = started.session.finish()?;
        let progress = self.load_progress(trainee).await;

        let outcome = record_unit_result(curriculum, unit, &result, progress)?;
        if outcome.passed {
            self.persist(trainee, &outcome.progress).await;
        }

        let policy = &self.config.policy;
        let summary = UnitSummary {
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            trainee: trainee_key(trainee),
            curriculum: curriculum.id.clone(),
            unit_index: unit,
            unit_name: definition.name.clone(),
            passed: outcome.passed,
            questions: result.questions(),
            headline: headline(&result, &policy.scale, policy.weights)?,
            result: result.clone(),
            metrics: result.metrics().into_iter().collect::<BTreeMap<_, _>>(),
        };
        if let Err(e) = self.sink.append(&summary).await {
            tracing::warn!(sink = self.sink.name(), "failed to log unit summary: {e:#}");
        }

        tracing::info!(
            trainee,
            curriculum = %curriculum.id,
            unit,
            passed = outcome.passed,
            "unit finished"
        );
        Ok(UnitOutcome {
            passed: outcome.passed,
            state: outcome.state,
            certified: outcome.progress.is_certified(&curriculum.id),
            newly_certified: outcome.newly_certified,
            result,
            summary,
        })
    }

    /// Clear a certified curriculum so the trainee can start over.
    pub async fn reset(&self, trainee: &str, curriculum: &CurriculumId) -> Result<ProgressRecord> {
        let curriculum = self.curriculum(curriculum)?;
        let progress = self.load_progress(trainee).await;
        let progress = reset_curriculum(curriculum, progress)?;
        self.persist(trainee, &progress).await;
        Ok(progress)
    }
}
