//! Per-attempt session state.
//!
//! A session value is created when a unit starts and owns everything the
//! attempt accumulates: the drawn items, the answers so far and the running
//! deviation sums. Nothing is shared between sessions.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::aggregate::{grade_distribution, mean, CompositeWeights, GradeDistribution};
use crate::categorical::{score_categorical, BucketPartition};
use crate::comps::{score_comparable, scenario_percent, CompIssue, CompScenario, CompScore, ComparableRecord};
use crate::curriculum::{UnitKind, UnitResult};
use crate::distractor::{generate_distractors_with, Choice, DistractorConfig, DistractorSet};
use crate::error::{AssessmentError, Result};
use crate::grade::{score_numeric, weighted_composite, Grade, GradeScale, ScoreResult};
use crate::model::Property;

/// Grading configuration shared by every session kind.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPolicy {
    pub scale: GradeScale,
    pub weights: CompositeWeights,
    pub distractors: DistractorConfig,
    pub partition: BucketPartition,
    pub comp_universe: Vec<CompIssue>,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            scale: GradeScale::default(),
            weights: CompositeWeights::default(),
            distractors: DistractorConfig::default(),
            partition: BucketPartition::default(),
            comp_universe: CompIssue::ALL.to_vec(),
        }
    }
}

fn session_complete() -> AssessmentError {
    AssessmentError::InvalidTransition("session is already complete".into())
}

fn positive_estimate(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AssessmentError::InvalidInput(format!(
            "{what} must be a positive dollar amount, got {value}"
        )))
    }
}

fn require_items<T>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(AssessmentError::InvalidInput(
            "a session needs at least one item".into(),
        ));
    }
    Ok(())
}

/// Position and running averages shown while a valuation session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    /// 1-based number of the question being asked (capped at `total`).
    pub question: usize,
    pub total: usize,
    pub answered: usize,
    pub avg_arv_deviation: Option<f64>,
    pub avg_reno_deviation: Option<f64>,
}

/// One graded valuation answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationAnswer {
    pub property_id: String,
    pub address: String,
    pub user_arv: f64,
    pub user_reno: f64,
    pub actual_arv: Option<f64>,
    pub actual_reno: Option<f64>,
    pub arv: ScoreResult,
    pub reno: ScoreResult,
    pub overall: Grade,
}

/// End-of-session roll-up for a valuation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub questions: usize,
    pub avg_arv_deviation: f64,
    pub avg_reno_deviation: f64,
    pub arv_grade: Grade,
    pub reno_grade: Grade,
    pub overall_grade: Grade,
    pub distribution: GradeDistribution,
    pub answers: Vec<ValuationAnswer>,
}

/// Free-form ARV and renovation estimates.
#[derive(Debug, Clone)]
pub struct ValuationSession {
    policy: GradingPolicy,
    items: Vec<Property>,
    answers: Vec<ValuationAnswer>,
    arv_deviation_sum: f64,
    reno_deviation_sum: f64,
}

impl ValuationSession {
    pub fn new(items: Vec<Property>, policy: GradingPolicy) -> Result<Self> {
        require_items(&items)?;
        Ok(Self {
            policy,
            items,
            answers: Vec::new(),
            arv_deviation_sum: 0.0,
            reno_deviation_sum: 0.0,
        })
    }

    pub fn current(&self) -> Option<&Property> {
        self.items.get(self.answers.len())
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.items.len()
    }

    pub fn answers(&self) -> &[ValuationAnswer] {
        &self.answers
    }

    /// Grade both estimates for the current property and advance.
    ///
    /// Invalid estimates leave the session where it was.
    pub fn submit(&mut self, arv: f64, reno: f64) -> Result<&ValuationAnswer> {
        let property = self
            .items
            .get(self.answers.len())
            .ok_or_else(session_complete)?;
        let arv = positive_estimate(arv, "ARV estimate")?;
        let reno = positive_estimate(reno, "renovation estimate")?;

        let scale = &self.policy.scale;
        let arv_score = score_numeric(arv, property.estimated_arv, scale)?;
        let reno_score = score_numeric(reno, property.estimated_renovation, scale)?;
        let overall = weighted_composite(
            arv_score.grade(),
            reno_score.grade(),
            self.policy.weights.arv,
            self.policy.weights.reno,
        );
        tracing::debug!(
            property = %property.id,
            arv_deviation = arv_score.deviation_percent(),
            reno_deviation = reno_score.deviation_percent(),
            %overall,
            "valuation answer graded"
        );

        self.arv_deviation_sum += arv_score.deviation_percent();
        self.reno_deviation_sum += reno_score.deviation_percent();
        let index = self.answers.len();
        self.answers.push(ValuationAnswer {
            property_id: property.id.clone(),
            address: property.address().to_string(),
            user_arv: arv,
            user_reno: reno,
            actual_arv: property.estimated_arv,
            actual_reno: property.estimated_renovation,
            arv: arv_score,
            reno: reno_score,
            overall,
        });
        Ok(&self.answers[index])
    }

    pub fn tracker(&self) -> Tracker {
        let answered = self.answers.len();
        let avg = |sum: f64| (answered > 0).then(|| sum / answered as f64);
        Tracker {
            question: (answered + 1).min(self.items.len()),
            total: self.items.len(),
            answered,
            avg_arv_deviation: avg(self.arv_deviation_sum),
            avg_reno_deviation: avg(self.reno_deviation_sum),
        }
    }

    pub fn summary(&self) -> Result<ValuationSummary> {
        if self.answers.is_empty() {
            return Err(AssessmentError::AggregationOnEmptySet);
        }
        let questions = self.answers.len();
        let avg_arv_deviation = self.arv_deviation_sum / questions as f64;
        let avg_reno_deviation = self.reno_deviation_sum / questions as f64;
        let arv_grade = self.policy.scale.grade(avg_arv_deviation);
        let reno_grade = self.policy.scale.grade(avg_reno_deviation);
        Ok(ValuationSummary {
            questions,
            avg_arv_deviation,
            avg_reno_deviation,
            arv_grade,
            reno_grade,
            overall_grade: weighted_composite(
                arv_grade,
                reno_grade,
                self.policy.weights.arv,
                self.policy.weights.reno,
            ),
            distribution: grade_distribution(self.answers.iter().map(|a| a.overall)),
            answers: self.answers.clone(),
        })
    }

    pub fn finish(&self) -> Result<UnitResult> {
        let summary = self.summary()?;
        Ok(UnitResult::Valuation {
            questions: summary.questions,
            avg_arv_deviation: summary.avg_arv_deviation,
            avg_reno_deviation: summary.avg_reno_deviation,
        })
    }
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub property: Property,
    pub choices: DistractorSet,
}

/// Outcome of one multiple-choice answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub choice: Choice,
    pub correct: bool,
    pub correct_label: Choice,
    pub correct_value: u64,
}

/// Multiple-choice ARV questions.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    answers: Vec<QuizAnswer>,
}

impl QuizSession {
    /// Build one shuffled option set per property.
    pub fn new<R: Rng + ?Sized>(
        items: Vec<Property>,
        distractors: &DistractorConfig,
        rng: &mut R,
    ) -> Result<Self> {
        require_items(&items)?;
        let questions = items
            .into_iter()
            .map(|property| {
                let truth = property.estimated_arv.ok_or_else(|| {
                    AssessmentError::InvalidInput(format!("property {} has no ARV", property.id))
                })?;
                let choices = generate_distractors_with(truth, distractors, rng)?;
                Ok(QuizQuestion { property, choices })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            questions,
            answers: Vec::new(),
        })
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.answers.len())
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub fn answers(&self) -> &[QuizAnswer] {
        &self.answers
    }

    pub fn answer(&mut self, choice: Choice) -> Result<QuizAnswer> {
        let question = self
            .questions
            .get(self.answers.len())
            .ok_or_else(session_complete)?;
        if question.choices.value_of(choice).is_none() {
            return Err(AssessmentError::InvalidInput(format!(
                "choice {choice} is not one of the {} options",
                question.choices.candidates.len()
            )));
        }
        let answer = QuizAnswer {
            choice,
            correct: question.choices.is_correct(choice),
            correct_label: question.choices.correct_label,
            correct_value: question.choices.correct_value(),
        };
        tracing::debug!(property = %question.property.id, %choice, correct = answer.correct, "quiz answer graded");
        self.answers.push(answer);
        Ok(answer)
    }

    pub fn correct(&self) -> u32 {
        self.answers.iter().filter(|a| a.correct).count() as u32
    }

    pub fn finish(&self) -> Result<UnitResult> {
        if self.answers.is_empty() {
            return Err(AssessmentError::AggregationOnEmptySet);
        }
        Ok(UnitResult::Quiz {
            correct: self.correct(),
            total: self.answers.len() as u32,
        })
    }
}

/// One graded bucket guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalAnswer {
    pub property_id: String,
    pub guess: Grade,
    pub truth: Grade,
    pub score: ScoreResult,
}

/// Renovation-scope bucket questions.
#[derive(Debug, Clone)]
pub struct CategoricalSession {
    policy: GradingPolicy,
    items: Vec<Property>,
    answers: Vec<CategoricalAnswer>,
}

impl CategoricalSession {
    pub fn new(items: Vec<Property>, policy: GradingPolicy) -> Result<Self> {
        require_items(&items)?;
        Ok(Self {
            policy,
            items,
            answers: Vec::new(),
        })
    }

    pub fn current(&self) -> Option<&Property> {
        self.items.get(self.answers.len())
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.items.len()
    }

    /// The labels a trainee may pick from, with their bucket names.
    pub fn options(&self) -> Vec<(Grade, &str)> {
        self.policy.partition.options()
    }

    pub fn answers(&self) -> &[CategoricalAnswer] {
        &self.answers
    }

    pub fn answer(&mut self, guess: Grade) -> Result<&CategoricalAnswer> {
        let property = self
            .items
            .get(self.answers.len())
            .ok_or_else(session_complete)?;
        let partition = &self.policy.partition;
        if !partition.options().iter().any(|(label, _)| *label == guess) {
            return Err(AssessmentError::InvalidInput(format!(
                "{guess} is not a bucket of this question"
            )));
        }

        let truth = property.renovation_truth();
        let score = score_categorical(guess, &truth, partition, &self.policy.scale)?;
        let truth_label = match (truth.label, truth.value) {
            (Some(label), _) => label,
            (None, Some(value)) => partition.bucket_of(value),
            (None, None) => partition.catch_all(),
        };
        tracing::debug!(property = %property.id, %guess, truth = %truth_label, "bucket answer graded");

        let index = self.answers.len();
        self.answers.push(CategoricalAnswer {
            property_id: property.id.clone(),
            guess,
            truth: truth_label,
            score,
        });
        Ok(&self.answers[index])
    }

    pub fn finish(&self) -> Result<UnitResult> {
        let deviations: Vec<f64> = self
            .answers
            .iter()
            .map(|a| a.score.deviation_percent())
            .collect();
        Ok(UnitResult::Categorical {
            questions: self.answers.len(),
            avg_deviation: mean(&deviations)?,
        })
    }
}

/// Comparable review across one or more scenarios.
#[derive(Debug, Clone)]
pub struct CompReviewSession {
    universe: Vec<CompIssue>,
    scenarios: Vec<CompScenario>,
    scores: Vec<Vec<CompScore>>,
    scenario: usize,
    comp: usize,
}

impl CompReviewSession {
    pub fn new(scenarios: Vec<CompScenario>, universe: Vec<CompIssue>) -> Result<Self> {
        require_items(&scenarios)?;
        if let Some(empty) = scenarios.iter().find(|s| s.comps.is_empty()) {
            return Err(AssessmentError::InvalidInput(format!(
                "scenario {:?} has no comparables",
                empty.name
            )));
        }
        let scores = vec![Vec::new(); scenarios.len()];
        Ok(Self {
            universe,
            scenarios,
            scores,
            scenario: 0,
            comp: 0,
        })
    }

    /// The scenario and comparable awaiting review.
    pub fn current(&self) -> Option<(&CompScenario, &ComparableRecord)> {
        let scenario = self.scenarios.get(self.scenario)?;
        scenario.comps.get(self.comp).map(|comp| (scenario, comp))
    }

    pub fn is_complete(&self) -> bool {
        self.scenario >= self.scenarios.len()
    }

    pub fn universe(&self) -> &[CompIssue] {
        &self.universe
    }

    pub fn submit(&mut self, tags: &BTreeSet<CompIssue>, good: bool) -> Result<CompScore> {
        let truth = self
            .scenarios
            .get(self.scenario)
            .and_then(|s| s.comps.get(self.comp))
            .ok_or_else(session_complete)?;
        let score = score_comparable(tags, good, &truth.issues, &self.universe)?;
        tracing::debug!(address = %truth.address, points = score.points, total = score.total, "comp graded");

        self.scores[self.scenario].push(score);
        self.comp += 1;
        if self.comp >= self.scenarios[self.scenario].comps.len() {
            self.scenario += 1;
            self.comp = 0;
        }
        Ok(score)
    }

    /// Pooled percentage for every scenario with at least one reviewed comp.
    pub fn scenario_percents(&self) -> Result<Vec<f64>> {
        self.scores
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| scenario_percent(s))
            .collect()
    }

    pub fn finish(&self) -> Result<UnitResult> {
        let scenario_percents = self.scenario_percents()?;
        if scenario_percents.is_empty() {
            return Err(AssessmentError::AggregationOnEmptySet);
        }
        Ok(UnitResult::CompReview { scenario_percents })
    }
}

/// A started unit of any kind.
#[derive(Debug, Clone)]
pub enum UnitSession {
    Valuation(ValuationSession),
    Quiz(QuizSession),
    Categorical(CategoricalSession),
    CompReview(CompReviewSession),
}

impl UnitSession {
    /// Start the session matching `kind` over the drawn `items`.
    pub fn start<R: Rng + ?Sized>(
        kind: &UnitKind,
        items: Vec<Property>,
        policy: &GradingPolicy,
        rng: &mut R,
    ) -> Result<Self> {
        let session = match kind {
            UnitKind::Valuation { .. } => {
                UnitSession::Valuation(ValuationSession::new(items, policy.clone())?)
            }
            UnitKind::Quiz { .. } => {
                UnitSession::Quiz(QuizSession::new(items, &policy.distractors, rng)?)
            }
            UnitKind::Categorical { .. } => {
                UnitSession::Categorical(CategoricalSession::new(items, policy.clone())?)
            }
            UnitKind::CompReview { scenarios, .. } => UnitSession::CompReview(
                CompReviewSession::new(scenarios.clone(), policy.comp_universe.clone())?,
            ),
        };
        Ok(session)
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitSession::Valuation(_) => "valuation",
            UnitSession::Quiz(_) => "quiz",
            UnitSession::Categorical(_) => "categorical",
            UnitSession::CompReview(_) => "comp_review",
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            UnitSession::Valuation(s) => s.is_complete(),
            UnitSession::Quiz(s) => s.is_complete(),
            UnitSession::Categorical(s) => s.is_complete(),
            UnitSession::CompReview(s) => s.is_complete(),
        }
    }

    pub fn finish(&self) -> Result<UnitResult> {
        match self {
            UnitSession::Valuation(s) => s.finish(),
            UnitSession::Quiz(s) => s.finish(),
            UnitSession::Categorical(s) => s.finish(),
            UnitSession::CompReview(s) => s.finish(),
        }
    }
}
