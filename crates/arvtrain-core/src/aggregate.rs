//! Roll-ups over scored items and completed units.
//!
//! Session averages, grade distributions, a single headline grade per unit
//! result, and leaderboard qualification/ranking over logged unit summaries.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::curriculum::UnitResult;
use crate::error::{AssessmentError, Result};
use crate::grade::{weighted_composite, Grade, GradeScale};
use crate::report::UnitSummary;

/// Arithmetic mean. Averaging nothing is a caller error.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(AssessmentError::AggregationOnEmptySet);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Count of each letter grade, with every grade present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeDistribution(BTreeMap<Grade, u32>);

impl Default for GradeDistribution {
    fn default() -> Self {
        Self(Grade::ALL.into_iter().map(|g| (g, 0)).collect())
    }
}

impl GradeDistribution {
    pub fn from_grades(grades: impl IntoIterator<Item = Grade>) -> Self {
        let mut dist = Self::default();
        for grade in grades {
            *dist.0.entry(grade).or_insert(0) += 1;
        }
        dist
    }

    pub fn count(&self, grade: Grade) -> u32 {
        self.0.get(&grade).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Largest bucket, never below 1 so it can scale a bar chart.
    pub fn max_count(&self) -> u32 {
        self.0.values().copied().max().unwrap_or(0).max(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, u32)> + '_ {
        Grade::ALL.into_iter().map(|g| (g, self.count(g)))
    }
}

/// Tally per-item grades into a [`GradeDistribution`].
pub fn grade_distribution(grades: impl IntoIterator<Item = Grade>) -> GradeDistribution {
    GradeDistribution::from_grades(grades)
}

/// Weights used when folding the ARV and renovation grades together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub arv: f64,
    pub reno: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self { arv: 0.6, reno: 0.4 }
    }
}

/// One grade and one deviation figure summarizing a unit result, so every
/// unit kind can be ranked on the same scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub grade: Grade,
    pub deviation_percent: f64,
}

/// Reduce a unit result to its [`Headline`].
///
/// Valuation combines both average grades by weight; score-style results
/// (quiz, comp review) are carried as `100 - percent` on the deviation scale.
pub fn headline(result: &UnitResult, scale: &GradeScale, weights: CompositeWeights) -> Result<Headline> {
    let headline = match result {
        UnitResult::Valuation {
            avg_arv_deviation,
            avg_reno_deviation,
            ..
        } => {
            let total = weights.arv + weights.reno;
            let deviation = if total > 0.0 {
                (avg_arv_deviation * weights.arv + avg_reno_deviation * weights.reno) / total
            } else {
                mean(&[*avg_arv_deviation, *avg_reno_deviation])?
            };
            Headline {
                grade: weighted_composite(
                    scale.grade(*avg_arv_deviation),
                    scale.grade(*avg_reno_deviation),
                    weights.arv,
                    weights.reno,
                ),
                deviation_percent: deviation,
            }
        }
        UnitResult::Quiz { correct, total } => {
            if *total == 0 {
                return Err(AssessmentError::AggregationOnEmptySet);
            }
            let deviation = 100.0 - *correct as f64 / *total as f64 * 100.0;
            Headline {
                grade: scale.grade(deviation),
                deviation_percent: deviation,
            }
        }
        UnitResult::Categorical { avg_deviation, .. } => Headline {
            grade: scale.grade(*avg_deviation),
            deviation_percent: *avg_deviation,
        },
        UnitResult::CompReview { scenario_percents } => {
            let deviation = 100.0 - mean(scenario_percents)?;
            Headline {
                grade: scale.grade(deviation),
                deviation_percent: deviation,
            }
        }
    };
    Ok(headline)
}

/// Rules for which logged units may appear on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingPolicy {
    pub min_questions: usize,
    /// Only units that passed qualify.
    pub require_pass: bool,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            min_questions: 10,
            require_pass: true,
        }
    }
}

impl RankingPolicy {
    pub fn qualifies(&self, summary: &UnitSummary) -> bool {
        (!self.require_pass || summary.passed) && summary.questions >= self.min_questions
    }
}

/// A leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub trainee: String,
    pub grade: Grade,
    pub deviation_percent: f64,
    pub questions: usize,
}

fn compare_headlines(a: &Headline, b: &Headline) -> Ordering {
    b.grade
        .rank()
        .cmp(&a.grade.rank())
        .then(a.deviation_percent.total_cmp(&b.deviation_percent))
}

/// Rank qualifying summaries: best grade first, then lowest deviation. Each
/// trainee appears once, with their best entry.
pub fn leaderboard(summaries: &[UnitSummary], policy: &RankingPolicy) -> Vec<RankedEntry> {
    let mut best: HashMap<&str, (&UnitSummary, Headline)> = HashMap::new();
    for summary in summaries.iter().filter(|s| policy.qualifies(s)) {
        let candidate = summary.headline;
        best.entry(summary.trainee.as_str())
            .and_modify(|current| {
                if compare_headlines(&candidate, &current.1) == Ordering::Less {
                    *current = (summary, candidate);
                }
            })
            .or_insert((summary, candidate));
    }

    let mut rows: Vec<(&UnitSummary, Headline)> = best.into_values().collect();
    rows.sort_by(|a, b| compare_headlines(&a.1, &b.1).then_with(|| a.0.trainee.cmp(&b.0.trainee)));

    rows.into_iter()
        .enumerate()
        .map(|(i, (summary, headline))| RankedEntry {
            rank: i + 1,
            trainee: summary.trainee.clone(),
            grade: headline.grade,
            deviation_percent: headline.deviation_percent,
            questions: summary.questions,
        })
        .collect()
}
