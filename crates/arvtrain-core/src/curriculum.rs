//! Curricula, units and their pass conditions.
//!
//! A curriculum is an ordered list of units. Each unit kind carries its own
//! pass-condition data and is evaluated exhaustively against the matching
//! [`UnitResult`] variant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::comps::{passing_scenarios, CompScenario};
use crate::error::{ensure_non_negative, AssessmentError, Result};

/// Stable curriculum identifier, e.g. `"valuation"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurriculumId(String);

impl CurriculumId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurriculumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurriculumId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a unit asks of the trainee and what it takes to pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitKind {
    /// Free-form ARV and renovation estimates; both average deviations must
    /// stay within their limits.
    Valuation {
        questions: usize,
        max_avg_arv_deviation: f64,
        max_avg_reno_deviation: f64,
    },
    /// Multiple-choice ARV questions; pass on `pass_fraction` of them correct.
    Quiz {
        questions: usize,
        pass_fraction: f64,
    },
    /// Renovation-scope bucket questions graded on the percent scale.
    Categorical {
        questions: usize,
        max_avg_deviation: f64,
    },
    /// Comparable review; `required_passing` scenarios must reach `pass_percent`.
    CompReview {
        #[serde(default = "default_comp_pass_percent")]
        pass_percent: f64,
        required_passing: usize,
        scenarios: Vec<CompScenario>,
    },
}

fn default_comp_pass_percent() -> f64 {
    80.0
}

/// Fewest correct answers out of `total` that reach `fraction`.
///
/// The product is nudged down before rounding up so that a fraction such as
/// 0.56 of 25 asks for 14, not 15.
fn quiz_pass_mark(fraction: f64, total: u32) -> u32 {
    (fraction * f64::from(total) - 1e-9).ceil().max(0.0) as u32
}

impl UnitKind {
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::Valuation { .. } => "valuation",
            UnitKind::Quiz { .. } => "quiz",
            UnitKind::Categorical { .. } => "categorical",
            UnitKind::CompReview { .. } => "comp_review",
        }
    }

    /// Ground-truth properties the unit draws from the data source.
    pub fn properties_required(&self) -> usize {
        match self {
            UnitKind::Valuation { questions, .. }
            | UnitKind::Quiz { questions, .. }
            | UnitKind::Categorical { questions, .. } => *questions,
            UnitKind::CompReview { .. } => 0,
        }
    }

    /// Number of graded items in one attempt.
    pub fn item_count(&self) -> usize {
        match self {
            UnitKind::CompReview { scenarios, .. } => scenarios.iter().map(|s| s.comps.len()).sum(),
            other => other.properties_required(),
        }
    }

    /// Whether `result` satisfies every pass condition of this unit.
    ///
    /// An attempt that covers fewer items than the unit requires never passes.
    pub fn passes(&self, result: &UnitResult) -> Result<bool> {
        result.validate()?;
        match (self, result) {
            (
                UnitKind::Valuation {
                    questions,
                    max_avg_arv_deviation,
                    max_avg_reno_deviation,
                },
                UnitResult::Valuation {
                    questions: answered,
                    avg_arv_deviation,
                    avg_reno_deviation,
                },
            ) => Ok(answered >= questions
                && avg_arv_deviation <= max_avg_arv_deviation
                && avg_reno_deviation <= max_avg_reno_deviation),
            (
                UnitKind::Quiz {
                    questions,
                    pass_fraction,
                },
                UnitResult::Quiz { correct, total },
            ) => Ok(*total as usize >= *questions
                && *correct >= quiz_pass_mark(*pass_fraction, *total)),
            (
                UnitKind::Categorical {
                    questions,
                    max_avg_deviation,
                },
                UnitResult::Categorical {
                    questions: answered,
                    avg_deviation,
                },
            ) => Ok(answered >= questions && avg_deviation <= max_avg_deviation),
            (
                UnitKind::CompReview {
                    pass_percent,
                    required_passing,
                    scenarios,
                },
                UnitResult::CompReview { scenario_percents },
            ) => Ok(scenario_percents.len() >= scenarios.len()
                && passing_scenarios(scenario_percents, *pass_percent) >= *required_passing),
            (kind, result) => Err(AssessmentError::InvalidInput(format!(
                "a {} result cannot complete a {} unit",
                result.label(),
                kind.label()
            ))),
        }
    }
}

/// Aggregate outcome of one unit attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitResult {
    Valuation {
        questions: usize,
        avg_arv_deviation: f64,
        avg_reno_deviation: f64,
    },
    Quiz {
        correct: u32,
        total: u32,
    },
    Categorical {
        questions: usize,
        avg_deviation: f64,
    },
    CompReview {
        scenario_percents: Vec<f64>,
    },
}

impl UnitResult {
    pub fn label(&self) -> &'static str {
        match self {
            UnitResult::Valuation { .. } => "valuation",
            UnitResult::Quiz { .. } => "quiz",
            UnitResult::Categorical { .. } => "categorical",
            UnitResult::CompReview { .. } => "comp_review",
        }
    }

    /// Items answered in the attempt.
    pub fn questions(&self) -> usize {
        match self {
            UnitResult::Valuation { questions, .. } | UnitResult::Categorical { questions, .. } => {
                *questions
            }
            UnitResult::Quiz { total, .. } => *total as usize,
            UnitResult::CompReview { scenario_percents } => scenario_percents.len(),
        }
    }

    /// Named per-metric figures for logging and display.
    pub fn metrics(&self) -> Vec<(String, f64)> {
        match self {
            UnitResult::Valuation {
                avg_arv_deviation,
                avg_reno_deviation,
                ..
            } => vec![
                ("avg_arv_deviation".into(), *avg_arv_deviation),
                ("avg_reno_deviation".into(), *avg_reno_deviation),
            ],
            UnitResult::Quiz { correct, total } => {
                let pct = if *total == 0 {
                    0.0
                } else {
                    *correct as f64 / *total as f64 * 100.0
                };
                vec![("quiz_percent".into(), pct)]
            }
            UnitResult::Categorical { avg_deviation, .. } => {
                vec![("avg_deviation".into(), *avg_deviation)]
            }
            UnitResult::CompReview { scenario_percents } => scenario_percents
                .iter()
                .enumerate()
                .map(|(i, p)| (format!("scenario_{}_percent", i + 1), *p))
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            UnitResult::Valuation {
                avg_arv_deviation,
                avg_reno_deviation,
                ..
            } => {
                ensure_non_negative(*avg_arv_deviation, "average ARV deviation")?;
                ensure_non_negative(*avg_reno_deviation, "average renovation deviation")?;
            }
            UnitResult::Quiz { correct, total } => {
                if correct > total {
                    return Err(AssessmentError::InvalidInput(format!(
                        "quiz reports {correct} correct out of {total}"
                    )));
                }
            }
            UnitResult::Categorical { avg_deviation, .. } => {
                ensure_non_negative(*avg_deviation, "average deviation")?;
            }
            UnitResult::CompReview { scenario_percents } => {
                for p in scenario_percents {
                    ensure_non_negative(*p, "scenario percent")?;
                }
            }
        }
        Ok(())
    }
}

/// One gated step of a curriculum. Its index is its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumUnit {
    pub name: String,
    #[serde(flatten)]
    pub kind: UnitKind,
}

/// An ordered sequence of units, optionally gated on another curriculum's
/// certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: CurriculumId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Curriculum that must be certified before unit 0 unlocks.
    #[serde(default)]
    pub requires: Option<CurriculumId>,
    pub units: Vec<CurriculumUnit>,
}

impl Curriculum {
    pub fn unit(&self, index: usize) -> Result<&CurriculumUnit> {
        self.units.get(index).ok_or_else(|| {
            AssessmentError::InvalidInput(format!(
                "curriculum {} has no unit {index} ({} units)",
                self.id,
                self.units.len()
            ))
        })
    }

    pub fn final_index(&self) -> Option<usize> {
        self.units.len().checked_sub(1)
    }
}

/// Every curriculum a trainee can work through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub curricula: Vec<Curriculum>,
}

impl Catalog {
    pub fn new(curricula: Vec<Curriculum>) -> Self {
        Self { curricula }
    }

    pub fn get(&self, id: &CurriculumId) -> Result<&Curriculum> {
        self.curricula
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| AssessmentError::UnknownCurriculum(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Curriculum> {
        self.curricula.iter()
    }
}
