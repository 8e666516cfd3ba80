//! Grading primitives.
//!
//! Percent deviation, threshold-based letter grades, the fixed ordinal rank of
//! each grade, and the weighted composite used to fold two grades into one.
//! The primitives are total over finite input; `score_numeric` is the checked
//! entry point that rejects non-finite or negative values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, AssessmentError, Result};

/// Letter grade, `A` best through `F` worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// All grades from best to worst.
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// Fixed ordinal: A=4, B=3, C=2, D=1, F=0.
    pub fn rank(self) -> u8 {
        match self {
            Grade::A => 4,
            Grade::B => 3,
            Grade::C => 2,
            Grade::D => 1,
            Grade::F => 0,
        }
    }

    /// Map a continuous rank back to a grade using the cut points
    /// 3.5 / 2.5 / 1.5 / 0.5.
    pub fn from_rank(rank: f64) -> Grade {
        if rank >= 3.5 {
            Grade::A
        } else if rank >= 2.5 {
            Grade::B
        } else if rank >= 1.5 {
            Grade::C
        } else if rank >= 0.5 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade: {other}")),
        }
    }
}

/// Rank of a free-form label. Anything outside the vocabulary ranks as `F`.
pub fn grade_to_rank(label: &str) -> u8 {
    label.parse::<Grade>().map(Grade::rank).unwrap_or(0)
}

/// Curriculum default bounds; anything above 35% is an `F`.
pub const DEFAULT_THRESHOLDS: [(Grade, f64); 4] = [
    (Grade::A, 5.0),
    (Grade::B, 10.0),
    (Grade::C, 20.0),
    (Grade::D, 35.0),
];

/// One `(label, max deviation)` bound of a [`GradeScale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: Grade,
    pub max_deviation: f64,
}

/// Ordered deviation thresholds terminating in an unbounded catch-all.
///
/// Bands are checked in ascending order and the first band whose bound is at
/// least the deviation wins; nothing is "closest bound" here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    bands: Vec<GradeBand>,
    catch_all: Grade,
}

impl GradeScale {
    /// Build a scale. Bounds must be finite, non-negative and strictly ascending.
    pub fn new(bands: Vec<GradeBand>, catch_all: Grade) -> Result<Self> {
        let mut previous: Option<f64> = None;
        for band in &bands {
            ensure_non_negative(band.max_deviation, "grade threshold")?;
            if let Some(prev) = previous {
                if band.max_deviation <= prev {
                    return Err(AssessmentError::InvalidInput(format!(
                        "grade thresholds must be strictly ascending ({} follows {prev})",
                        band.max_deviation
                    )));
                }
            }
            previous = Some(band.max_deviation);
        }
        Ok(Self { bands, catch_all })
    }

    /// Build a scale from `(grade, bound)` pairs with `F` as the catch-all.
    pub fn from_pairs(pairs: &[(Grade, f64)]) -> Result<Self> {
        let bands = pairs
            .iter()
            .map(|&(grade, max_deviation)| GradeBand {
                grade,
                max_deviation,
            })
            .collect();
        Self::new(bands, Grade::F)
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn catch_all(&self) -> Grade {
        self.catch_all
    }

    /// The grade awarded for a perfect (zero deviation) answer.
    pub fn best_grade(&self) -> Grade {
        self.bands
            .first()
            .map(|b| b.grade)
            .unwrap_or(self.catch_all)
    }

    /// Letter grade for a deviation percentage.
    pub fn grade(&self, deviation_percent: f64) -> Grade {
        letter_grade(deviation_percent, self)
    }
}

impl Default for GradeScale {
    /// A≤5%, B≤10%, C≤20%, D≤35%, F otherwise.
    fn default() -> Self {
        let bands = DEFAULT_THRESHOLDS
            .iter()
            .map(|&(grade, max_deviation)| GradeBand {
                grade,
                max_deviation,
            })
            .collect();
        Self {
            bands,
            catch_all: Grade::F,
        }
    }
}

/// Absolute deviation of `estimate` from `actual` as a percentage of `actual`.
///
/// A zero or absent `actual` yields the 100% "maximally wrong" sentinel.
pub fn deviation_percent(estimate: f64, actual: impl Into<Option<f64>>) -> f64 {
    match actual.into() {
        Some(actual) if actual != 0.0 => (estimate - actual).abs() / actual * 100.0,
        _ => 100.0,
    }
}

/// First band (ascending) whose bound is at least `deviation_percent`,
/// otherwise the catch-all.
pub fn letter_grade(deviation_percent: f64, scale: &GradeScale) -> Grade {
    scale
        .bands
        .iter()
        .find(|band| deviation_percent <= band.max_deviation)
        .map(|band| band.grade)
        .unwrap_or(scale.catch_all)
}

/// Combine two grades by weighted rank, e.g. 60/40 valuation/renovation.
pub fn weighted_composite(grade_a: Grade, grade_b: Grade, weight_a: f64, weight_b: f64) -> Grade {
    let rank = grade_a.rank() as f64 * weight_a + grade_b.rank() as f64 * weight_b;
    Grade::from_rank(rank)
}

/// Outcome of grading a single estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreResult {
    /// A continuous estimate graded by percent deviation.
    Numeric { deviation_percent: f64, grade: Grade },
    /// A discrete guess graded by bucket distance, carried on the percent scale.
    Categorical {
        bucket_distance: u8,
        deviation_percent: f64,
        grade: Grade,
    },
}

impl ScoreResult {
    pub fn grade(&self) -> Grade {
        match self {
            ScoreResult::Numeric { grade, .. } | ScoreResult::Categorical { grade, .. } => *grade,
        }
    }

    /// Deviation on the shared percent scale.
    pub fn deviation_percent(&self) -> f64 {
        match self {
            ScoreResult::Numeric {
                deviation_percent, ..
            }
            | ScoreResult::Categorical {
                deviation_percent, ..
            } => *deviation_percent,
        }
    }
}

/// Grade a continuous estimate against the ground truth.
pub fn score_numeric(estimate: f64, truth: Option<f64>, scale: &GradeScale) -> Result<ScoreResult> {
    let estimate = ensure_non_negative(estimate, "estimate")?;
    let truth = truth
        .map(|t| ensure_non_negative(t, "ground truth"))
        .transpose()?;

    let deviation = deviation_percent(estimate, truth);
    Ok(ScoreResult::Numeric {
        deviation_percent: deviation,
        grade: letter_grade(deviation, scale),
    })
}

/// Parse a trainee's currency entry such as `"$350,000"`.
///
/// Everything except digits and `.` is stripped. Blank or unparsable input is
/// a missing estimate.
pub fn parse_currency(input: &str) -> Result<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| AssessmentError::InvalidInput(format!("not a dollar amount: {input:?}")))
}

/// Format a dollar amount as `$1,234,567`, rounded to whole dollars.
pub fn format_dollars(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0".to_string();
    }
    let whole = amount.round().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < -0.5 { "-" } else { "" };
    format!("{sign}${grouped}")
}
