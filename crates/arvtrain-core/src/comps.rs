//! Comparable-issue scoring.
//!
//! A trainee reviews a candidate comparable sale and marks which similarity
//! criteria it fails, or declares it a good comp. Each tag in the universe is
//! worth one point for agreeing with the ground truth on presence/absence and
//! the overall good/bad call is worth one more.

use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result};

/// A reason a candidate sale is not a valid comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompIssue {
    SaleTooOld,
    TooFarAway,
    SizeMismatch,
    BedBathMismatch,
    AgeMismatch,
    StyleMismatch,
    ConditionMismatch,
    DifferentNeighborhood,
}

impl CompIssue {
    /// The standard tag universe.
    pub const ALL: [CompIssue; 8] = [
        CompIssue::SaleTooOld,
        CompIssue::TooFarAway,
        CompIssue::SizeMismatch,
        CompIssue::BedBathMismatch,
        CompIssue::AgeMismatch,
        CompIssue::StyleMismatch,
        CompIssue::ConditionMismatch,
        CompIssue::DifferentNeighborhood,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompIssue::SaleTooOld => "sale_too_old",
            CompIssue::TooFarAway => "too_far_away",
            CompIssue::SizeMismatch => "size_mismatch",
            CompIssue::BedBathMismatch => "bed_bath_mismatch",
            CompIssue::AgeMismatch => "age_mismatch",
            CompIssue::StyleMismatch => "style_mismatch",
            CompIssue::ConditionMismatch => "condition_mismatch",
            CompIssue::DifferentNeighborhood => "different_neighborhood",
        }
    }

    /// Trainee-facing description.
    pub fn describe(self) -> &'static str {
        match self {
            CompIssue::SaleTooOld => "Sold more than 6 months ago",
            CompIssue::TooFarAway => "More than 1 mile away",
            CompIssue::SizeMismatch => "Living area differs by more than 20%",
            CompIssue::BedBathMismatch => "Different bed/bath count",
            CompIssue::AgeMismatch => "Built more than 20 years apart",
            CompIssue::StyleMismatch => "Different property style",
            CompIssue::ConditionMismatch => "Not in renovated condition",
            CompIssue::DifferentNeighborhood => "Different subdivision or school zone",
        }
    }
}

impl fmt::Display for CompIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompIssue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        CompIssue::ALL
            .into_iter()
            .find(|issue| issue.as_str() == wanted)
            .ok_or_else(|| format!("unknown comp issue: {}", s.trim()))
    }
}

/// A candidate comparable with its ground-truth defects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparableRecord {
    pub address: String,
    /// Empty means the sale is a valid comparable.
    #[serde(default)]
    pub issues: BTreeSet<CompIssue>,
}

impl ComparableRecord {
    pub fn is_good(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A named group of comparables reviewed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompScenario {
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub comps: Vec<ComparableRecord>,
}

/// Points earned out of points possible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompScore {
    pub points: u32,
    pub total: u32,
}

impl CompScore {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.points as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.points == self.total
    }
}

impl Add for CompScore {
    type Output = CompScore;

    fn add(self, rhs: CompScore) -> CompScore {
        CompScore {
            points: self.points + rhs.points,
            total: self.total + rhs.total,
        }
    }
}

impl Sum for CompScore {
    fn sum<I: Iterator<Item = CompScore>>(iter: I) -> CompScore {
        iter.fold(CompScore::default(), Add::add)
    }
}

/// Score one comparable.
///
/// `user_good` must agree with `user_tags`: a comp declared good carries no tags.
/// Every tag on either side must belong to `universe`.
pub fn score_comparable(
    user_tags: &BTreeSet<CompIssue>,
    user_good: bool,
    truth_tags: &BTreeSet<CompIssue>,
    universe: &[CompIssue],
) -> Result<CompScore> {
    if user_good && !user_tags.is_empty() {
        return Err(AssessmentError::InvalidInput(
            "a comp marked good cannot also carry issue tags".into(),
        ));
    }
    let mut distinct = BTreeSet::new();
    if !universe.iter().all(|tag| distinct.insert(*tag)) {
        return Err(AssessmentError::InvalidInput(
            "tag universe contains duplicates".into(),
        ));
    }
    if let Some(stray) = user_tags
        .iter()
        .chain(truth_tags.iter())
        .find(|tag| !distinct.contains(*tag))
    {
        return Err(AssessmentError::InvalidInput(format!(
            "tag {stray} is outside the tag universe"
        )));
    }

    let agreements = universe
        .iter()
        .filter(|tag| user_tags.contains(*tag) == truth_tags.contains(*tag))
        .count() as u32;
    let good_agrees = u32::from(user_good == truth_tags.is_empty());

    Ok(CompScore {
        points: agreements + good_agrees,
        total: universe.len() as u32 + 1,
    })
}

/// Pooled scenario score: total points over total possible, as a percentage.
pub fn scenario_percent(items: &[CompScore]) -> Result<f64> {
    if items.is_empty() {
        return Err(AssessmentError::AggregationOnEmptySet);
    }
    Ok(items.iter().copied().sum::<CompScore>().percent())
}

/// How many scenario percentages reach `pass_percent`.
pub fn passing_scenarios(scenario_percents: &[f64], pass_percent: f64) -> usize {
    scenario_percents
        .iter()
        .filter(|&&p| p >= pass_percent)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[CompIssue]) -> BTreeSet<CompIssue> {
        list.iter().copied().collect()
    }

    #[test]
    fn full_agreement_on_a_bad_comp() {
        let truth = tags(&[CompIssue::SaleTooOld]);
        let user = tags(&[CompIssue::SaleTooOld]);
        let score = score_comparable(&user, false, &truth, &CompIssue::ALL).unwrap();
        assert_eq!(score, CompScore { points: 9, total: 9 });
        assert_eq!(score.percent(), 100.0);
    }

    #[test]
    fn good_comp_marked_good() {
        let score = score_comparable(&tags(&[]), true, &tags(&[]), &CompIssue::ALL).unwrap();
        assert!(score.is_perfect());
    }

    #[test]
    fn disagreeing_good_flag_costs_one_point() {
        // Trainee marks nothing and says "not good"; truth is a good comp.
        let score = score_comparable(&tags(&[]), false, &tags(&[]), &CompIssue::ALL).unwrap();
        assert_eq!(score, CompScore { points: 8, total: 9 });
    }

    #[test]
    fn partial_credit_per_tag() {
        let truth = tags(&[CompIssue::SaleTooOld, CompIssue::TooFarAway]);
        let user = tags(&[CompIssue::SaleTooOld, CompIssue::SizeMismatch]);
        // misses too_far_away, wrongly flags size_mismatch; good flag agrees
        let score = score_comparable(&user, false, &truth, &CompIssue::ALL).unwrap();
        assert_eq!(score, CompScore { points: 7, total: 9 });
    }

    #[test]
    fn marking_a_bad_comp_as_good() {
        let truth = tags(&[CompIssue::AgeMismatch]);
        let score = score_comparable(&tags(&[]), true, &truth, &CompIssue::ALL).unwrap();
        assert_eq!(score, CompScore { points: 7, total: 9 });
    }

    #[test]
    fn inconsistent_or_stray_input_is_rejected() {
        let user = tags(&[CompIssue::SaleTooOld]);
        assert!(score_comparable(&user, true, &tags(&[]), &CompIssue::ALL).is_err());

        let small = [CompIssue::SaleTooOld];
        let stray = tags(&[CompIssue::TooFarAway]);
        assert!(score_comparable(&tags(&[]), false, &stray, &small).is_err());

        let dupes = [CompIssue::SaleTooOld, CompIssue::SaleTooOld];
        assert!(score_comparable(&tags(&[]), true, &tags(&[]), &dupes).is_err());
    }

    #[test]
    fn scenario_pools_points() {
        let items = [
            CompScore { points: 9, total: 9 },
            CompScore { points: 5, total: 9 },
            CompScore { points: 9, total: 9 },
        ];
        let pct = scenario_percent(&items).unwrap();
        assert!((pct - 23.0 / 27.0 * 100.0).abs() < 1e-9);
        assert_eq!(scenario_percent(&[]), Err(AssessmentError::AggregationOnEmptySet));
    }

    #[test]
    fn counting_passing_scenarios() {
        assert_eq!(passing_scenarios(&[80.0, 79.9, 100.0], 80.0), 2);
    }

    #[test]
    fn issue_parsing() {
        assert_eq!("sale_too_old".parse::<CompIssue>().unwrap(), CompIssue::SaleTooOld);
        assert_eq!("Too Far Away".parse::<CompIssue>().unwrap(), CompIssue::TooFarAway);
        assert!("pool".parse::<CompIssue>().is_err());
    }
}
