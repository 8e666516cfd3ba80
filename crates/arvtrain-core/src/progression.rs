//! Progression state machine.
//!
//! Unit state is never stored. It is derived from the trainee's
//! [`ProgressRecord`]: the contiguous run of completed units starting at
//! index 0 is the frontier, the unit right after it is unlocked, everything
//! beyond is locked. While a curriculum's prerequisite is not certified,
//! none of its uncompleted units unlock. A curriculum whose final unit is
//! completed is certified and may then be reset.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curriculum::{Curriculum, CurriculumId, UnitResult};
use crate::error::{AssessmentError, Result};

/// Derived availability of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Locked,
    Unlocked,
    Completed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Locked => write!(f, "locked"),
            UnitState::Unlocked => write!(f, "unlocked"),
            UnitState::Completed => write!(f, "completed"),
        }
    }
}

/// One trainee's progress through one curriculum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumProgress {
    #[serde(default)]
    pub completed: BTreeSet<usize>,
    /// Latest passing result for each completed unit.
    #[serde(default)]
    pub results: BTreeMap<usize, UnitResult>,
    #[serde(default)]
    pub certified_at: Option<DateTime<Utc>>,
}

impl CurriculumProgress {
    /// Number of contiguous completed units starting at index 0.
    pub fn frontier(&self) -> usize {
        (0..).take_while(|i| self.completed.contains(i)).count()
    }
}

/// Per-trainee progress across all curricula, keyed by curriculum id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub curricula: BTreeMap<CurriculumId, CurriculumProgress>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curriculum(&self, id: &CurriculumId) -> Option<&CurriculumProgress> {
        self.curricula.get(id)
    }

    pub fn frontier(&self, id: &CurriculumId) -> usize {
        self.curriculum(id).map(|p| p.frontier()).unwrap_or(0)
    }

    pub fn is_certified(&self, id: &CurriculumId) -> bool {
        self.curriculum(id)
            .is_some_and(|p| p.certified_at.is_some())
    }
}

/// Whether the curriculum-level prerequisite, if any, is certified.
pub fn gate_open(curriculum: &Curriculum, progress: &ProgressRecord) -> bool {
    curriculum
        .requires
        .as_ref()
        .map_or(true, |required| progress.is_certified(required))
}

/// State of unit `index` of `curriculum` for this trainee.
pub fn unit_state(curriculum: &Curriculum, index: usize, progress: &ProgressRecord) -> Result<UnitState> {
    curriculum.unit(index)?;
    let frontier = progress.frontier(&curriculum.id);
    let state = if index < frontier {
        UnitState::Completed
    } else if index == frontier && gate_open(curriculum, progress) {
        UnitState::Unlocked
    } else {
        UnitState::Locked
    };
    Ok(state)
}

/// States of every unit, in order.
pub fn unit_states(curriculum: &Curriculum, progress: &ProgressRecord) -> Vec<UnitState> {
    (0..curriculum.units.len())
        .map(|i| unit_state(curriculum, i, progress).unwrap_or(UnitState::Locked))
        .collect()
}

/// True once every unit of the curriculum has been completed.
pub fn is_certified(curriculum: &Curriculum, progress: &ProgressRecord) -> bool {
    !curriculum.units.is_empty() && progress.frontier(&curriculum.id) >= curriculum.units.len()
}

/// The unit the trainee should attempt next, if any is unlocked.
pub fn next_unit(curriculum: &Curriculum, progress: &ProgressRecord) -> Option<usize> {
    let frontier = progress.frontier(&curriculum.id);
    match unit_state(curriculum, frontier, progress) {
        Ok(UnitState::Unlocked) => Some(frontier),
        _ => None,
    }
}

/// What happened when a unit result was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub progress: ProgressRecord,
    pub passed: bool,
    pub state: UnitState,
    /// Set when this result completed the final unit.
    pub newly_certified: bool,
}

/// Apply one unit attempt to a trainee's progress.
///
/// A passing result completes an unlocked unit; a failing result changes
/// nothing. Completed units never regress, and a re-attempt only replaces the
/// stored result when it also passes. Locked units refuse results.
pub fn record_unit_result(
    curriculum: &Curriculum,
    index: usize,
    result: &UnitResult,
    progress: ProgressRecord,
) -> Result<RecordOutcome> {
    let state = unit_state(curriculum, index, &progress)?;
    if state == UnitState::Locked {
        return Err(AssessmentError::InvalidTransition(format!(
            "unit {index} of {} is locked",
            curriculum.id
        )));
    }

    let passed = curriculum.units[index].kind.passes(result)?;
    if !passed {
        tracing::debug!(curriculum = %curriculum.id, unit = index, "attempt did not pass");
        return Ok(RecordOutcome {
            progress,
            passed,
            state,
            newly_certified: false,
        });
    }

    let mut progress = progress;
    let was_certified = progress.is_certified(&curriculum.id);
    let entry = progress.curricula.entry(curriculum.id.clone()).or_default();
    entry.completed.insert(index);
    entry.results.insert(index, result.clone());

    let newly_certified = !was_certified && entry.frontier() >= curriculum.units.len();
    if newly_certified {
        entry.certified_at = Some(Utc::now());
        tracing::info!(curriculum = %curriculum.id, "curriculum certified");
    } else {
        tracing::info!(curriculum = %curriculum.id, unit = index, "unit completed");
    }

    Ok(RecordOutcome {
        progress,
        passed,
        state: UnitState::Completed,
        newly_certified,
    })
}

/// Clear every completion mark of a certified curriculum.
pub fn reset_curriculum(curriculum: &Curriculum, progress: ProgressRecord) -> Result<ProgressRecord> {
    if !progress.is_certified(&curriculum.id) {
        return Err(AssessmentError::InvalidTransition(format!(
            "curriculum {} is not certified and cannot be reset",
            curriculum.id
        )));
    }
    let mut progress = progress;
    progress.curricula.remove(&curriculum.id);
    tracing::info!(curriculum = %curriculum.id, "curriculum reset");
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::fixtures::*;
    use proptest::prelude::*;

    fn complete(curriculum: &Curriculum, progress: ProgressRecord, index: usize) -> ProgressRecord {
        record_unit_result(curriculum, index, &passing_result(), progress)
            .unwrap()
            .progress
    }

    #[test]
    fn fresh_record_unlocks_only_the_first_unit() {
        let c = curriculum("valuation", 4);
        let p = ProgressRecord::new();
        assert_eq!(
            unit_states(&c, &p),
            vec![
                UnitState::Unlocked,
                UnitState::Locked,
                UnitState::Locked,
                UnitState::Locked
            ]
        );
        assert_eq!(next_unit(&c, &p), Some(0));
    }

    #[test]
    fn passing_advances_the_frontier() {
        let c = curriculum("valuation", 3);
        let outcome = record_unit_result(&c, 0, &passing_result(), ProgressRecord::new()).unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.state, UnitState::Completed);
        assert!(!outcome.newly_certified);
        assert_eq!(unit_state(&c, 1, &outcome.progress).unwrap(), UnitState::Unlocked);
        assert_eq!(unit_state(&c, 2, &outcome.progress).unwrap(), UnitState::Locked);
    }

    #[test]
    fn failing_leaves_the_unit_retriable() {
        let c = curriculum("valuation", 3);
        let outcome = record_unit_result(&c, 0, &failing_result(), ProgressRecord::new()).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.state, UnitState::Unlocked);
        assert_eq!(outcome.progress, ProgressRecord::new());
    }

    #[test]
    fn completed_units_never_regress() {
        let c = curriculum("valuation", 3);
        let p = complete(&c, ProgressRecord::new(), 0);
        let outcome = record_unit_result(&c, 0, &failing_result(), p.clone()).unwrap();
        assert_eq!(outcome.state, UnitState::Completed);
        assert_eq!(outcome.progress, p);
    }

    #[test]
    fn locked_units_refuse_results() {
        let c = curriculum("valuation", 3);
        let err = record_unit_result(&c, 2, &passing_result(), ProgressRecord::new()).unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidTransition(_)));
    }

    #[test]
    fn out_of_range_unit() {
        let c = curriculum("valuation", 2);
        assert!(matches!(
            unit_state(&c, 2, &ProgressRecord::new()),
            Err(AssessmentError::InvalidInput(_))
        ));
    }

    #[test]
    fn final_unit_certifies_and_reset_returns_to_start() {
        let c = curriculum("valuation", 2);
        let p = complete(&c, ProgressRecord::new(), 0);
        let outcome = record_unit_result(&c, 1, &passing_result(), p).unwrap();
        assert!(outcome.newly_certified);
        assert!(outcome.progress.is_certified(&c.id));
        assert!(is_certified(&c, &outcome.progress));
        assert_eq!(next_unit(&c, &outcome.progress), None);

        let reset = reset_curriculum(&c, outcome.progress).unwrap();
        assert_eq!(unit_state(&c, 0, &reset).unwrap(), UnitState::Unlocked);
        assert_eq!(unit_state(&c, 1, &reset).unwrap(), UnitState::Locked);
        assert!(!reset.is_certified(&c.id));
    }

    #[test]
    fn reset_requires_certification() {
        let c = curriculum("valuation", 2);
        let p = complete(&c, ProgressRecord::new(), 0);
        assert!(matches!(
            reset_curriculum(&c, p),
            Err(AssessmentError::InvalidTransition(_))
        ));
    }

    #[test]
    fn curricula_are_independent_except_for_the_gate() {
        let valuation = curriculum("valuation", 1);
        let mut sales = curriculum("sales", 2);
        sales.requires = Some(valuation.id.clone());

        let p = ProgressRecord::new();
        assert_eq!(unit_state(&sales, 0, &p).unwrap(), UnitState::Locked);

        let p = complete(&valuation, p, 0);
        assert!(p.is_certified(&valuation.id));
        assert_eq!(unit_state(&sales, 0, &p).unwrap(), UnitState::Unlocked);
        assert_eq!(unit_state(&sales, 1, &p).unwrap(), UnitState::Locked);

        let p = complete(&sales, p, 0);
        assert_eq!(unit_state(&valuation, 0, &p).unwrap(), UnitState::Completed);
    }

    #[test]
    fn resetting_the_prerequisite_relocks_open_units() {
        let valuation = curriculum("valuation", 1);
        let mut sales = curriculum("sales", 3);
        sales.requires = Some(valuation.id.clone());

        let p = complete(&valuation, ProgressRecord::new(), 0);
        let p = complete(&sales, p, 0);
        assert_eq!(unit_state(&sales, 1, &p).unwrap(), UnitState::Unlocked);

        let p = reset_curriculum(&valuation, p).unwrap();
        assert_eq!(
            unit_states(&sales, &p),
            vec![UnitState::Completed, UnitState::Locked, UnitState::Locked]
        );
        assert_eq!(next_unit(&sales, &p), None);
        let err = record_unit_result(&sales, 1, &passing_result(), p).unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidTransition(_)));
    }

    #[test]
    fn gaps_in_a_loaded_record_do_not_unlock_later_units() {
        let c = curriculum("valuation", 4);
        let mut p = ProgressRecord::new();
        p.curricula
            .entry(c.id.clone())
            .or_default()
            .completed
            .extend([0, 2, 3]);
        assert_eq!(
            unit_states(&c, &p),
            vec![
                UnitState::Completed,
                UnitState::Unlocked,
                UnitState::Locked,
                UnitState::Locked
            ]
        );
    }

    #[test]
    fn state_is_idempotent() {
        let c = curriculum("valuation", 3);
        let p = complete(&c, ProgressRecord::new(), 0);
        assert_eq!(unit_state(&c, 1, &p).unwrap(), unit_state(&c, 1, &p).unwrap());
    }

    proptest! {
        #[test]
        fn no_unit_opens_before_its_predecessor_completes(
            attempts in prop::collection::vec((0usize..6, any::<bool>()), 0..40)
        ) {
            let c = curriculum("valuation", 6);
            let mut progress = ProgressRecord::new();
            for (index, pass) in attempts {
                let result = if pass { passing_result() } else { failing_result() };
                if let Ok(outcome) = record_unit_result(&c, index, &result, progress.clone()) {
                    progress = outcome.progress;
                }
                let states = unit_states(&c, &progress);
                for i in 1..states.len() {
                    if states[i] != UnitState::Locked {
                        prop_assert_eq!(states[i - 1], UnitState::Completed);
                    }
                }
            }
        }
    }
}
