//! Multiple-choice distractor generation.
//!
//! The true value is scaled by a fixed set of offsets, rounded to a coarse
//! unit, de-collided, tagged, and shuffled so the correct answer lands in a
//! uniformly random slot.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, AssessmentError, Result};

/// A multiple-choice slot label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
}

impl Choice {
    pub const ALL: [Choice; 5] = [Choice::A, Choice::B, Choice::C, Choice::D, Choice::E];

    /// Zero-based slot position.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
            Choice::E => "E",
        };
        f.write_str(s)
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            "E" => Ok(Choice::E),
            other => Err(format!("unknown choice: {other}")),
        }
    }
}

/// Offsets and rounding used to build candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorConfig {
    /// Multipliers applied to the true value; exactly one must be `1.0`.
    #[serde(default = "default_offsets")]
    pub offsets: Vec<f64>,
    /// Candidates are rounded to the nearest multiple of this unit.
    #[serde(default = "default_rounding_unit")]
    pub rounding_unit: u64,
}

fn default_offsets() -> Vec<f64> {
    vec![0.8, 0.9, 1.0, 1.1, 1.2]
}

fn default_rounding_unit() -> u64 {
    5_000
}

impl Default for DistractorConfig {
    fn default() -> Self {
        Self {
            offsets: default_offsets(),
            rounding_unit: default_rounding_unit(),
        }
    }
}

impl DistractorConfig {
    /// Position of the `1.0` offset.
    fn correct_index(&self) -> Result<usize> {
        if self.offsets.len() < 2 || self.offsets.len() > Choice::ALL.len() {
            return Err(AssessmentError::InvalidInput(format!(
                "distractor offsets must hold 2 to {} values, got {}",
                Choice::ALL.len(),
                self.offsets.len()
            )));
        }
        if self.rounding_unit == 0 {
            return Err(AssessmentError::InvalidInput(
                "distractor rounding unit must be positive".into(),
            ));
        }
        for &offset in &self.offsets {
            let offset = ensure_non_negative(offset, "distractor offset")?;
            if offset == 0.0 {
                return Err(AssessmentError::InvalidInput(
                    "distractor offsets must be positive".into(),
                ));
            }
        }
        let mut exact = self.offsets.iter().enumerate().filter(|(_, &o)| o == 1.0);
        match (exact.next(), exact.next()) {
            (Some((index, _)), None) => Ok(index),
            _ => Err(AssessmentError::InvalidInput(
                "distractor offsets must contain exactly one 1.0".into(),
            )),
        }
    }
}

/// One labelled answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: Choice,
    pub value: u64,
}

/// Shuffled answer options plus the label of the correct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractorSet {
    pub candidates: Vec<Candidate>,
    pub correct_label: Choice,
}

impl DistractorSet {
    pub fn is_correct(&self, choice: Choice) -> bool {
        choice == self.correct_label
    }

    pub fn value_of(&self, choice: Choice) -> Option<u64> {
        self.candidates
            .iter()
            .find(|c| c.label == choice)
            .map(|c| c.value)
    }

    pub fn correct_value(&self) -> u64 {
        self.candidates[self.correct_label.index()].value
    }
}

/// Round to the nearest multiple of `unit`, halves away from zero.
pub fn round_to_unit(value: f64, unit: u64) -> u64 {
    let unit_f = unit as f64;
    ((value / unit_f).round() as u64) * unit
}

/// Un-shuffled candidate values and the index of the correct one.
///
/// The correct value is reserved first; every other candidate is then scanned
/// left to right and nudged up one unit at a time until it collides with
/// nothing seen so far.
pub fn candidate_values(true_value: f64, config: &DistractorConfig) -> Result<(Vec<u64>, usize)> {
    let true_value = ensure_non_negative(true_value, "true value")?;
    let correct_index = config.correct_index()?;

    let mut values: Vec<u64> = config
        .offsets
        .iter()
        .map(|offset| round_to_unit(true_value * offset, config.rounding_unit))
        .collect();

    let mut seen = HashSet::with_capacity(values.len());
    seen.insert(values[correct_index]);
    for (i, value) in values.iter_mut().enumerate() {
        if i == correct_index {
            continue;
        }
        while seen.contains(value) {
            *value += config.rounding_unit;
        }
        seen.insert(*value);
    }

    Ok((values, correct_index))
}

/// Generate a shuffled [`DistractorSet`] with the default offsets.
pub fn generate_distractors(true_value: f64) -> Result<DistractorSet> {
    generate_distractors_with(true_value, &DistractorConfig::default(), &mut rand::thread_rng())
}

/// Generate a shuffled [`DistractorSet`] with explicit configuration and RNG.
pub fn generate_distractors_with<R: Rng + ?Sized>(
    true_value: f64,
    config: &DistractorConfig,
    rng: &mut R,
) -> Result<DistractorSet> {
    let (values, correct_index) = candidate_values(true_value, config)?;

    let mut tagged: Vec<(u64, bool)> = values
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, i == correct_index))
        .collect();
    tagged.shuffle(rng);

    let mut correct_label = Choice::A;
    let candidates: Vec<Candidate> = tagged
        .into_iter()
        .zip(Choice::ALL)
        .map(|((value, is_correct), label)| {
            if is_correct {
                correct_label = label;
            }
            Candidate { label, value }
        })
        .collect();

    Ok(DistractorSet {
        candidates,
        correct_label,
    })
}
