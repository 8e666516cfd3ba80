//! Categorical grading.
//!
//! A continuous ground-truth value is placed into one bucket of an ascending
//! partition; a trainee's discrete guess is scored by its rank distance from
//! that bucket and carried onto the shared percent/letter scale.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, AssessmentError, Result};
use crate::grade::{letter_grade, Grade, GradeScale, ScoreResult};
use crate::model::GroundTruth;

/// Equivalent deviation percent for bucket distances 0, 1, 2, 3 and 4+.
pub const DISTANCE_DEVIATION: [f64; 5] = [0.0, 12.0, 28.0, 45.0, 65.0];

/// One bounded bucket. Values strictly below `upper_bound` (and at or above
/// the previous bucket's bound) fall into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub grade: Grade,
    pub upper_bound: f64,
    #[serde(default)]
    pub name: String,
}

/// Non-overlapping ascending partition of the real line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketPartition {
    buckets: Vec<Bucket>,
    catch_all: Grade,
    #[serde(default)]
    catch_all_name: String,
}

impl BucketPartition {
    /// Bounds must be finite and strictly ascending and no label may repeat.
    pub fn new(buckets: Vec<Bucket>, catch_all: Grade, catch_all_name: impl Into<String>) -> Result<Self> {
        let mut seen = vec![catch_all];
        let mut previous: Option<f64> = None;
        for bucket in &buckets {
            ensure_finite(bucket.upper_bound, "bucket bound")?;
            if previous.is_some_and(|prev| bucket.upper_bound <= prev) {
                return Err(AssessmentError::InvalidInput(
                    "bucket bounds must be strictly ascending".into(),
                ));
            }
            if seen.contains(&bucket.grade) {
                return Err(AssessmentError::InvalidInput(format!(
                    "bucket label {} used more than once",
                    bucket.grade
                )));
            }
            seen.push(bucket.grade);
            previous = Some(bucket.upper_bound);
        }
        Ok(Self {
            buckets,
            catch_all,
            catch_all_name: catch_all_name.into(),
        })
    }

    /// Renovation scope by budget: cosmetic, light, moderate, heavy, full gut.
    pub fn renovation_scope() -> Self {
        let bucket = |grade, upper_bound: f64, name: &str| Bucket {
            grade,
            upper_bound,
            name: name.to_string(),
        };
        Self {
            buckets: vec![
                bucket(Grade::A, 15_000.0, "Cosmetic (under $15k)"),
                bucket(Grade::B, 35_000.0, "Light ($15k-$35k)"),
                bucket(Grade::C, 60_000.0, "Moderate ($35k-$60k)"),
                bucket(Grade::D, 100_000.0, "Heavy ($60k-$100k)"),
            ],
            catch_all: Grade::F,
            catch_all_name: "Full gut ($100k+)".to_string(),
        }
    }

    pub fn catch_all(&self) -> Grade {
        self.catch_all
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// `(label, display name)` for every bucket including the catch-all.
    pub fn options(&self) -> Vec<(Grade, &str)> {
        self.buckets
            .iter()
            .map(|b| (b.grade, b.name.as_str()))
            .chain(std::iter::once((self.catch_all, self.catch_all_name.as_str())))
            .collect()
    }

    /// Label of the bucket containing `value`.
    pub fn bucket_of(&self, value: f64) -> Grade {
        self.buckets
            .iter()
            .find(|b| value < b.upper_bound)
            .map(|b| b.grade)
            .unwrap_or(self.catch_all)
    }
}

impl Default for BucketPartition {
    fn default() -> Self {
        Self::renovation_scope()
    }
}

/// Rank distance between two labels.
pub fn bucket_distance(user: Grade, truth: Grade) -> u8 {
    user.rank().abs_diff(truth.rank())
}

/// Equivalent deviation percent for a bucket distance.
pub fn distance_to_deviation(distance: u8) -> f64 {
    let index = (distance as usize).min(DISTANCE_DEVIATION.len() - 1);
    DISTANCE_DEVIATION[index]
}

/// Score a discrete guess against the ground truth.
///
/// A precomputed truth label takes precedence over the continuous value.
pub fn score_categorical(
    user: Grade,
    truth: &GroundTruth,
    partition: &BucketPartition,
    scale: &GradeScale,
) -> Result<ScoreResult> {
    let truth_label = match (truth.label, truth.value) {
        (Some(label), _) => label,
        (None, Some(value)) => partition.bucket_of(ensure_finite(value, "ground truth")?),
        (None, None) => {
            return Err(AssessmentError::InvalidInput(
                "ground truth has neither a value nor a label".into(),
            ))
        }
    };

    let distance = bucket_distance(user, truth_label);
    let deviation = distance_to_deviation(distance);
    Ok(ScoreResult::Categorical {
        bucket_distance: distance,
        deviation_percent: deviation,
        grade: letter_grade(deviation, scale),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_of_uses_exclusive_upper_bounds() {
        let p = BucketPartition::renovation_scope();
        assert_eq!(p.bucket_of(0.0), Grade::A);
        assert_eq!(p.bucket_of(14_999.0), Grade::A);
        assert_eq!(p.bucket_of(15_000.0), Grade::B);
        assert_eq!(p.bucket_of(59_999.99), Grade::C);
        assert_eq!(p.bucket_of(100_000.0), Grade::F);
        assert_eq!(p.bucket_of(1.0e9), Grade::F);
    }

    #[test]
    fn distance_table_is_literal() {
        assert_eq!(distance_to_deviation(0), 0.0);
        assert_eq!(distance_to_deviation(1), 12.0);
        assert_eq!(distance_to_deviation(2), 28.0);
        assert_eq!(distance_to_deviation(3), 45.0);
        assert_eq!(distance_to_deviation(4), 65.0);
        assert_eq!(distance_to_deviation(9), 65.0);
    }

    #[test]
    fn scores_by_distance() {
        let p = BucketPartition::renovation_scope();
        let scale = GradeScale::default();
        let truth = GroundTruth::value(42_000.0); // C

        let exact = score_categorical(Grade::C, &truth, &p, &scale).unwrap();
        assert_eq!(exact.grade(), Grade::A);
        assert_eq!(exact.deviation_percent(), 0.0);

        let one_off = score_categorical(Grade::B, &truth, &p, &scale).unwrap();
        assert!(matches!(
            one_off,
            ScoreResult::Categorical {
                bucket_distance: 1,
                grade: Grade::C,
                ..
            }
        ));

        let far = score_categorical(Grade::F, &GroundTruth::value(1_000.0), &p, &scale).unwrap();
        assert!(matches!(
            far,
            ScoreResult::Categorical {
                bucket_distance: 4,
                grade: Grade::F,
                ..
            }
        ));
    }

    #[test]
    fn precomputed_label_wins() {
        let p = BucketPartition::renovation_scope();
        let truth = GroundTruth {
            value: Some(1_000.0),
            label: Some(Grade::D),
        };
        let r = score_categorical(Grade::D, &truth, &p, &GradeScale::default()).unwrap();
        assert_eq!(r.deviation_percent(), 0.0);
    }

    #[test]
    fn missing_truth_is_rejected() {
        let truth = GroundTruth {
            value: None,
            label: None,
        };
        let err = score_categorical(
            Grade::A,
            &truth,
            &BucketPartition::default(),
            &GradeScale::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidInput(_)));
    }

    #[test]
    fn partition_validation() {
        let b = |grade, upper_bound| Bucket {
            grade,
            upper_bound,
            name: String::new(),
        };
        assert!(BucketPartition::new(vec![b(Grade::A, 10.0), b(Grade::B, 5.0)], Grade::F, "").is_err());
        assert!(BucketPartition::new(vec![b(Grade::A, 10.0), b(Grade::A, 20.0)], Grade::F, "").is_err());
        assert!(BucketPartition::new(vec![b(Grade::F, 10.0)], Grade::F, "").is_err());
        let ok = BucketPartition::new(vec![b(Grade::A, 10.0), b(Grade::C, 20.0)], Grade::F, "rest").unwrap();
        assert_eq!(ok.options().len(), 3);
    }
}
