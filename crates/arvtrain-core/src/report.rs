//! Unit summaries and session history with JSON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{GradeDistribution, Headline};
use crate::curriculum::{CurriculumId, UnitResult};
use crate::grade::Grade;
use crate::session::ValuationSummary;

/// Most recent sessions kept in the history file.
pub const HISTORY_LIMIT: usize = 50;

/// One completed unit attempt as appended to a result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unique attempt identifier.
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub trainee: String,
    pub curriculum: CurriculumId,
    pub unit_index: usize,
    pub unit_name: String,
    pub passed: bool,
    pub questions: usize,
    pub headline: Headline,
    pub result: UnitResult,
    /// Flattened metrics for spreadsheet-style consumers.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

/// Load unit summaries from a JSON-lines file, skipping lines that do not parse.
pub fn load_summaries_jsonl(path: &Path) -> Result<Vec<UnitSummary>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read results from {}", path.display()))?;
    let mut summaries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<UnitSummary>(line) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("skipping {}:{}: {e}", path.display(), line_no + 1),
        }
    }
    Ok(summaries)
}

/// A finished valuation session as shown in the history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub date: DateTime<Utc>,
    pub total_questions: usize,
    pub overall_grade: Grade,
    pub avg_arv_pct: f64,
    pub avg_reno_pct: f64,
    pub grade_dist: GradeDistribution,
}

impl SessionRecord {
    pub fn from_summary(summary: &ValuationSummary, date: DateTime<Utc>) -> Self {
        Self {
            date,
            total_questions: summary.questions,
            overall_grade: summary.overall_grade,
            avg_arv_pct: summary.avg_arv_deviation,
            avg_reno_pct: summary.avg_reno_deviation,
            grade_dist: summary.distribution.clone(),
        }
    }
}

/// Newest-first list of past sessions, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    records: Vec<SessionRecord>,
}

impl SessionHistory {
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.records.insert(0, record);
        self.records.truncate(HISTORY_LIMIT);
    }

    /// Save the history as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize history")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
        Ok(())
    }

    /// Load a history from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read history from {}", path.display()))?;
        let mut history: SessionHistory =
            serde_json::from_str(&content).context("failed to parse history JSON")?;
        history.records.truncate(HISTORY_LIMIT);
        Ok(history)
    }

    /// Like [`load_json`](Self::load_json), but a missing or unreadable file
    /// is an empty history.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load_json(path).unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable history: {e:#}");
            Self::default()
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn summary(trainee: &str, passed: bool, questions: usize, grade: Grade, deviation: f64) -> UnitSummary {
        UnitSummary {
            run_id: Uuid::nil(),
            recorded_at: Utc::now(),
            trainee: trainee.into(),
            curriculum: "valuation".into(),
            unit_index: 0,
            unit_name: "Unit 1".into(),
            passed,
            questions,
            headline: Headline {
                grade,
                deviation_percent: deviation,
            },
            result: UnitResult::Categorical {
                questions,
                avg_deviation: deviation,
            },
            metrics: BTreeMap::new(),
        }
    }
}
