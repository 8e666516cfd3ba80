//! The `arvtrain history` and `arvtrain leaderboard` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use arvtrain_core::aggregate::{leaderboard as rank_summaries, RankingPolicy};
use arvtrain_core::grade::Grade;
use arvtrain_core::report::{load_summaries_jsonl, SessionHistory};
use arvtrain_store::config::SinkConfig;

use super::load_config;

pub fn execute(config_path: Option<PathBuf>, limit: usize) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let history = SessionHistory::load_or_default(&config.history_path);
    if history.is_empty() {
        println!("No sessions yet. Run `arvtrain train` to start one.");
        return Ok(());
    }

    let mut table = Table::new();
    let mut header = vec!["Date", "Questions", "Grade", "ARV off", "Reno off"];
    header.extend(Grade::ALL.iter().map(|g| g.as_str()));
    table.set_header(header);

    for record in history.records().iter().take(limit) {
        let mut row = vec![
            Cell::new(record.date.format("%Y-%m-%d %H:%M")),
            Cell::new(record.total_questions),
            Cell::new(record.overall_grade),
            Cell::new(format!("{:.1}%", record.avg_arv_pct)),
            Cell::new(format!("{:.1}%", record.avg_reno_pct)),
        ];
        row.extend(Grade::ALL.iter().map(|&g| Cell::new(record.grade_dist.count(g))));
        table.add_row(row);
    }
    println!("{table}");
    println!("{} session(s) on record", history.len());
    Ok(())
}

pub fn leaderboard(
    config_path: Option<PathBuf>,
    results: Option<PathBuf>,
    min_questions: usize,
    include_failed: bool,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let path = match (results, &config.sink) {
        (Some(path), _) => path,
        (None, SinkConfig::Jsonl { path }) => path.clone(),
        (None, _) => anyhow::bail!("no results file; pass --results or use a jsonl sink"),
    };
    let summaries = load_summaries_jsonl(&path)
        .with_context(|| format!("failed to load results from {}", path.display()))?;

    let policy = RankingPolicy {
        min_questions,
        require_pass: !include_failed,
    };
    let entries = rank_summaries(&summaries, &policy);
    if entries.is_empty() {
        println!("No qualifying results (need at least {min_questions} questions).");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Trainee", "Grade", "Avg off", "Questions"]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.rank),
            Cell::new(&entry.trainee),
            Cell::new(entry.grade),
            Cell::new(format!("{:.1}%", entry.deviation_percent)),
            Cell::new(entry.questions),
        ]);
    }
    println!("{table}");
    Ok(())
}
