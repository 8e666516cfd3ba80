//! The `arvtrain train` command.
//!
//! Runs one unit against stdin. `q` (or end of input) stops early; a partial
//! attempt is still recorded but cannot pass.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use arvtrain_core::comps::CompIssue;
use arvtrain_core::curriculum::{CurriculumId, UnitResult};
use arvtrain_core::distractor::Choice;
use arvtrain_core::engine::UnitOutcome;
use arvtrain_core::error::AssessmentError;
use arvtrain_core::grade::{format_dollars, parse_currency, Grade};
use arvtrain_core::model::{Property, RegionFilter};
use arvtrain_core::progression::{is_certified, next_unit};
use arvtrain_core::report::{SessionHistory, SessionRecord};
use arvtrain_core::session::{
    CategoricalSession, CompReviewSession, QuizSession, UnitSession, ValuationSession,
    ValuationSummary,
};

use super::{build_trainer, load_config, resolve_trainee};

/// Line-oriented answer reader.
struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` when the trainee quits or input ends.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt} ");
        std::io::stdout().flush()?;
        let Some(line) = self.lines.next_line().await? else {
            println!();
            return Ok(None);
        };
        let line = line.trim().to_string();
        if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Re-asks until `parse` accepts the line.
    async fn ask_until<T>(
        &mut self,
        prompt: &str,
        hint: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>> {
        loop {
            let Some(line) = self.ask(prompt).await? else {
                return Ok(None);
            };
            match parse(&line) {
                Some(value) => return Ok(Some(value)),
                None => println!("  {hint}"),
            }
        }
    }

    async fn ask_dollars(&mut self, prompt: &str) -> Result<Option<f64>> {
        self.ask_until(prompt, "Enter a positive dollar amount, e.g. 185,000", |line| {
            parse_currency(line).ok().filter(|v| *v > 0.0)
        })
        .await
    }
}

pub async fn execute(
    config_path: Option<PathBuf>,
    trainee: Option<String>,
    curriculum: String,
    unit: Option<usize>,
    region: String,
    seed: Option<u64>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let trainee = resolve_trainee(&config, trainee)?;
    let region: RegionFilter = region.parse().map_err(anyhow::Error::msg)?;
    let trainer = build_trainer(&config)?;

    let id = CurriculumId::new(curriculum);
    let definition = trainer.catalog().get(&id)?;
    let index = match unit {
        Some(0) => anyhow::bail!("units are numbered from 1"),
        Some(n) => n - 1,
        None => {
            let progress = trainer.load_progress(&trainee).await;
            match next_unit(definition, &progress) {
                Some(index) => index,
                None if is_certified(definition, &progress) => anyhow::bail!(
                    "{id} is already certified; run `arvtrain reset --curriculum {id}` to start over"
                ),
                None => anyhow::bail!(
                    "{id} is locked until {} is certified",
                    definition
                        .requires
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "its prerequisite".into())
                ),
            }
        }
    };
    let unit_name = definition.unit(index)?.name.clone();

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut started = trainer
        .begin_unit(&trainee, &id, index, &region, &mut rng)
        .await?;

    println!(
        "{} - unit {}: {unit_name} ({}, {region})",
        definition.name,
        index + 1,
        started.session.label()
    );
    println!("Type q to stop.");

    let mut input = Prompter::new();
    match &mut started.session {
        UnitSession::Valuation(s) => run_valuation(s, &mut input).await?,
        UnitSession::Quiz(s) => run_quiz(s, &mut input).await?,
        UnitSession::Categorical(s) => run_categorical(s, &mut input).await?,
        UnitSession::CompReview(s) => run_comp_review(s, &mut input).await?,
    }

    let outcome = match trainer.complete_unit(&trainee, &id, index, &started).await {
        Err(AssessmentError::AggregationOnEmptySet) => {
            println!("\nNo answers given; nothing recorded.");
            return Ok(());
        }
        other => other?,
    };

    if let UnitSession::Valuation(s) = &started.session {
        let summary = s.summary()?;
        print_valuation_summary(&summary);
        let mut history = SessionHistory::load_or_default(&config.history_path);
        history.push(SessionRecord::from_summary(&summary, Utc::now()));
        if let Err(e) = history.save_json(&config.history_path) {
            tracing::warn!("failed to save session history: {e:#}");
        }
    }
    print_outcome(&outcome, &unit_name);
    Ok(())
}

fn describe(property: &Property) {
    println!("\n  {}", property.address());
    let mut facts = Vec::new();
    if let Some(beds) = property.beds {
        facts.push(format!("{beds} bd"));
    }
    if let Some(baths) = property.baths {
        facts.push(format!("{baths} ba"));
    }
    if let Some(area) = property.living_area {
        facts.push(format!("{area:.0} sqft"));
    }
    if let Some(year) = property.year_built {
        facts.push(format!("built {year}"));
    }
    if let Some(kind) = &property.house_type {
        facts.push(kind.clone());
    }
    if !facts.is_empty() {
        println!("  {}", facts.join(" | "));
    }
    if let Some(price) = property.sale_price {
        println!("  List price: {}", format_dollars(price));
    }
}

fn dollars_or_unknown(value: Option<f64>) -> String {
    value.map(format_dollars).unwrap_or_else(|| "unknown".into())
}

async fn run_valuation(session: &mut ValuationSession, input: &mut Prompter) -> Result<()> {
    while let Some(property) = session.current().cloned() {
        let tracker = session.tracker();
        println!("\nQuestion {}/{}", tracker.question, tracker.total);
        if let (Some(arv), Some(reno)) = (tracker.avg_arv_deviation, tracker.avg_reno_deviation) {
            println!("  Running average: ARV {arv:.1}% off, renovation {reno:.1}% off");
        }
        describe(&property);

        let Some(arv) = input.ask_dollars("ARV estimate:").await? else {
            break;
        };
        let Some(reno) = input.ask_dollars("Renovation estimate:").await? else {
            break;
        };
        let answer = session.submit(arv, reno)?;
        println!(
            "  ARV: actual {} ({:.1}% off, {})",
            dollars_or_unknown(answer.actual_arv),
            answer.arv.deviation_percent(),
            answer.arv.grade()
        );
        println!(
            "  Renovation: actual {} ({:.1}% off, {})",
            dollars_or_unknown(answer.actual_reno),
            answer.reno.deviation_percent(),
            answer.reno.grade()
        );
        println!("  Overall: {}", answer.overall);
    }
    Ok(())
}

async fn run_quiz(session: &mut QuizSession, input: &mut Prompter) -> Result<()> {
    while let Some(question) = session.current().cloned() {
        println!("\nQuestion {}", session.answers().len() + 1);
        describe(&question.property);
        println!("  What is the ARV?");
        for candidate in &question.choices.candidates {
            println!("    {}) {}", candidate.label, format_dollars(candidate.value as f64));
        }

        let Some(choice) = input
            .ask_until("Answer:", "Pick one of the letters shown", |line| {
                line.parse::<Choice>()
                    .ok()
                    .filter(|c| question.choices.value_of(*c).is_some())
            })
            .await?
        else {
            break;
        };
        let answer = session.answer(choice)?;
        if answer.correct {
            println!("  Correct!");
        } else {
            println!(
                "  Wrong: the answer was {}) {}",
                answer.correct_label,
                format_dollars(answer.correct_value as f64)
            );
        }
    }
    Ok(())
}

async fn run_categorical(session: &mut CategoricalSession, input: &mut Prompter) -> Result<()> {
    let options: Vec<(Grade, String)> = session
        .options()
        .into_iter()
        .map(|(label, name)| (label, name.to_string()))
        .collect();
    let name_of = |label: Grade| {
        options
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, n)| n.as_str())
            .unwrap_or("")
    };

    let mut number = 0;
    while let Some(property) = session.current().cloned() {
        number += 1;
        println!("\nQuestion {number}");
        describe(&property);
        println!("  What scope of renovation does it need?");
        for (label, name) in &options {
            println!("    {label}) {name}");
        }

        let Some(guess) = input
            .ask_until("Answer:", "Pick one of the letters shown", |line| {
                line.parse::<Grade>()
                    .ok()
                    .filter(|g| options.iter().any(|(l, _)| l == g))
            })
            .await?
        else {
            break;
        };
        let answer = session.answer(guess)?;
        println!(
            "  Actual scope: {}) {} ({})",
            answer.truth,
            name_of(answer.truth),
            answer.score.grade()
        );
    }
    Ok(())
}

fn parse_issues(line: &str, universe: &[CompIssue]) -> Option<BTreeSet<CompIssue>> {
    line.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(n) => n.checked_sub(1).and_then(|i| universe.get(i).copied()),
            Err(_) => token.parse::<CompIssue>().ok().filter(|i| universe.contains(i)),
        })
        .collect()
}

async fn run_comp_review(session: &mut CompReviewSession, input: &mut Prompter) -> Result<()> {
    let universe = session.universe().to_vec();
    println!("\nIssues:");
    for (i, issue) in universe.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, issue.describe(), issue);
    }

    let mut scenario_name = String::new();
    while let Some((scenario, comp)) = session
        .current()
        .map(|(s, c)| (s.clone(), c.clone()))
    {
        if scenario.name != scenario_name {
            scenario_name = scenario.name.clone();
            println!("\nScenario: {}", scenario.name);
            if !scenario.subject.is_empty() {
                println!("  Subject: {}", scenario.subject);
            }
        }
        println!("\n  Comparable: {}", comp.address);

        let Some(tags) = input
            .ask_until(
                "Issues (numbers, comma separated; blank if it is a good comp):",
                "Use the issue numbers listed above",
                |line| parse_issues(line, &universe),
            )
            .await?
        else {
            break;
        };
        let good = tags.is_empty();
        let score = session.submit(&tags, good)?;
        if score.is_perfect() {
            println!("  Spot on ({}/{})", score.points, score.total);
        } else {
            let actual: Vec<&str> = comp.issues.iter().map(|i| i.describe()).collect();
            let verdict = if actual.is_empty() {
                "a good comp".to_string()
            } else {
                actual.join("; ")
            };
            println!("  {}/{} points. Actually: {verdict}", score.points, score.total);
        }
    }
    Ok(())
}

fn print_valuation_summary(summary: &ValuationSummary) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Property", "ARV off", "Reno off", "Grade"]);
    for (i, answer) in summary.answers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&answer.address),
            Cell::new(format!("{:.1}%", answer.arv.deviation_percent())),
            Cell::new(format!("{:.1}%", answer.reno.deviation_percent())),
            Cell::new(answer.overall),
        ]);
    }
    println!("\n{table}");
    println!(
        "Average: ARV {:.1}% off ({}), renovation {:.1}% off ({}), overall {}",
        summary.avg_arv_deviation,
        summary.arv_grade,
        summary.avg_reno_deviation,
        summary.reno_grade,
        summary.overall_grade
    );
    let distribution: Vec<String> = summary
        .distribution
        .iter()
        .map(|(grade, count)| format!("{grade}:{count}"))
        .collect();
    println!("Grades: {}", distribution.join(" "));
}

fn print_outcome(outcome: &UnitOutcome, unit_name: &str) {
    let detail = match &outcome.result {
        UnitResult::Quiz { correct, total } => format!("{correct}/{total} correct"),
        UnitResult::Categorical { avg_deviation, .. } => {
            format!("average {avg_deviation:.1}% off")
        }
        UnitResult::CompReview { scenario_percents } => scenario_percents
            .iter()
            .map(|p| format!("{p:.0}%"))
            .collect::<Vec<_>>()
            .join(", "),
        UnitResult::Valuation { .. } => format!("grade {}", outcome.summary.headline.grade),
    };
    if outcome.passed {
        println!("\nPASSED {unit_name}: {detail}");
    } else {
        println!("\nNot passed {unit_name}: {detail}. Try again.");
    }
    if outcome.newly_certified {
        println!("Curriculum complete. You are certified!");
    }
}
