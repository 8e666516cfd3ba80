//! The `arvtrain score` and `arvtrain distractors` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arvtrain_core::distractor::generate_distractors_with;
use arvtrain_core::grade::{format_dollars, parse_currency, score_numeric, weighted_composite};

use super::load_config;

fn dollars(input: &str, what: &str) -> Result<f64> {
    parse_currency(input).with_context(|| format!("invalid {what}"))
}

pub fn execute(
    config_path: Option<PathBuf>,
    estimate: String,
    actual: String,
    reno_estimate: Option<String>,
    reno_actual: Option<String>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let policy = config.grading_policy()?;

    let arv = score_numeric(
        dollars(&estimate, "--estimate")?,
        Some(dollars(&actual, "--actual")?),
        &policy.scale,
    )?;
    println!(
        "ARV: {:.1}% off, grade {}",
        arv.deviation_percent(),
        arv.grade()
    );

    if let (Some(est), Some(act)) = (reno_estimate, reno_actual) {
        let reno = score_numeric(
            dollars(&est, "--reno-estimate")?,
            Some(dollars(&act, "--reno-actual")?),
            &policy.scale,
        )?;
        println!(
            "Renovation: {:.1}% off, grade {}",
            reno.deviation_percent(),
            reno.grade()
        );
        let overall = weighted_composite(
            arv.grade(),
            reno.grade(),
            policy.weights.arv,
            policy.weights.reno,
        );
        println!("Overall: {overall}");
    }
    Ok(())
}

pub fn distractors(config_path: Option<PathBuf>, value: String, seed: Option<u64>) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let policy = config.grading_policy()?;
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let set = generate_distractors_with(dollars(&value, "--value")?, &policy.distractors, &mut rng)?;
    for candidate in &set.candidates {
        let marker = if candidate.label == set.correct_label {
            "  <- correct"
        } else {
            ""
        };
        println!(
            "  {}) {}{marker}",
            candidate.label,
            format_dollars(candidate.value as f64)
        );
    }
    println!("Correct answer: {}", set.correct_label);
    Ok(())
}
