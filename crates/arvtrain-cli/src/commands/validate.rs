//! The `arvtrain validate` command.

use std::path::PathBuf;

use anyhow::Result;

use arvtrain_core::parser;

pub fn execute(curricula: Option<PathBuf>) -> Result<()> {
    let catalog = match &curricula {
        Some(path) => parser::load_catalog(path)?,
        None => parser::default_catalog()?,
    };

    for c in catalog.iter() {
        let requires = c
            .requires
            .as_ref()
            .map(|r| format!(", requires {r}"))
            .unwrap_or_default();
        println!("Curriculum: {} ({} units{requires})", c.name, c.units.len());
    }

    let warnings = parser::validate_catalog(&catalog);
    for w in &warnings {
        let prefix = match (&w.curriculum, w.unit) {
            (Some(id), Some(unit)) => format!("  [{id} #{}]", unit + 1),
            (Some(id), None) => format!("  [{id}]"),
            _ => "  ".to_string(),
        };
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All curricula valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
