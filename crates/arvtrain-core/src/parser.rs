//! TOML curriculum catalog parser.
//!
//! Loads curricula from TOML files and directories, and validates them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::curriculum::{Catalog, Curriculum, CurriculumId, UnitKind};

/// Source of the built-in catalog.
pub const DEFAULT_CATALOG: &str = include_str!("../curricula/default.toml");

/// Top-level layout of a curriculum file.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    curricula: Vec<Curriculum>,
}

/// Parse a single TOML file into a `Catalog`.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read curriculum file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog` (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(Catalog::new(parsed.curricula))
}

/// Recursively load every `.toml` curriculum file in a directory into one catalog.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_catalog_directory(dir: &Path) -> Result<Catalog> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    let mut curricula = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            curricula.extend(load_catalog_directory(&path)?.curricula);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_catalog(&path) {
                Ok(catalog) => curricula.extend(catalog.curricula),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(Catalog::new(curricula))
}

/// Load a catalog from a file or a directory.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if path.is_dir() {
        load_catalog_directory(path)
    } else {
        parse_catalog(path)
    }
}

/// The catalog shipped with the crate.
pub fn default_catalog() -> Result<Catalog> {
    parse_catalog_str(DEFAULT_CATALOG, Path::new("curricula/default.toml"))
}

/// A warning from catalog validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The curriculum ID (if applicable).
    pub curriculum: Option<String>,
    /// Zero-based unit index (if applicable).
    pub unit: Option<usize>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn curriculum(id: &CurriculumId, message: impl Into<String>) -> Self {
        Self {
            curriculum: Some(id.to_string()),
            unit: None,
            message: message.into(),
        }
    }

    fn unit(id: &CurriculumId, unit: usize, message: impl Into<String>) -> Self {
        Self {
            curriculum: Some(id.to_string()),
            unit: Some(unit),
            message: message.into(),
        }
    }
}

fn bad_limit(value: f64) -> bool {
    !value.is_finite() || value < 0.0
}

fn check_unit(kind: &UnitKind) -> Vec<String> {
    let mut problems = Vec::new();
    match kind {
        UnitKind::Valuation {
            questions,
            max_avg_arv_deviation,
            max_avg_reno_deviation,
        } => {
            if *questions == 0 {
                problems.push("unit has zero questions".to_string());
            }
            if bad_limit(*max_avg_arv_deviation) || bad_limit(*max_avg_reno_deviation) {
                problems.push("deviation limits must be finite and non-negative".to_string());
            }
        }
        UnitKind::Quiz {
            questions,
            pass_fraction,
        } => {
            if *questions == 0 {
                problems.push("unit has zero questions".to_string());
            }
            if !(*pass_fraction > 0.0 && *pass_fraction <= 1.0) {
                problems.push(format!("pass_fraction {pass_fraction} is outside (0, 1]"));
            }
        }
        UnitKind::Categorical {
            questions,
            max_avg_deviation,
        } => {
            if *questions == 0 {
                problems.push("unit has zero questions".to_string());
            }
            if bad_limit(*max_avg_deviation) {
                problems.push("deviation limit must be finite and non-negative".to_string());
            }
        }
        UnitKind::CompReview {
            pass_percent,
            required_passing,
            scenarios,
        } => {
            if scenarios.is_empty() {
                problems.push("unit has no scenarios".to_string());
            }
            if let Some(s) = scenarios.iter().find(|s| s.comps.is_empty()) {
                problems.push(format!("scenario {:?} has no comparables", s.name));
            }
            if !(0.0..=100.0).contains(pass_percent) {
                problems.push(format!("pass_percent {pass_percent} is outside [0, 100]"));
            }
            if *required_passing > scenarios.len() {
                problems.push(format!(
                    "required_passing {required_passing} exceeds the {} scenarios",
                    scenarios.len()
                ));
            }
        }
    }
    problems
}

/// Validate a catalog for common issues.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Check for duplicate curriculum IDs
    let mut seen_ids = HashSet::new();
    for c in catalog.iter() {
        if !seen_ids.insert(&c.id) {
            warnings.push(ValidationWarning::curriculum(
                &c.id,
                format!("duplicate curriculum ID: {}", c.id),
            ));
        }
    }

    // Prerequisites must exist and must not loop back
    let requires: HashMap<&CurriculumId, &CurriculumId> = catalog
        .iter()
        .filter_map(|c| c.requires.as_ref().map(|r| (&c.id, r)))
        .collect();
    for c in catalog.iter() {
        let Some(req) = &c.requires else { continue };
        if req == &c.id {
            warnings.push(ValidationWarning::curriculum(&c.id, "curriculum requires itself"));
            continue;
        }
        if !seen_ids.contains(req) {
            warnings.push(ValidationWarning::curriculum(
                &c.id,
                format!("requires unknown curriculum: {req}"),
            ));
            continue;
        }
        let mut visited = HashSet::from([&c.id]);
        let mut cursor = req;
        while let Some(next) = requires.get(cursor) {
            if !visited.insert(cursor) {
                break;
            }
            if *next == &c.id {
                warnings.push(ValidationWarning::curriculum(
                    &c.id,
                    format!("prerequisite cycle through {req}"),
                ));
                break;
            }
            cursor = *next;
        }
    }

    for c in catalog.iter() {
        if c.units.is_empty() {
            warnings.push(ValidationWarning::curriculum(&c.id, "curriculum has no units"));
        }
        for (i, unit) in c.units.iter().enumerate() {
            for problem in check_unit(&unit.kind) {
                warnings.push(ValidationWarning::unit(&c.id, i, problem));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comps::CompIssue;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[curricula]]
id = "valuation"
name = "Valuation"
description = "ARV practice"

[[curricula.units]]
name = "Warm up"
kind = "valuation"
questions = 5
max_avg_arv_deviation = 20
max_avg_reno_deviation = 35.0

[[curricula.units]]
name = "Pick one"
kind = "quiz"
questions = 10
pass_fraction = 0.8

[[curricula]]
id = "sales"
name = "Sales"
requires = "valuation"

[[curricula.units]]
name = "Comps"
kind = "comp_review"
required_passing = 1

[[curricula.units.scenarios]]
name = "Ranch"
comps = [
  { address = "1 Elm", issues = ["sale_too_old"] },
  { address = "2 Elm" },
]
"#;

    #[test]
    fn parse_valid_toml() {
        let catalog = parse_catalog_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(catalog.curricula.len(), 2);
        let valuation = &catalog.curricula[0];
        assert_eq!(valuation.units.len(), 2);
        assert_eq!(
            valuation.units[0].kind,
            UnitKind::Valuation {
                questions: 5,
                max_avg_arv_deviation: 20.0,
                max_avg_reno_deviation: 35.0,
            }
        );
        let sales = &catalog.curricula[1];
        assert_eq!(sales.requires, Some("valuation".into()));
        let UnitKind::CompReview {
            pass_percent,
            scenarios,
            ..
        } = &sales.units[0].kind
        else {
            panic!("expected a comp review unit");
        };
        assert_eq!(*pass_percent, 80.0);
        assert!(scenarios[0].comps[0].issues.contains(&CompIssue::SaleTooOld));
        assert!(scenarios[0].comps[1].is_good());
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn default_catalog_is_clean() {
        let catalog = default_catalog().unwrap();
        let valuation = catalog.get(&"valuation".into()).unwrap();
        assert_eq!(valuation.units.len(), 10);
        let sales = catalog.get(&"sales".into()).unwrap();
        assert_eq!(sales.units.len(), 3);
        assert_eq!(sales.requires, Some("valuation".into()));
        assert_eq!(validate_catalog(&catalog), vec![]);
    }

    #[test]
    fn unknown_unit_kind_is_rejected() {
        let toml = r#"
[[curricula]]
id = "x"
name = "X"

[[curricula.units]]
name = "Bad"
kind = "essay"
questions = 3
"#;
        assert!(parse_catalog_str(toml, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn validate_flags_structural_problems() {
        let toml = r#"
[[curricula]]
id = "a"
name = "A"
requires = "b"

[[curricula.units]]
name = "Zero"
kind = "quiz"
questions = 0
pass_fraction = 1.5

[[curricula]]
id = "b"
name = "B"
requires = "a"

[[curricula.units]]
name = "Comps"
kind = "comp_review"
required_passing = 3
scenarios = []

[[curricula]]
id = "a"
name = "Duplicate"
requires = "missing"
units = []
"#;
        let catalog = parse_catalog_str(toml, &PathBuf::from("test.toml")).unwrap();
        let messages: Vec<String> = validate_catalog(&catalog)
            .into_iter()
            .map(|w| w.message)
            .collect();
        let has = |needle: &str| messages.iter().any(|m| m.contains(needle));
        assert!(has("duplicate curriculum ID"));
        assert!(has("prerequisite cycle"));
        assert!(has("unknown curriculum: missing"));
        assert!(has("zero questions"));
        assert!(has("pass_fraction"));
        assert!(has("required_passing 3 exceeds"));
        assert!(has("no scenarios"));
        assert!(has("no units"));
    }

    #[test]
    fn self_requirement() {
        let toml = r#"
[[curricula]]
id = "a"
name = "A"
requires = "a"
units = []
"#;
        let catalog = parse_catalog_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert!(validate_catalog(&catalog)
            .iter()
            .any(|w| w.message.contains("requires itself")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_catalog_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "nope = [").unwrap();
        let nested = dir.path().join("more");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("c.toml"),
            "[[curricula]]\nid = \"c\"\nname = \"C\"\nunits = []\n",
        )
        .unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["valuation", "sales", "c"]);
    }
}
