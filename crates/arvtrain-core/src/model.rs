//! Ground-truth data model.
//!
//! Properties are supplied by an external data source and never mutated. The
//! JSON field names follow the marketplace export (`camelCase`).

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result};
use crate::grade::Grade;

/// An off-market property with its true valuation figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Marketplace identifier.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_address: Option<String>,
    /// Two-letter US state code.
    #[serde(default)]
    pub us_state: Option<String>,
    #[serde(default)]
    pub beds: Option<f64>,
    #[serde(default)]
    pub baths: Option<f64>,
    #[serde(default)]
    pub living_area: Option<f64>,
    #[serde(default)]
    pub year_built: Option<u32>,
    #[serde(default)]
    pub house_type: Option<String>,
    #[serde(default)]
    pub lot_size: Option<String>,
    /// List price.
    #[serde(default)]
    pub sale_price: Option<f64>,
    /// True after-repair value.
    #[serde(default)]
    pub estimated_arv: Option<f64>,
    /// True renovation cost.
    #[serde(default)]
    pub estimated_renovation: Option<f64>,
    #[serde(default)]
    pub estimated_monthly_rent: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Property {
    pub fn address(&self) -> &str {
        self.display_address
            .as_deref()
            .unwrap_or("Address unavailable")
    }

    /// True when both the ARV and the renovation figure are positive.
    pub fn is_gradable(&self) -> bool {
        let positive = |v: Option<f64>| v.is_some_and(|v| v.is_finite() && v > 0.0);
        positive(self.estimated_arv) && positive(self.estimated_renovation)
    }

    pub fn arv_truth(&self) -> GroundTruth {
        GroundTruth {
            value: self.estimated_arv,
            label: None,
        }
    }

    pub fn renovation_truth(&self) -> GroundTruth {
        GroundTruth {
            value: self.estimated_renovation,
            label: None,
        }
    }
}

/// The correct answer for one item: a continuous value, a precomputed label, or both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub value: Option<f64>,
    pub label: Option<Grade>,
}

impl GroundTruth {
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            label: None,
        }
    }

    pub fn label(label: Grade) -> Self {
        Self {
            value: None,
            label: Some(label),
        }
    }
}

/// Which properties a session may draw from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionFilter {
    #[default]
    All,
    State(String),
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::All => write!(f, "All States"),
            RegionFilter::State(code) => write!(f, "{code}"),
        }
    }
}

impl FromStr for RegionFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("all states")
        {
            return Ok(RegionFilter::All);
        }
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(RegionFilter::State(trimmed.to_ascii_uppercase()));
        }
        Err(format!("invalid region: {trimmed} (expected a state code such as TN)"))
    }
}

impl RegionFilter {
    pub fn matches(&self, property: &Property) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::State(code) => property
                .us_state
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(code)),
        }
    }
}

/// The loaded ground-truth collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    properties: Vec<Property>,
}

impl Dataset {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Properties in the given region, gradable or not.
    pub fn filter_region(&self, region: &RegionFilter) -> Dataset {
        Dataset::new(
            self.properties
                .iter()
                .filter(|p| region.matches(p))
                .cloned()
                .collect(),
        )
    }

    /// Only properties with a positive ARV and renovation figure.
    pub fn gradable(&self) -> Dataset {
        Dataset::new(
            self.properties
                .iter()
                .filter(|p| p.is_gradable())
                .cloned()
                .collect(),
        )
    }

    /// Gradable properties in the given region.
    pub fn eligible(&self, region: &RegionFilter) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| region.matches(p) && p.is_gradable())
            .collect()
    }

    /// Draw `count` distinct gradable properties uniformly at random.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        count: usize,
        region: &RegionFilter,
        rng: &mut R,
    ) -> Result<Vec<Property>> {
        if count == 0 {
            return Err(AssessmentError::InvalidInput(
                "question count must be at least 1".into(),
            ));
        }
        let mut eligible = self.eligible(region);
        if eligible.len() < count {
            return Err(AssessmentError::InsufficientData {
                required: count,
                available: eligible.len(),
            });
        }
        eligible.shuffle(rng);
        Ok(eligible.into_iter().take(count).cloned().collect())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parses_marketplace_json() {
        let json = r#"[{
            "id": "abc",
            "displayAddress": "12 Oak Ave, Memphis, TN",
            "usState": "TN",
            "beds": 3,
            "baths": 1.5,
            "livingArea": 1200,
            "estimatedArv": 185000,
            "estimatedRenovation": 42000,
            "salePrice": 95000
        }]"#;
        let data: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(data.len(), 1);
        let p = &data.properties()[0];
        assert_eq!(p.address(), "12 Oak Ave, Memphis, TN");
        assert_eq!(p.estimated_arv, Some(185_000.0));
        assert!(p.is_gradable());
    }

    #[test]
    fn ungradable_properties_are_excluded() {
        let mut missing = property("x", "TN", 100_000.0, 10_000.0);
        missing.estimated_renovation = None;
        let mut zero = property("y", "TN", 0.0, 10_000.0);
        zero.estimated_arv = Some(0.0);
        let data = Dataset::new(vec![missing, zero, property("z", "TN", 1.0, 1.0)]);
        assert_eq!(data.eligible(&RegionFilter::All).len(), 1);
    }

    #[test]
    fn region_filter() {
        let data = dataset(8);
        let tn = RegionFilter::State("TN".into());
        assert_eq!(data.eligible(&tn).len(), 2);
        assert_eq!(data.filter_region(&tn).gradable().len(), 2);
        assert_eq!("tn".parse::<RegionFilter>().unwrap(), tn);
        assert_eq!("All States".parse::<RegionFilter>().unwrap(), RegionFilter::All);
        assert!("Tennessee".parse::<RegionFilter>().is_err());
    }

    #[test]
    fn sample_is_distinct_and_sized() {
        let data = dataset(20);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let picked = data.sample(10, &RegionFilter::All, &mut rng).unwrap();
        assert_eq!(picked.len(), 10);
        let ids: std::collections::HashSet<_> = picked.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn insufficient_data_is_reported() {
        let data = dataset(8);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = data
            .sample(5, &RegionFilter::State("OH".into()), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            AssessmentError::InsufficientData {
                required: 5,
                available: 2
            }
        );
    }
}
