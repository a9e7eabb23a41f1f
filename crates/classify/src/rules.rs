use serde::{Deserialize, Serialize};
use thiserror::Error;

use lockbox_core::LineItem;

/// Case-insensitive description predicate.
///
/// All matching happens against the uppercased, whitespace-normalized
/// description. Amount sign and magnitude never participate: refunds and
/// reversals classify exactly like their positive counterparts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Substring anywhere in the description.
    Contains(String),
    /// Every listed substring must appear (order-independent).
    AllOf(Vec<String>),
    /// Exact description equality.
    Exact(String),
    /// Description ends with `suffix` and contains none of `unless`.
    /// Catches bare "DEPOSIT" lines without swallowing compound
    /// descriptions like "METLIFE ... DEPOSIT".
    EndsWithUnless { suffix: String, unless: Vec<String> },
}

impl Pattern {
    fn matches(&self, upper_desc: &str) -> bool {
        match self {
            Pattern::Contains(pat) => upper_desc.contains(&pat.to_uppercase()),
            Pattern::AllOf(pats) => pats
                .iter()
                .all(|pat| upper_desc.contains(&pat.to_uppercase())),
            Pattern::Exact(pat) => upper_desc == pat.to_uppercase(),
            Pattern::EndsWithUnless { suffix, unless } => {
                upper_desc.ends_with(&suffix.to_uppercase())
                    && !unless
                        .iter()
                        .any(|pat| upper_desc.contains(&pat.to_uppercase()))
            }
        }
    }
}

/// A rule that rejects a candidate outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub name: String,
    pub pattern: Pattern,
}

/// A rule that buckets an accepted candidate into a summary category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Rejected by the named exclusion rule.
    Excluded { rule: String },
    /// Accepted, with the summary category it buckets into.
    Accepted { category: String },
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted { .. })
    }
}

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct RuleSet {
    #[serde(default)]
    exclude: Vec<ExclusionRule>,
    #[serde(default)]
    categories: Vec<CategoryRule>,
}

/// The deposit classifier: an ordered exclusion table evaluated first, then
/// an ordered category table for accepted candidates.
///
/// Pure and per-candidate — no cross-candidate state, so classification is
/// order-independent and safe to run inside concurrent extraction tasks.
pub struct Classifier {
    exclusions: Vec<ExclusionRule>,
    categories: Vec<CategoryRule>,
}

impl Classifier {
    pub fn new(exclusions: Vec<ExclusionRule>, categories: Vec<CategoryRule>) -> Self {
        Self { exclusions, categories }
    }

    /// Load a rule table from TOML (same shape the built-in defaults use).
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleSetError> {
        let set: RuleSet = toml::from_str(toml_content)?;
        Ok(Self::new(set.exclude, set.categories))
    }

    /// The rule table the production statements need: point-of-sale
    /// settlements, unlabeled deposit lines, and the Cherry payment
    /// processor are noise; insurer payments bucket by carrier.
    pub fn with_default_rules() -> Self {
        let exclusions = vec![
            ExclusionRule {
                name: "shift4 settlement".into(),
                pattern: Pattern::AllOf(vec!["SHIFT4".into(), "PYMT".into()]),
            },
            ExclusionRule {
                name: "unlabeled deposit".into(),
                pattern: Pattern::EndsWithUnless {
                    suffix: "DEPOSIT".into(),
                    unless: vec!["METLIFE".into(), "SYNCHRONY".into(), "FEP".into()],
                },
            },
            ExclusionRule {
                name: "cherry settlement".into(),
                pattern: Pattern::AllOf(vec!["CHERRY".into(), "PAYMENT".into()]),
            },
        ];
        let categories = vec![
            CategoryRule {
                category: "metlife".into(),
                pattern: Pattern::Contains("METLIFE DENTAL".into()),
            },
            CategoryRule {
                category: "fep_dental".into(),
                pattern: Pattern::Contains("FEP DENTAL".into()),
            },
            CategoryRule {
                category: "synchrony".into(),
                pattern: Pattern::Contains("SYNCHRONY BANK".into()),
            },
        ];
        Self::new(exclusions, categories)
    }

    /// Classify one candidate. First matching exclusion wins; otherwise the
    /// first matching category rule names the bucket, defaulting to "other".
    pub fn classify(&self, item: &LineItem) -> Classification {
        let upper = item.description.to_uppercase();

        if let Some(rule) = self.exclusions.iter().find(|r| r.pattern.matches(&upper)) {
            return Classification::Excluded { rule: rule.name.clone() };
        }

        let category = self
            .categories
            .iter()
            .find(|r| r.pattern.matches(&upper))
            .map(|r| r.category.clone())
            .unwrap_or_else(|| "other".to_string());

        Classification::Accepted { category }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn item(desc: &str, cents: i64) -> LineItem {
        LineItem::new(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            desc,
            Decimal::new(cents, 2),
        )
    }

    #[test]
    fn shift4_settlement_excluded() {
        let c = Classifier::with_default_rules();
        assert_eq!(
            c.classify(&item("SHIFT4 PYMT 123", 10000)),
            Classification::Excluded { rule: "shift4 settlement".into() }
        );
        assert_eq!(
            c.classify(&item("shift4/pymt deposit run", 10000)),
            Classification::Excluded { rule: "shift4 settlement".into() }
        );
    }

    #[test]
    fn bare_deposit_excluded() {
        let c = Classifier::with_default_rules();
        assert!(!c.classify(&item("DEPOSIT", 5000)).is_accepted());
        assert!(!c.classify(&item("BRANCH DEPOSIT", 5000)).is_accepted());
    }

    #[test]
    fn compound_deposit_descriptions_accepted() {
        let c = Classifier::with_default_rules();
        let result = c.classify(&item("METLIFE DENTAL/HCCLAIMPMT DEPOSIT", 12345));
        assert_eq!(result, Classification::Accepted { category: "metlife".into() });
    }

    #[test]
    fn cherry_settlement_excluded() {
        let c = Classifier::with_default_rules();
        assert!(!c.classify(&item("CHERRY/PAYMENT 99887", 4200)).is_accepted());
    }

    #[test]
    fn exclusion_ignores_amount_sign() {
        let c = Classifier::with_default_rules();
        assert!(!c.classify(&item("SHIFT4 PYMT 123", -10000)).is_accepted());
        assert!(!c.classify(&item("SHIFT4 PYMT 123", 0)).is_accepted());
    }

    #[test]
    fn metlife_bucketed() {
        let c = Classifier::with_default_rules();
        assert_eq!(
            c.classify(&item("METLIFE DENTAL CLAIM", 9900)),
            Classification::Accepted { category: "metlife".into() }
        );
    }

    #[test]
    fn fep_and_synchrony_bucketed() {
        let c = Classifier::with_default_rules();
        assert_eq!(
            c.classify(&item("FEP DENTAL 36C/HCCLAIMPMT", 100)),
            Classification::Accepted { category: "fep_dental".into() }
        );
        assert_eq!(
            c.classify(&item("SYNCHRONY BANK/MTOT DEP", 100)),
            Classification::Accepted { category: "synchrony".into() }
        );
    }

    #[test]
    fn unmatched_accepted_as_other() {
        let c = Classifier::with_default_rules();
        assert_eq!(
            c.classify(&item("AETNA DENTAL CLAIM", 100)),
            Classification::Accepted { category: "other".into() }
        );
    }

    #[test]
    fn classify_is_idempotent() {
        let c = Classifier::with_default_rules();
        let it = item("FEP DENTAL", 100);
        let first = c.classify(&it);
        for _ in 0..5 {
            assert_eq!(c.classify(&it), first);
        }
    }

    #[test]
    fn exact_pattern_matches_whole_description_only() {
        let c = Classifier::new(
            vec![ExclusionRule {
                name: "literal".into(),
                pattern: Pattern::Exact("DEPOSIT".into()),
            }],
            vec![],
        );
        assert!(!c.classify(&item("deposit", 100)).is_accepted());
        assert!(c.classify(&item("NIGHT DEPOSIT BOX", 100)).is_accepted());
    }

    #[test]
    fn from_toml_round_trip() {
        let toml_src = r#"
            [[exclude]]
            name = "shift4 settlement"
            [exclude.pattern]
            all_of = ["SHIFT4", "PYMT"]

            [[categories]]
            category = "metlife"
            [categories.pattern]
            contains = "METLIFE DENTAL"
        "#;
        let c = Classifier::from_toml(toml_src).unwrap();
        assert!(!c.classify(&item("SHIFT4 PYMT", 100)).is_accepted());
        assert_eq!(
            c.classify(&item("METLIFE DENTAL X", 100)),
            Classification::Accepted { category: "metlife".into() }
        );
    }

    #[test]
    fn from_toml_rejects_garbage() {
        assert!(Classifier::from_toml("not [ valid").is_err());
    }
}
