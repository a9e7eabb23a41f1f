use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::deposit::Deposit;
use crate::office::Office;

/// Aggregate statistics over a consolidated ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_deposits: usize,
    /// Sum of all merged amounts, rounded once to 2 dp (banker's rounding).
    pub total_amount: Decimal,
    /// Deposit counts per category.
    pub breakdown: BTreeMap<String, usize>,
}

/// The merged result of reconciling one multi-document upload batch.
///
/// Deposit order is arrival order across documents — presentation layers may
/// re-sort, but the ledger itself is never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedLedger {
    pub deposits: Vec<Deposit>,
    /// Distinct offices observed, in first-seen order.
    pub offices: Vec<Office>,
    pub summary: Summary,
}

impl ConsolidatedLedger {
    pub fn from_deposits(deposits: Vec<Deposit>) -> Self {
        let total_amount: Decimal = deposits.iter().map(|d| d.amount).sum();

        let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for dep in &deposits {
            *breakdown.entry(dep.category.clone()).or_insert(0) += 1;
        }

        let mut offices: Vec<Office> = Vec::new();
        for dep in &deposits {
            if !offices.contains(&dep.office) {
                offices.push(dep.office.clone());
            }
        }

        let summary = Summary {
            total_deposits: deposits.len(),
            total_amount: total_amount.round_dp(2),
            breakdown,
        };

        Self { deposits, offices, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::LineItem;
    use chrono::NaiveDate;

    fn dep(desc: &str, cents: i64, office: Office, category: &str) -> Deposit {
        let item = LineItem::new(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            desc,
            Decimal::new(cents, 2),
        );
        Deposit::from_line_item(item, office, category)
    }

    #[test]
    fn summary_totals_and_breakdown() {
        let ledger = ConsolidatedLedger::from_deposits(vec![
            dep("METLIFE DENTAL/HCCLAIMPMT", 10000, Office::Kearny, "metlife"),
            dep("FEP DENTAL", 5025, Office::Kearny, "fep_dental"),
            dep("METLIFE DENTAL/HCCLAIMPMT", 2500, Office::Union, "metlife"),
        ]);
        assert_eq!(ledger.summary.total_deposits, 3);
        assert_eq!(ledger.summary.total_amount, Decimal::new(17525, 2));
        assert_eq!(ledger.summary.breakdown["metlife"], 2);
        assert_eq!(ledger.summary.breakdown["fep_dental"], 1);
    }

    #[test]
    fn offices_distinct_in_first_seen_order() {
        let ledger = ConsolidatedLedger::from_deposits(vec![
            dep("A", 100, Office::Kearny, "other"),
            dep("B", 100, Office::JerseyCity, "other"),
            dep("C", 100, Office::Kearny, "other"),
        ]);
        assert_eq!(ledger.offices, vec![Office::Kearny, Office::JerseyCity]);
    }

    #[test]
    fn total_rounds_half_even() {
        // 0.005 + 0.04 = 0.045 → rounds to 0.04 under banker's rounding.
        let ledger = ConsolidatedLedger::from_deposits(vec![
            dep("A", 100, Office::Union, "other"),
        ]);
        assert_eq!(ledger.summary.total_amount, Decimal::new(100, 2));

        let d1 = Deposit {
            amount: Decimal::new(45, 3), // 0.045
            ..dep("B", 0, Office::Union, "other")
        };
        let ledger = ConsolidatedLedger::from_deposits(vec![d1]);
        assert_eq!(ledger.summary.total_amount, Decimal::new(4, 2));
    }

    #[test]
    fn empty_ledger() {
        let ledger = ConsolidatedLedger::from_deposits(vec![]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary.total_deposits, 0);
        assert_eq!(ledger.summary.total_amount, Decimal::ZERO);
    }

    #[test]
    fn serializes_camel_case_summary() {
        let ledger = ConsolidatedLedger::from_deposits(vec![dep(
            "A",
            100,
            Office::Union,
            "other",
        )]);
        let json = serde_json::to_value(&ledger.summary).unwrap();
        assert!(json.get("totalDeposits").is_some());
        assert!(json.get("totalAmount").is_some());
    }
}
