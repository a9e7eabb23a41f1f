use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::office::Office;

/// One physical line parsed from a statement, before classification.
///
/// Immutable once constructed; the description is whitespace-normalized at
/// construction so rule matching never has to care about layout artifacts
/// from the text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount; refunds and reversals are legitimate line items.
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(date: NaiveDate, description: &str, amount: Decimal) -> Self {
        Self {
            date,
            description: normalize_whitespace(description),
            amount,
        }
    }
}

/// A line item that passed classification, stamped with its source
/// document's office and the category the classifier assigned.
///
/// Invariant: `office` is never empty — unresolvable documents fall back to
/// `Office::Unknown` rather than dropping the deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub office: Office,
    /// Summary-statistics bucket ("metlife", "fep_dental", "other", ...).
    /// Never affects accept/exclude.
    pub category: String,
}

impl Deposit {
    pub fn from_line_item(item: LineItem, office: Office, category: impl Into<String>) -> Self {
        Self {
            date: item.date,
            description: item.description,
            amount: item.amount,
            office,
            category: category.into(),
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn line_item_normalizes_whitespace() {
        let item = LineItem::new(
            date(2025, 6, 30),
            "  METLIFE   DENTAL/HCCLAIMPMT \t TRN*1*123 ",
            Decimal::new(10000, 2),
        );
        assert_eq!(item.description, "METLIFE DENTAL/HCCLAIMPMT TRN*1*123");
    }

    #[test]
    fn deposit_keeps_item_fields() {
        let item = LineItem::new(date(2025, 6, 30), "FEP DENTAL", Decimal::new(25050, 2));
        let dep = Deposit::from_line_item(item.clone(), Office::Kearny, "fep_dental");
        assert_eq!(dep.date, item.date);
        assert_eq!(dep.amount, item.amount);
        assert_eq!(dep.office, Office::Kearny);
        assert_eq!(dep.category, "fep_dental");
    }

    #[test]
    fn negative_amounts_are_representable() {
        let item = LineItem::new(date(2025, 6, 30), "REFUND", Decimal::new(-500, 2));
        assert!(item.amount.is_sign_negative());
    }
}
