use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spending categories. Declaration order is the classification scan order
/// and the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Housing,
    Car,
    Food,
    Media,
    Personal,
    Travel,
    Gift,
    Misc,
    /// Credit card payments and deposits.
    #[serde(alias = "Credit Card")]
    Credit,
    /// Income rows. Only assignable through persisted rules, never re-sorted.
    Paycheck,
    #[serde(rename = "UNK")]
    Unknown,
}

impl Category {
    /// The categories a user may sort expenses into.
    pub const SORTABLE: [Category; 9] = [
        Category::Housing,
        Category::Car,
        Category::Food,
        Category::Media,
        Category::Personal,
        Category::Travel,
        Category::Gift,
        Category::Misc,
        Category::Credit,
    ];

    /// Every category that can carry triggers, in scan order.
    pub const RULED: [Category; 10] = [
        Category::Housing,
        Category::Car,
        Category::Food,
        Category::Media,
        Category::Personal,
        Category::Travel,
        Category::Gift,
        Category::Misc,
        Category::Credit,
        Category::Paycheck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Housing => "Housing",
            Self::Car => "Car",
            Self::Food => "Food",
            Self::Media => "Media",
            Self::Personal => "Personal",
            Self::Travel => "Travel",
            Self::Gift => "Gift",
            Self::Misc => "Misc",
            Self::Credit => "Credit",
            Self::Paycheck => "Paycheck",
            Self::Unknown => "UNK",
        }
    }

    /// True when the row is out of the uncategorized pool: any sortable
    /// category or the paycheck pass-through.
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Case-insensitive lookup restricted to the sortable categories.
    pub fn parse_sortable(raw: &str) -> Option<Category> {
        let raw = raw.trim();
        Self::SORTABLE
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(raw))
            .copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("credit card") {
            return Ok(Self::Credit);
        }
        Self::RULED
            .iter()
            .chain(std::iter::once(&Self::Unknown))
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown category: '{s}'"))
    }
}

/// A canonical transaction. Positive amounts are expenses, negative amounts
/// are credits and payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub category: Category,
    /// Sign inference negated this row's file.
    pub source_flipped: bool,
}

impl Transaction {
    /// The amount with the sign it had in its source file.
    pub fn source_amount(&self) -> Decimal {
        if self.source_flipped {
            -self.amount
        } else {
            self.amount
        }
    }
}

/// Text projection of one source row before numeric/date cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source file, for error messages.
    pub line: usize,
    pub date: String,
    pub description: String,
    pub amount: String,
}

impl RawRow {
    pub fn has_nulls(&self) -> bool {
        self.date.trim().is_empty()
            || self.description.trim().is_empty()
            || self.amount.trim().is_empty()
    }
}

/// A canonicalized row still carrying its per-file occurrence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedTransaction {
    pub txn: Transaction,
    pub occurrence_index: usize,
}

impl TaggedTransaction {
    pub fn dedup_key(&self) -> (NaiveDate, String, Decimal, usize) {
        (
            self.txn.date,
            self.txn.description.clone(),
            self.txn.amount,
            self.occurrence_index,
        )
    }
}
