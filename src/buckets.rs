use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{Category, Transaction};
use crate::store::TransactionStore;

pub const LABEL_FORMAT: &str = "%b %Y";
pub const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y";

/// A transaction with its date rendered for display and publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub category: Category,
}

/// One calendar month of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    pub start: NaiveDate,
    pub rows: Vec<Transaction>,
}

impl MonthBucket {
    /// "Jan 2024".
    pub fn label(&self) -> String {
        self.start.format(LABEL_FORMAT).to_string()
    }

    pub fn display_rows(&self) -> Vec<DisplayRow> {
        self.rows
            .iter()
            .map(|t| DisplayRow {
                date: t.date.format(DISPLAY_DATE_FORMAT).to_string(),
                description: t.description.clone(),
                amount: t.amount,
                category: t.category,
            })
            .collect()
    }

    /// Sum of amounts for one category in this month.
    pub fn total(&self, category: Category) -> Decimal {
        self.rows
            .iter()
            .filter(|t| t.category == category)
            .map(|t| t.amount)
            .sum()
    }
}

/// Contiguous month buckets with their overall boundaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthBuckets {
    pub buckets: Vec<MonthBucket>,
    /// First day of the first bucket.
    pub first: Option<NaiveDate>,
    /// First day of the month after the last bucket.
    pub end: Option<NaiveDate>,
}

impl MonthBuckets {
    pub fn get_month(&self, year: i32, month: u32) -> Option<&MonthBucket> {
        self.buckets
            .iter()
            .find(|b| b.start.year() == year && b.start.month() == month)
    }

    /// Calendar years touched by the buckets, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.buckets.iter().map(|b| b.start.year()).collect();
        years.dedup();
        years
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Partition the store into every calendar month from its first date's month
/// through its last date's month, including months without rows.
pub fn bucket(store: &TransactionStore) -> MonthBuckets {
    let (Some(first), Some(last)) = (store.first_date(), store.last_date()) else {
        return MonthBuckets::default();
    };
    let first = month_start(first);
    let last = month_start(last);

    let mut buckets = Vec::new();
    let mut rows = store.rows().iter().peekable();
    let mut current = first;
    while current <= last {
        let Some(next) = current.checked_add_months(Months::new(1)) else {
            break;
        };
        let mut month_rows = Vec::new();
        while let Some(txn) = rows.peek() {
            if txn.date >= next {
                break;
            }
            if txn.date >= current {
                month_rows.push((*txn).clone());
            }
            rows.next();
        }
        buckets.push(MonthBucket {
            start: current,
            rows: month_rows,
        });
        current = next;
    }

    MonthBuckets {
        end: buckets
            .last()
            .and_then(|b| b.start.checked_add_months(Months::new(1))),
        first: Some(first),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(y: i32, m: u32, d: u32, description: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            description: description.to_string(),
            amount: Decimal::from(5),
            category: Category::Unknown,
            source_flipped: false,
        }
    }

    #[test]
    fn test_bucket_includes_empty_months() {
        let store =
            TransactionStore::from_rows(vec![txn(2024, 1, 15, "A"), txn(2024, 3, 2, "B")]);
        let months = bucket(&store);
        let labels: Vec<String> = months.buckets.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
        assert!(months.buckets[1].rows.is_empty());
        assert_eq!(months.buckets[0].rows.len(), 1);
        assert_eq!(months.buckets[2].rows[0].description, "B");
    }

    #[test]
    fn test_bucket_boundaries() {
        let store =
            TransactionStore::from_rows(vec![txn(2024, 1, 15, "A"), txn(2024, 3, 2, "B")]);
        let months = bucket(&store);
        assert_eq!(months.first, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(months.end, NaiveDate::from_ymd_opt(2024, 4, 1));
    }

    #[test]
    fn test_bucket_month_edges() {
        let store = TransactionStore::from_rows(vec![
            txn(2024, 1, 31, "last of jan"),
            txn(2024, 2, 1, "first of feb"),
            txn(2024, 2, 29, "leap day"),
        ]);
        let months = bucket(&store);
        assert_eq!(months.len(), 2);
        assert_eq!(months.buckets[0].rows.len(), 1);
        assert_eq!(months.buckets[1].rows.len(), 2);
    }

    #[test]
    fn test_bucket_across_year_boundary() {
        let store =
            TransactionStore::from_rows(vec![txn(2023, 11, 3, "A"), txn(2024, 2, 10, "B")]);
        let months = bucket(&store);
        let labels: Vec<String> = months.buckets.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024"]);
        assert_eq!(months.years(), vec![2023, 2024]);
    }

    #[test]
    fn test_bucket_empty_store() {
        let months = bucket(&TransactionStore::default());
        assert!(months.is_empty());
        assert_eq!(months.first, None);
    }

    #[test]
    fn test_display_rows_render_dates() {
        let store = TransactionStore::from_rows(vec![txn(2024, 1, 5, "Coffee")]);
        let months = bucket(&store);
        let rows = months.get_month(2024, 1).unwrap().display_rows();
        assert_eq!(rows[0].date, "01/05/2024");
    }

    #[test]
    fn test_bucket_is_a_pure_function() {
        let store =
            TransactionStore::from_rows(vec![txn(2024, 1, 15, "A"), txn(2024, 3, 2, "B")]);
        assert_eq!(bucket(&store), bucket(&store));
    }
}
