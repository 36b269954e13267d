use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::categorizer::CategoryRuleSet;
use crate::models::{Category, TaggedTransaction, Transaction};

/// The merged, deduplicated, date-sorted canonical table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStore {
    rows: Vec<Transaction>,
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub uncategorized: usize,
    /// Credit card payments dropped because the card's own export carries
    /// the charges.
    pub suppressed: usize,
}

impl TransactionStore {
    /// Concatenate per-file tables, collapse rows whose full key (including
    /// occurrence index) repeats, and sort by date.
    pub fn merge<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Vec<TaggedTransaction>>,
    {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        let mut duplicates = 0usize;
        for table in tables {
            for tagged in table {
                if seen.insert(tagged.dedup_key()) {
                    rows.push(tagged.txn);
                } else {
                    duplicates += 1;
                }
            }
        }
        rows.sort_by_key(|t| t.date);
        debug!(rows = rows.len(), duplicates, "merged transaction store");
        Self { rows }
    }

    /// Build from already-canonical rows. Rows are sorted by date.
    #[cfg(test)]
    pub fn from_rows(mut rows: Vec<Transaction>) -> Self {
        rows.sort_by_key(|t| t.date);
        Self { rows }
    }

    /// Re-classify every row end to end and drop credit card payments: Credit
    /// rows that were negative in their source file, before sign inference.
    pub fn categorize(&mut self, rules: &CategoryRuleSet) -> CategorizeResult {
        let before = self.rows.len();
        for txn in self.rows.iter_mut() {
            let (category, amount) = rules.classify(&txn.description, txn.amount);
            txn.category = category;
            txn.amount = amount;
        }
        self.rows
            .retain(|t| !(t.category == Category::Credit && t.source_amount().is_sign_negative()));
        let suppressed = before - self.rows.len();
        let uncategorized = self.uncategorized_count();
        CategorizeResult {
            categorized: self.rows.len() - uncategorized,
            uncategorized,
            suppressed,
        }
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn uncategorized_count(&self) -> usize {
        self.rows.iter().filter(|t| !t.category.is_assigned()).count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|t| t.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|t| t.date)
    }
}
