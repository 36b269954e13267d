use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::buckets::{MonthBuckets, DISPLAY_DATE_FORMAT, LABEL_FORMAT};
use crate::importer::{parse_amount, parse_date};
use crate::models::Category;
use crate::store::TransactionStore;

pub const SHEET_HEADER: [&str; 4] = ["Date", "Description", "Amount", "Category"];

#[derive(Error, Debug)]
pub enum PublishError {
    /// Raised by quota-limited remote destinations. The local workbook
    /// never hits a quota.
    #[allow(dead_code)]
    #[error("write quota reached")]
    RateLimited,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub months_created: usize,
    pub months_updated: usize,
    pub summaries_written: usize,
    pub rows_written: usize,
}

/// Destination for the categorized store and its month buckets.
pub trait Publisher {
    fn publish(
        &mut self,
        store: &TransactionStore,
        buckets: &MonthBuckets,
    ) -> Result<PublishSummary, PublishError>;
}

/// Publish, waiting `policy.backoff` and retrying whenever the destination
/// reports rate limiting. Other errors are returned immediately.
pub fn publish_with_retry<P: Publisher + ?Sized>(
    publisher: &mut P,
    store: &TransactionStore,
    buckets: &MonthBuckets,
    policy: RetryPolicy,
) -> Result<PublishSummary, PublishError> {
    let mut attempt = 1;
    loop {
        match publisher.publish(store, buckets) {
            Err(PublishError::RateLimited) if attempt < policy.max_attempts => {
                warn!(
                    attempt,
                    backoff_secs = policy.backoff.as_secs(),
                    "write quota reached, waiting before retrying"
                );
                std::thread::sleep(policy.backoff);
                attempt += 1;
            }
            other => return other,
        }
    }
}

// ---------------------------------------------------------------------------
// Local workbook: one CSV worksheet per month plus yearly summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetRow {
    date: NaiveDate,
    description: String,
    amount: Decimal,
    category: String,
}

impl SheetRow {
    fn key(&self) -> (NaiveDate, String, Decimal) {
        (self.date, self.description.clone(), self.amount)
    }
}

pub struct WorkbookPublisher {
    root: PathBuf,
}

impl WorkbookPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn month_path(&self, label: &str) -> PathBuf {
        self.root.join(format!("{label}.csv"))
    }

    pub fn summary_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("{year} Summary.csv"))
    }

    fn read_sheet(path: &Path) -> Result<Vec<SheetRow>, PublishError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let malformed = |reason: String| PublishError::Malformed {
                path: path.to_path_buf(),
                reason: format!("line {line}: {reason}"),
            };
            let field = |i: usize| record.get(i).unwrap_or("").trim();
            let date = parse_date(field(0))
                .ok_or_else(|| malformed(format!("invalid date '{}'", field(0))))?;
            let amount = parse_amount(field(2))
                .ok_or_else(|| malformed(format!("invalid amount '{}'", field(2))))?;
            rows.push(SheetRow {
                date,
                description: field(1).to_string(),
                amount,
                category: field(3).to_string(),
            });
        }
        Ok(rows)
    }

    fn write_sheet(path: &Path, rows: &[SheetRow]) -> Result<(), PublishError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(SHEET_HEADER)?;
        for row in rows {
            wtr.write_record([
                row.date.format(DISPLAY_DATE_FORMAT).to_string(),
                row.description.clone(),
                format!("{:.2}", row.amount),
                row.category.clone(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        year: i32,
        sheets: &HashMap<String, Vec<SheetRow>>,
    ) -> Result<(), PublishError> {
        let months: Vec<String> = (1..=12)
            .filter_map(|m| NaiveDate::from_ymd_opt(year, m, 1))
            .map(|d| d.format(LABEL_FORMAT).to_string())
            .collect();

        let mut on_disk: HashMap<String, Vec<SheetRow>> = HashMap::new();
        for label in &months {
            if sheets.contains_key(label) {
                continue;
            }
            let path = self.month_path(label);
            if path.exists() {
                on_disk.insert(label.clone(), Self::read_sheet(&path)?);
            }
        }

        let mut wtr = csv::Writer::from_path(self.summary_path(year))?;
        let mut header = vec!["Category".to_string()];
        header.extend(months.iter().cloned());
        wtr.write_record(&header)?;

        for category in Category::RULED {
            let mut record = vec![category.name().to_string()];
            for label in &months {
                let cell = match sheets.get(label).or_else(|| on_disk.get(label)) {
                    Some(rows) => {
                        let total: Decimal = rows
                            .iter()
                            .filter(|r| r.category == category.name())
                            .map(|r| r.amount)
                            .sum();
                        format!("{total:.2}")
                    }
                    None => String::new(),
                };
                record.push(cell);
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Combine newly ingested rows with a worksheet's existing rows keyed on
/// `(date, description, amount)`. Existing rows are all kept, so categories
/// fixed by hand in the worksheet win. A key that repeats more often in the
/// new rows contributes only its extra occurrences.
fn merge_with_existing(new_rows: Vec<SheetRow>, existing: Vec<SheetRow>) -> Vec<SheetRow> {
    let mut existing_counts: HashMap<(NaiveDate, String, Decimal), usize> = HashMap::new();
    for row in &existing {
        *existing_counts.entry(row.key()).or_default() += 1;
    }
    let mut new_counts: HashMap<(NaiveDate, String, Decimal), usize> = HashMap::new();
    let mut merged = existing;
    for row in new_rows {
        let key = row.key();
        let seen = new_counts.entry(key.clone()).or_default();
        *seen += 1;
        if *seen > existing_counts.get(&key).copied().unwrap_or(0) {
            merged.push(row);
        }
    }
    merged.sort_by_key(|r| r.date);
    merged
}

impl Publisher for WorkbookPublisher {
    fn publish(
        &mut self,
        store: &TransactionStore,
        buckets: &MonthBuckets,
    ) -> Result<PublishSummary, PublishError> {
        info!(
            root = %self.root.display(),
            rows = store.len(),
            from = ?buckets.first,
            until = ?buckets.end,
            "publishing workbook"
        );
        std::fs::create_dir_all(&self.root)?;
        let mut summary = PublishSummary::default();
        let mut sheets: HashMap<String, Vec<SheetRow>> = HashMap::new();

        for bucket in &buckets.buckets {
            let label = bucket.label();
            let path = self.month_path(&label);
            let new_rows: Vec<SheetRow> = bucket
                .rows
                .iter()
                .map(|t| SheetRow {
                    date: t.date,
                    description: t.description.clone(),
                    amount: t.amount,
                    category: t.category.name().to_string(),
                })
                .collect();

            let rows = if path.exists() {
                let existing = Self::read_sheet(&path)?;
                summary.months_updated += 1;
                info!(month = %label, "rewriting worksheet");
                merge_with_existing(new_rows, existing)
            } else {
                summary.months_created += 1;
                info!(month = %label, "creating worksheet");
                new_rows
            };
            Self::write_sheet(&path, &rows)?;
            summary.rows_written += rows.len();
            sheets.insert(label, rows);
        }

        for year in buckets.years() {
            info!(year, "creating yearly summary");
            self.write_summary(year, &sheets)?;
            summary.summaries_written += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::bucket;
    use crate::models::Transaction;
    use std::str::FromStr;

    fn txn(date: &str, description: &str, amount: &str, category: Category) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            category,
            source_flipped: false,
        }
    }

    fn store() -> TransactionStore {
        TransactionStore::from_rows(vec![
            txn("2024-01-05", "Coffee Shop", "4.50", Category::Food),
            txn("2024-01-20", "Rent", "1200.00", Category::Housing),
            txn("2024-03-02", "Sunoco", "30.00", Category::Unknown),
        ])
    }

    struct Flaky {
        failures: u32,
        calls: u32,
    }

    impl Publisher for Flaky {
        fn publish(
            &mut self,
            _store: &TransactionStore,
            _buckets: &MonthBuckets,
        ) -> Result<PublishSummary, PublishError> {
            self.calls += 1;
            if self.calls <= self.failures {
                Err(PublishError::RateLimited)
            } else {
                Ok(PublishSummary::default())
            }
        }
    }

    fn no_wait(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::ZERO,
            max_attempts,
        }
    }

    #[test]
    fn test_retry_recovers_from_rate_limit() {
        let mut p = Flaky { failures: 2, calls: 0 };
        let store = store();
        let result = publish_with_retry(&mut p, &store, &bucket(&store), no_wait(5));
        assert!(result.is_ok());
        assert_eq!(p.calls, 3);
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let mut p = Flaky { failures: 10, calls: 0 };
        let store = store();
        let result = publish_with_retry(&mut p, &store, &bucket(&store), no_wait(3));
        assert!(matches!(result, Err(PublishError::RateLimited)));
        assert_eq!(p.calls, 3);
    }

    #[test]
    fn test_workbook_writes_every_month_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path().join("sheet"));
        let store = store();
        let summary = p.publish(&store, &bucket(&store)).unwrap();
        assert_eq!(summary.months_created, 3);
        assert_eq!(summary.summaries_written, 1);
        assert!(p.month_path("Feb 2024").exists());

        let jan = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        assert_eq!(
            jan,
            "Date,Description,Amount,Category\n01/05/2024,Coffee Shop,4.50,Food\n01/20/2024,Rent,1200.00,Housing\n"
        );

        let yearly = std::fs::read_to_string(p.summary_path(2024)).unwrap();
        let mut lines = yearly.lines();
        assert!(lines.next().unwrap().starts_with("Category,Jan 2024,Feb 2024,Mar 2024,Apr 2024"));
        let housing = format!("Housing,1200.00,0.00,0.00{}", ",".repeat(9));
        assert_eq!(lines.next().unwrap(), housing);
    }

    #[test]
    fn test_workbook_merge_keeps_existing_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path());
        std::fs::write(
            p.month_path("Jan 2024"),
            "Date,Description,Amount,Category\n01/05/2024,Coffee Shop,$4.50,Gift\n01/02/2024,Older Row,\"1,000.00\",Misc\n",
        )
        .unwrap();
        let store = store();
        let summary = p.publish(&store, &bucket(&store)).unwrap();
        assert_eq!(summary.months_updated, 1);
        assert_eq!(summary.months_created, 2);

        let jan = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        let lines: Vec<&str> = jan.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,Description,Amount,Category",
                "01/02/2024,Older Row,1000.00,Misc",
                "01/05/2024,Coffee Shop,4.50,Gift",
                "01/20/2024,Rent,1200.00,Housing",
            ]
        );
    }

    #[test]
    fn test_workbook_rejects_malformed_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path());
        std::fs::write(
            p.month_path("Jan 2024"),
            "Date,Description,Amount,Category\nsoon,Coffee,4.50,Food\n",
        )
        .unwrap();
        let store = store();
        let err = p.publish(&store, &bucket(&store)).unwrap_err();
        assert!(matches!(err, PublishError::Malformed { .. }));
    }

    #[test]
    fn test_republish_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path());
        let store = store();
        let months = bucket(&store);
        p.publish(&store, &months).unwrap();
        let first = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        p.publish(&store, &months).unwrap();
        let second = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_republish_keeps_repeated_charges() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path());
        let store = TransactionStore::from_rows(vec![
            txn("2024-01-05", "Coffee Shop", "4.50", Category::Food),
            txn("2024-01-05", "Coffee Shop", "4.50", Category::Food),
        ]);
        let months = bucket(&store);
        let first = p.publish(&store, &months).unwrap();
        let second = p.publish(&store, &months).unwrap();
        assert_eq!(first.rows_written, 2);
        assert_eq!(second.rows_written, 2);
        let jan = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        assert_eq!(jan.matches("Coffee Shop").count(), 2);
    }

    #[test]
    fn test_workbook_merge_adds_only_new_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = WorkbookPublisher::new(dir.path());
        std::fs::write(
            p.month_path("Jan 2024"),
            "Date,Description,Amount,Category\n01/05/2024,Coffee Shop,4.50,Gift\n",
        )
        .unwrap();
        let store = TransactionStore::from_rows(vec![
            txn("2024-01-05", "Coffee Shop", "4.50", Category::Food),
            txn("2024-01-05", "Coffee Shop", "4.50", Category::Food),
        ]);
        p.publish(&store, &bucket(&store)).unwrap();
        let jan = std::fs::read_to_string(p.month_path("Jan 2024")).unwrap();
        let lines: Vec<&str> = jan.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec!["01/05/2024,Coffee Shop,4.50,Gift", "01/05/2024,Coffee Shop,4.50,Food"]
        );
    }
}
