use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::dialect::{self, Dialect, BOFA_HEADER};
use crate::error::{BudgitError, Result};
use crate::models::{Category, RawRow, TaggedTransaction, Transaction};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a statement amount: thousands separators, a currency sign and
/// surrounding quotes are stripped; `(12.00)` reads as negative.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<Decimal>().ok().map(|d| -d);
    }
    s.parse().ok()
}

// Two-digit years first: "%Y" would read "24" as the year 24.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

// ---------------------------------------------------------------------------
// Format normalizer
// ---------------------------------------------------------------------------

/// Column positions of the canonical fields within one dialect.
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
}

fn columns(dialect: Dialect) -> Columns {
    match dialect {
        // Trans. Date, Post Date, Description, Amount, Category
        Dialect::Discover => Columns { date: 0, description: 2, amount: 3 },
        // Date, Description, Original Description, Category, Amount, Status
        Dialect::Usaa => Columns { date: 0, description: 1, amount: 4 },
        // Index, Date, Description, Amount, (unused), Running Balance
        Dialect::MtBank => Columns { date: 1, description: 2, amount: 3 },
        // Date, Description, Amount, Running Bal.
        Dialect::BankOfAmerica => Columns { date: 0, description: 1, amount: 2 },
    }
}

fn is_bofa_header(record: &csv::StringRecord) -> bool {
    let joined: Vec<&str> = record.iter().map(|f| f.trim()).collect();
    joined.join(",") == BOFA_HEADER
}

/// Project a file's records onto the canonical date/description/amount
/// text columns, dropping everything dialect-specific.
pub fn normalize(dialect: Dialect, content: &str) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let cols = columns(dialect);
    let mut rows = Vec::new();
    // The M&T export has no header; the others start after theirs.
    let mut found_header = dialect == Dialect::MtBank;

    for result in rdr.records() {
        let record = result?;
        if !found_header {
            found_header = match dialect {
                Dialect::BankOfAmerica => is_bofa_header(&record),
                _ => true,
            };
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        rows.push(RawRow {
            line: record.position().map(|p| p.line() as usize).unwrap_or(0),
            date: field(cols.date),
            description: field(cols.description),
            amount: field(cols.amount),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Transaction canonicalizer
// ---------------------------------------------------------------------------

/// Cleaned rows of one source file plus what cleanup did to it.
#[derive(Debug, Clone)]
pub struct FileTable {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub rows: Vec<TaggedTransaction>,
    pub nulls_dropped: usize,
    pub zeros_dropped: usize,
    pub sign_flipped: bool,
}

/// Cleaned rows of one file with the cleanup counts.
#[derive(Debug, Clone)]
pub struct Canonical {
    pub rows: Vec<TaggedTransaction>,
    pub nulls_dropped: usize,
    pub zeros_dropped: usize,
    pub sign_flipped: bool,
}

/// Turn structurally normalized rows into cleaned canonical rows.
/// `path` only labels errors.
pub fn canonicalize(rows: Vec<RawRow>, path: &Path) -> Result<Canonical> {
    let total = rows.len();
    let rows: Vec<RawRow> = rows.into_iter().filter(|r| !r.has_nulls()).collect();
    let nulls_dropped = total - rows.len();

    // Tag repeats before anything can merge them.
    let mut seen: HashMap<(String, String, String), usize> = HashMap::new();
    let tagged: Vec<(RawRow, usize)> = rows
        .into_iter()
        .map(|r| {
            let key = (r.date.clone(), r.description.clone(), r.amount.clone());
            let counter = seen.entry(key).or_insert(0);
            let idx = *counter;
            *counter += 1;
            (r, idx)
        })
        .collect();

    let mut amounts = Vec::with_capacity(tagged.len());
    for (row, idx) in tagged {
        let amount = parse_amount(&row.amount).ok_or_else(|| BudgitError::InvalidAmount {
            path: path.to_path_buf(),
            line: row.line,
            value: row.amount.clone(),
        })?;
        amounts.push((row, idx, amount));
    }

    let before_zero = amounts.len();
    amounts.retain(|(_, _, amount)| !amount.is_zero());
    let zeros_dropped = before_zero - amounts.len();

    let negatives = amounts.iter().filter(|(_, _, a)| a.is_sign_negative()).count();
    let positives = amounts.len() - negatives;
    let sign_flipped = negatives > positives;
    if sign_flipped {
        debug!(path = %path.display(), negatives, positives, "negating amounts");
        for (_, _, amount) in amounts.iter_mut() {
            *amount = -*amount;
        }
    }

    let mut out = Vec::with_capacity(amounts.len());
    for (row, occurrence_index, amount) in amounts {
        let date = parse_date(&row.date).ok_or_else(|| BudgitError::InvalidDate {
            path: path.to_path_buf(),
            line: row.line,
            value: row.date.clone(),
        })?;
        out.push(TaggedTransaction {
            txn: Transaction {
                date,
                description: row.description,
                amount,
                category: Category::Unknown,
                source_flipped: sign_flipped,
            },
            occurrence_index,
        });
    }

    Ok(Canonical {
        rows: out,
        nulls_dropped,
        zeros_dropped,
        sign_flipped,
    })
}

// ---------------------------------------------------------------------------
// ingest_file / ingest_dir
// ---------------------------------------------------------------------------

pub fn ingest_content(path: &Path, content: &str) -> Result<FileTable> {
    let dialect = dialect::detect_content(path, content)?;
    info!(path = %path.display(), dialect = dialect.key(), "compiling {} expenses", dialect.institution());
    let raw = normalize(dialect, content)?;
    let canonical = canonicalize(raw, path)?;
    Ok(FileTable {
        path: path.to_path_buf(),
        dialect,
        rows: canonical.rows,
        nulls_dropped: canonical.nulls_dropped,
        zeros_dropped: canonical.zeros_dropped,
        sign_flipped: canonical.sign_flipped,
    })
}

pub fn ingest_file(path: &Path) -> Result<FileTable> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = content {
        warn!(path = %path.display(), "file is not valid UTF-8, invalid bytes replaced with U+FFFD");
    }
    ingest_content(path, &content)
}

/// All `.csv` files directly inside `dir`, sorted by name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BudgitError::NoCsvFiles {
            dir: dir.to_path_buf(),
        });
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p
                    .extension()
                    .map_or(false, |e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Ingest every CSV in `dir`. Any bad file aborts the whole run.
pub fn ingest_dir(dir: &Path) -> Result<Vec<FileTable>> {
    let files = csv_files(dir)?;
    if files.is_empty() {
        return Err(BudgitError::NoCsvFiles {
            dir: dir.to_path_buf(),
        });
    }
    files.iter().map(|f| ingest_file(f)).collect()
}
