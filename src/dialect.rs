use std::path::Path;

use crate::error::{BudgitError, Result};

pub const DISCOVER_HEADER: &str = "Trans. Date,Post Date,Description,Amount,Category";
pub const USAA_HEADER: &str = "Date,Description,Original Description,Category,Amount,Status";
pub const BOFA_HEADER: &str = "Date,Description,Amount,Running Bal.";

/// How many leading lines may precede the Bank of America header.
pub const BOFA_HEADER_WINDOW: usize = 7;

/// CSV layouts produced by the supported institutions' export features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Discover card: 5-column header with transaction and post dates.
    Discover,
    /// USAA bank: 6-column header with original description and status.
    Usaa,
    /// M&T Bank: headerless, each row led by its numeric index.
    MtBank,
    /// Bank of America: 4-column header somewhere in the first seven lines.
    BankOfAmerica,
}

/// Detection order. First match wins.
const PRIORITY: &[Dialect] = &[
    Dialect::Discover,
    Dialect::Usaa,
    Dialect::MtBank,
    Dialect::BankOfAmerica,
];

impl Dialect {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Usaa => "usaa",
            Self::MtBank => "mtb",
            Self::BankOfAmerica => "bofa",
        }
    }

    pub fn institution(&self) -> &'static str {
        match self {
            Self::Discover => "Discover card",
            Self::Usaa => "USAA Bank",
            Self::MtBank => "M&T Bank",
            Self::BankOfAmerica => "Bank of America",
        }
    }

    fn matches(&self, lines: &[&str]) -> bool {
        let first = lines.first().map(|l| l.trim_end()).unwrap_or("");
        match self {
            Self::Discover => first == DISCOVER_HEADER,
            Self::Usaa => first == USAA_HEADER,
            Self::MtBank => first.contains("1,") && first.contains('/'),
            Self::BankOfAmerica => lines
                .iter()
                .take(BOFA_HEADER_WINDOW)
                .any(|l| l.trim_end() == BOFA_HEADER),
        }
    }
}

/// Identify the dialect of a file from its leading lines.
pub fn detect(lines: &[&str]) -> Option<Dialect> {
    PRIORITY.iter().find(|d| d.matches(lines)).copied()
}

/// Like [`detect`] over already-read file content, failing loudly when no
/// signature matches.
pub fn detect_content(path: &Path, content: &str) -> Result<Dialect> {
    let lines: Vec<&str> = content.lines().take(BOFA_HEADER_WINDOW).collect();
    detect(&lines).ok_or_else(|| BudgitError::UnrecognizedFile {
        path: path.to_path_buf(),
    })
}
