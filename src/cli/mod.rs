pub mod import;
pub mod init;
pub mod menu;
pub mod publish;
pub mod report;
pub mod rules;
pub mod sort;
pub mod status;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::error::Result;
use crate::importer::{ingest_dir, FileTable};
use crate::settings::{shellexpand_path, Settings};
use crate::store::{CategorizeResult, TransactionStore};

/// Print `label` and read one trimmed line. `None` once stdin is closed.
pub(crate) fn read_answer(label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

pub(crate) fn prompt(label: &str) -> Result<String> {
    Ok(read_answer(label)?.unwrap_or_default())
}

pub(crate) fn parse_month_opt(month: &Option<String>) -> (Option<i32>, Option<u32>) {
    if let Some(m) = month {
        let parts: Vec<&str> = m.split('-').collect();
        if parts.len() == 2 {
            let year = parts[0].parse().ok();
            let month = parts[1].parse().ok();
            return (year, month);
        }
    }
    (None, None)
}

pub(crate) fn csv_dir(settings: &Settings, dir: Option<&str>) -> PathBuf {
    dir.map(|d| PathBuf::from(shellexpand_path(d)))
        .unwrap_or_else(|| settings.csv_dir())
}

/// Everything a command needs after reading the statement directory.
pub(crate) struct Loaded {
    pub store: TransactionStore,
    pub files: Vec<FileTable>,
    pub categorized: CategorizeResult,
}

/// Ingest every CSV in the directory, merge, and apply the saved rules.
pub(crate) fn load_store(settings: &Settings, dir: Option<&str>) -> Result<Loaded> {
    let dir = csv_dir(settings, dir);
    info!(dir = %dir.display(), "collecting .csv files");
    let files = ingest_dir(&dir)?;
    let mut store = TransactionStore::merge(files.iter().map(|f| f.rows.clone()));
    let categorized = store.categorize(&settings.categories);
    Ok(Loaded {
        store,
        files,
        categorized,
    })
}

#[derive(Parser)]
#[command(
    name = "budgit",
    about = "Turn bank and credit card CSV exports into a categorized monthly budget."
)]
pub struct Cli {
    /// Log progress to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// First-time setup: choose the data directory and the budget sheet.
    Init {
        /// Spreadsheet URL (the id after /d/ names the workbook)
        #[arg(long = "sheet-url")]
        sheet_url: Option<String>,
        /// Path for budgit data (default: ~/Documents/budgit)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Read every statement CSV and summarize what was found.
    Import {
        /// Directory of .csv exports (default: <data_dir>/csv_files)
        #[arg(long)]
        dir: Option<String>,
    },
    /// Interactively sort uncategorized expenses into categories.
    Sort {
        #[arg(long)]
        dir: Option<String>,
    },
    /// Manage category triggers.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Monthly totals by category, or one month's transactions.
    Report {
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        dir: Option<String>,
    },
    /// Write monthly worksheets and yearly summaries to the workbook.
    Publish {
        #[arg(long)]
        dir: Option<String>,
    },
    /// Show settings and rule counts.
    Status,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List triggers by category.
    List,
    /// Add a trigger to a category.
    Add {
        /// Substring to match in descriptions (case-insensitive)
        trigger: String,
        /// Category name
        #[arg(long)]
        category: String,
    },
    /// Remove a trigger from a category.
    Remove {
        trigger: String,
        #[arg(long)]
        category: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(&Some("2024-03".into())), (Some(2024), Some(3)));
        assert_eq!(parse_month_opt(&Some("March".into())), (None, None));
        assert_eq!(parse_month_opt(&None), (None, None));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["budgit", "-v", "rules", "add", "sunoco", "--category", "car"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Some(Commands::Rules {
                command: RulesCommands::Add { trigger, category },
            }) => {
                assert_eq!(trigger, "sunoco");
                assert_eq!(category, "car");
            }
            _ => panic!("expected rules add"),
        }
    }

    #[test]
    fn test_load_store_applies_saved_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("discover.csv"),
            "Trans. Date,Post Date,Description,Amount,Category\n\
             01/05/2024,01/06/2024,BIG COFFEE SHOP,4.50,Restaurants\n\
             01/09/2024,01/10/2024,INTERNET PAYMENT - THANK YOU,-100.00,Payments\n\
             01/12/2024,01/13/2024,SUNOCO 0123,30.00,Gas\n",
        )
        .unwrap();
        let mut settings = Settings::default();
        settings.categories.add_trigger(crate::models::Category::Food, "coffee");
        settings.categories.add_trigger(crate::models::Category::Credit, "internet payment");
        let loaded = load_store(&settings, dir.path().to_str()).unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.store.len(), 2);
        assert_eq!(loaded.categorized.suppressed, 1);
        assert_eq!(loaded.categorized.uncategorized, 1);
    }
}
