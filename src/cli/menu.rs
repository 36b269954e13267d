use colored::Colorize;

use crate::cli::init::change_sheet_url;
use crate::cli::{load_store, prompt, read_answer};
use crate::error::{BudgitError, Result};
use crate::settings::{load_settings, Settings};

const MENU_ITEMS: &[&str] = &[
    "Create budget",
    "Categorize expenses",
    "Change sheet URL",
    "Exit",
];

enum MenuChoice {
    CreateBudget,
    Categorize,
    ChangeSheet,
    Exit,
}

fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim() {
        "1" => Some(MenuChoice::CreateBudget),
        "2" => Some(MenuChoice::Categorize),
        "3" => Some(MenuChoice::ChangeSheet),
        "4" | "q" | "exit" => Some(MenuChoice::Exit),
        _ => None,
    }
}

/// Settings for the menu, running first-time setup when none are usable.
fn ensure_settings() -> Result<Settings> {
    match load_settings() {
        Ok(Some(s)) => return Ok(s),
        Ok(None) => println!("Welcome to budgit! Let's get set up."),
        Err(e @ BudgitError::CorruptSettings { .. }) => {
            eprintln!("{e}");
            println!("Starting setup again.");
        }
        Err(e) => return Err(e),
    }
    super::init::run(None, None)?;
    load_settings()?.ok_or_else(|| BudgitError::Settings("setup did not save settings".into()))
}

/// Input errors the menu cannot recover from: the statements themselves
/// must be fixed before anything else can run.
fn halts_menu(e: &BudgitError) -> bool {
    matches!(
        e,
        BudgitError::NoCsvFiles { .. }
            | BudgitError::UnrecognizedFile { .. }
            | BudgitError::InvalidAmount { .. }
            | BudgitError::InvalidDate { .. }
            | BudgitError::Csv(_)
    )
}

/// Show a fatal error and wait for the user to acknowledge it.
fn acknowledge(e: BudgitError) -> Result<()> {
    eprintln!("\n{}", e.to_string().red());
    prompt("Press Enter to exit...")?;
    Err(e)
}

fn print_header(settings: &Settings) -> Result<()> {
    let loaded = load_store(settings, None)?;
    println!();
    println!("{}", "budgit".bold());
    println!(
        "Sheet: {}",
        settings.sheet_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "{} transactions, {} uncategorized",
        loaded.store.len(),
        loaded.categorized.uncategorized
    );
    println!();
    for (i, item) in MENU_ITEMS.iter().enumerate() {
        println!("  {}) {item}", i + 1);
    }
    Ok(())
}

/// Numbered menu shown when no subcommand is given.
pub fn run() -> Result<()> {
    let mut settings = ensure_settings()?;

    loop {
        if let Err(e) = print_header(&settings) {
            return acknowledge(e);
        }
        let Some(input) = read_answer("Select an option: ")? else {
            println!();
            return Ok(());
        };
        let Some(choice) = parse_choice(&input) else {
            println!("Please enter a number from 1 to {}.", MENU_ITEMS.len());
            continue;
        };

        let result = match choice {
            MenuChoice::CreateBudget => super::publish::run(None),
            MenuChoice::Categorize => super::sort::run(None),
            MenuChoice::ChangeSheet => change_sheet_url(&mut settings),
            MenuChoice::Exit => return Ok(()),
        };
        match result {
            Err(e) if halts_menu(&e) => return acknowledge(e),
            Err(e) => eprintln!("\nError: {e}"),
            Ok(()) => {}
        }
        // Commands save their own settings, pick up their changes.
        if let Some(s) = load_settings()? {
            settings = s;
        }
    }
}
