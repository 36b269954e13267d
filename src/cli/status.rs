use crate::error::Result;
use crate::importer::csv_files;
use crate::models::Category;
use crate::settings::{load_settings, settings_path, Settings};

pub fn run() -> Result<()> {
    let Some(settings) = load_settings()? else {
        println!("Settings:   {} (not found)", settings_path().display());
        println!();
        println!("Run `budgit init` to set up.");
        return Ok(());
    };
    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("Settings:   {}", settings_path().display());
    println!("Data dir:   {}", settings.data_dir);
    println!(
        "Sheet:      {}",
        settings.sheet_id.as_deref().unwrap_or("(not set)")
    );
    let csv_dir = settings.csv_dir();
    match csv_files(&csv_dir) {
        Ok(files) => println!("Statements: {} in {}", files.len(), csv_dir.display()),
        Err(_) => println!("Statements: {} (missing)", csv_dir.display()),
    }

    println!();
    println!("Rules:         {}", settings.categories.len());
    for category in Category::RULED {
        let n = settings.categories.triggers(category).len();
        if n > 0 {
            println!("  {:<12}{n}", category.name());
        }
    }
}
