use tracing::info;

use crate::cli::prompt;
use crate::error::Result;
use crate::settings::{
    load_settings, parse_sheet_id, save_settings, settings_path, shellexpand_path, Settings,
};

pub fn run(sheet_url: Option<String>, data_dir: Option<String>) -> Result<()> {
    let existing = load_settings()?;
    let first_run = existing.is_none();
    let mut settings = existing.unwrap_or_default();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if first_run {
        let chosen = prompt(&format!("Data directory [{}]: ", settings.data_dir))?;
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(&chosen);
        }
    }

    match sheet_url {
        Some(url) => settings.sheet_id = Some(parse_sheet_id(&url)?),
        None if first_run => {
            let url = prompt("Budget sheet URL (Enter to skip): ")?;
            if !url.is_empty() {
                settings.sheet_id = Some(parse_sheet_id(&url)?);
            }
        }
        None => {}
    }

    save_settings(&settings)?;
    std::fs::create_dir_all(settings.csv_dir())?;
    std::fs::create_dir_all(settings.workbooks_dir())?;
    info!(path = %settings_path().display(), "settings saved");

    println!("Initialized budgit at {}", settings.data_dir);
    println!("Drop statement exports into {}", settings.csv_dir().display());
    if let Some(id) = &settings.sheet_id {
        println!("Budget sheet: {id}");
    }
    Ok(())
}

/// Ask for a sheet URL until one parses. Empty input keeps the current value.
pub(crate) fn change_sheet_url(settings: &mut Settings) -> Result<()> {
    loop {
        let url = prompt("Paste the full URL of your budget sheet: ")?;
        if url.is_empty() {
            return Ok(());
        }
        match parse_sheet_id(&url) {
            Ok(id) => {
                settings.sheet_id = Some(id);
                return save_settings(settings);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}
