use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::load_store;
use crate::error::Result;
use crate::settings::load_or_default;

pub fn run(dir: Option<&str>) -> Result<()> {
    let settings = load_or_default()?;
    let loaded = load_store(&settings, dir)?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Institution", "Rows", "Blank", "Zero", "Signs"]);
    let mut raw_total = 0usize;
    for file in &loaded.files {
        raw_total += file.rows.len();
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(name),
            Cell::new(file.dialect.institution()),
            Cell::new(file.rows.len()),
            Cell::new(file.nulls_dropped),
            Cell::new(file.zeros_dropped),
            Cell::new(if file.sign_flipped { "flipped" } else { "" }),
        ]);
    }
    println!("Statements\n{table}");

    let store = &loaded.store;
    println!(
        "{} unique transactions ({} duplicates merged)",
        store.len() + loaded.categorized.suppressed,
        raw_total - store.len() - loaded.categorized.suppressed
    );
    if let (Some(first), Some(last)) = (store.first_date(), store.last_date()) {
        println!("Covering {first} to {last}");
    }
    if loaded.categorized.suppressed > 0 {
        println!("{} card payments skipped", loaded.categorized.suppressed);
    }
    let pending = loaded.categorized.uncategorized;
    let summary = format!(
        "{} categorized, {pending} uncategorized",
        loaded.categorized.categorized
    );
    if pending > 0 {
        println!("{}", summary.yellow());
        println!("Run `budgit sort` to categorize the rest.");
    } else {
        println!("{}", summary.green());
    }
    Ok(())
}
