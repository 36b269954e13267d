use comfy_table::{Cell, Table};

use crate::error::{BudgitError, Result};
use crate::models::Category;
use crate::settings::{load_or_default, save_settings};

fn parse_category(name: &str) -> Result<Category> {
    name.parse::<Category>()
        .ok()
        .filter(|c| c.is_assigned())
        .ok_or_else(|| BudgitError::UnknownCategory(name.to_string()))
}

pub fn add(trigger: &str, category: &str) -> Result<()> {
    let category = parse_category(category)?;
    let mut settings = load_or_default()?;
    if !settings.categories.add_trigger(category, trigger) {
        return Err(BudgitError::Other(format!(
            "'{}' is already a {category} trigger",
            trigger.trim().to_lowercase()
        )));
    }
    save_settings(&settings)?;
    println!("Added rule: '{}' \u{2192} {category}", trigger.trim().to_lowercase());
    Ok(())
}

pub fn remove(trigger: &str, category: &str) -> Result<()> {
    let category = parse_category(category)?;
    let mut settings = load_or_default()?;
    if !settings.categories.remove_trigger(category, trigger) {
        return Err(BudgitError::Other(format!(
            "No {category} trigger '{trigger}'"
        )));
    }
    save_settings(&settings)?;
    println!("Removed rule: '{trigger}' \u{2192} {category}");
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_or_default()?;
    if settings.categories.is_empty() {
        println!("No rules yet. Add one with: budgit rules add <trigger> --category <name>");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Order", "Category", "Trigger"]);
    for (i, (category, trigger)) in settings.categories.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(category),
            Cell::new(trigger),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}
