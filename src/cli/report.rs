use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::buckets::{bucket, MonthBucket, MonthBuckets};
use crate::cli::{load_store, parse_month_opt};
use crate::error::{BudgitError, Result};
use crate::fmt::money;
use crate::models::Category;
use crate::settings::load_or_default;

fn report_categories() -> impl Iterator<Item = Category> {
    Category::RULED.into_iter().chain(std::iter::once(Category::Unknown))
}

pub fn run(month: Option<String>, dir: Option<&str>) -> Result<()> {
    let settings = load_or_default()?;
    let loaded = load_store(&settings, dir)?;
    let buckets = bucket(&loaded.store);

    if month.is_none() {
        print_totals(&buckets);
        return Ok(());
    }
    let (Some(year), Some(m)) = parse_month_opt(&month) else {
        return Err(BudgitError::Other(format!(
            "Invalid month '{}': expected YYYY-MM",
            month.unwrap_or_default()
        )));
    };
    match buckets.get_month(year, m) {
        Some(b) => print_month(b),
        None => println!("No transactions in {year}-{m:02}."),
    }
    Ok(())
}

fn print_totals(buckets: &MonthBuckets) {
    if buckets.is_empty() {
        println!("No transactions.");
        return;
    }
    let mut header = vec!["Category".to_string()];
    header.extend(buckets.buckets.iter().map(|b| b.label()));

    let mut table = Table::new();
    table.set_header(header);
    for category in report_categories() {
        let mut row = vec![Cell::new(category)];
        for b in &buckets.buckets {
            let total = b.total(category);
            row.push(Cell::new(if total.is_zero() {
                String::new()
            } else {
                money(total)
            }));
        }
        table.add_row(row);
    }
    println!("Monthly totals\n{table}");
}

fn print_month(b: &MonthBucket) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Category"]);
    for row in b.display_rows() {
        let category = if row.category.is_assigned() {
            row.category.to_string().normal()
        } else {
            row.category.to_string().yellow()
        };
        table.add_row(vec![
            Cell::new(row.date),
            Cell::new(row.description),
            Cell::new(money(row.amount)),
            Cell::new(category),
        ]);
    }
    println!("{}\n{table}", b.label());

    let mut totals = Table::new();
    totals.set_header(vec!["Category", "Total"]);
    for category in report_categories() {
        let total = b.total(category);
        if !total.is_zero() {
            totals.add_row(vec![Cell::new(category), Cell::new(money(total))]);
        }
    }
    println!("{totals}");
}
