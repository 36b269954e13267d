use tracing::info;

use crate::buckets::bucket;
use crate::cli::load_store;
use crate::error::{BudgitError, Result};
use crate::publish::{publish_with_retry, WorkbookPublisher};
use crate::settings::load_or_default;

pub fn run(dir: Option<&str>) -> Result<()> {
    let settings = load_or_default()?;
    let sheet_id = settings.sheet_id.clone().ok_or_else(|| {
        BudgitError::Settings("no budget sheet set. Run `budgit init --sheet-url <url>`".into())
    })?;
    let loaded = load_store(&settings, dir)?;
    if loaded.store.is_empty() {
        println!("Nothing to publish.");
        return Ok(());
    }
    if loaded.categorized.uncategorized > 0 {
        println!(
            "{} transactions are uncategorized and will be published as UNK.",
            loaded.categorized.uncategorized
        );
    }
    let buckets = bucket(&loaded.store);

    let mut publisher = WorkbookPublisher::new(settings.workbooks_dir().join(&sheet_id));
    info!(root = %publisher.root().display(), months = buckets.len(), "publishing");
    let summary = publish_with_retry(
        &mut publisher,
        &loaded.store,
        &buckets,
        settings.retry_policy(),
    )?;

    println!(
        "Published {} rows: {} new months, {} updated, {} yearly summaries",
        summary.rows_written,
        summary.months_created,
        summary.months_updated,
        summary.summaries_written
    );
    println!("Workbook: {}", publisher.root().display());
    Ok(())
}
