//! Building the search store from extracted tab text.
//!
//! Input is a snapshot of tab records with text, either in memory or as
//! a TSV file (`prefix.window.tab \t title \t url \t text`, one record
//! per line). Indexing is a wholesale rebuild: the previous store at the
//! same location is replaced, never merged into.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::model::TabRecord;
use crate::search::store::TabStore;

/// Rebuild the store at `store_path` from `records`. With `cleanup`,
/// whitespace runs in each record's text are collapsed before indexing
/// so the indexed tokens are stable.
pub fn index_records(store_path: &Path, records: Vec<TabRecord>, cleanup: bool) -> Result<()> {
    let mut store = TabStore::create(store_path)?;
    let mut count = 0usize;
    for mut record in records {
        if cleanup {
            record.cleanup_text();
        }
        store.add_record(&record)?;
        count += 1;
    }
    store.commit()?;
    info!(records = count, store = %store_path.display(), "search store rebuilt");
    Ok(())
}

/// Rebuild the store from a TSV snapshot file.
pub fn index_tsv(store_path: &Path, tsv_path: &Path, cleanup: bool) -> Result<()> {
    let records = read_tsv_snapshot(tsv_path)?;
    index_records(store_path, records, cleanup)
}

/// Read a TSV snapshot, skipping unparseable lines with a warning.
pub fn read_tsv_snapshot(path: &Path) -> Result<Vec<TabRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read tab snapshot {}", path.display()))?;
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| match TabRecord::from_tsv_line(line) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping unparseable snapshot line");
                None
            }
        })
        .collect())
}
