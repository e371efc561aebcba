// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::path::Path;
use tabpick_app::Table;
use tracing::info;

/// Reads a headerless CSV file. Rows may have different lengths; cells past
/// the end of a short row do not exist.
pub fn load_table(
    path: &Path,
    delimiter: u8,
    first_row: usize,
    first_col: usize,
) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open table {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("read row {} of {}", index + 1, path.display())
        })?;
        rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
    }

    let table = Table::new(first_row, first_col, rows);
    if table.is_empty() {
        bail!(
            "table {} has no cells; pass a CSV file with at least one row or use --demo",
            path.display()
        );
    }

    info!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.width(),
        "loaded table"
    );
    Ok(table)
}
