// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use tabpick_app::{Bounds, CellCoord, HeaderGrid, PopupId, Session, SessionOptions, Table};

const REGIONS: [&str; 8] = [
    "North", "South", "East", "West", "Central", "Coastal", "Highland", "Valley",
];

const METRICS: [&str; 6] = ["Units", "Revenue", "Returns", "Margin", "Visits", "Notes"];

const QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Builds plausible report-style tables for demos and tests.
#[derive(Debug, Clone)]
pub struct TableFaker {
    rng: DeterministicRng,
}

impl TableFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    /// A title row, a column-label row, then one row per region. The title row
    /// only has one cell, so the table is ragged.
    pub fn report(&mut self, regions: usize) -> Table {
        let mut rows = vec![
            vec![format!("{} report", self.pick(&QUARTERS))],
            std::iter::once("Region".to_owned())
                .chain(METRICS.iter().map(|metric| (*metric).to_owned()))
                .collect(),
        ];

        for region in REGIONS.iter().cycle().take(regions) {
            let mut row = vec![(*region).to_owned()];
            for metric in METRICS {
                let value = match metric {
                    "Notes" => self.note(),
                    "Margin" => format!("{}%", self.rng.int_n(60)),
                    _ => (100 + self.rng.int_n(9_900)).to_string(),
                };
                row.push(value);
            }
            rows.push(row);
        }

        Table::new(1, 1, rows)
    }

    fn note(&mut self) -> String {
        const NOTES: [&str; 5] = [
            "steady",
            "seasonal dip",
            "new store opened",
            "supplier delay",
            "record month",
        ];
        self.pick(&NOTES).to_owned()
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

/// The table `--demo` starts with.
pub fn demo_table() -> Table {
    TableFaker::new(7).report(6)
}

/// Rectangular `rows` x `cols` table of `r{row}c{col}` labels starting at 1.
pub fn grid_table(rows: usize, cols: usize) -> Table {
    let rows = (1..=rows)
        .map(|row| (1..=cols).map(|col| format!("r{row}c{col}")).collect())
        .collect();
    Table::new(1, 1, rows)
}

/// Header grid over `bounds` containing only `present` cells.
pub fn sparse_grid(bounds: Bounds, present: &[CellCoord]) -> HeaderGrid {
    HeaderGrid::new(bounds, present.iter().copied())
}

/// Fresh session over a full `rows` x `cols` grid with popup ids from 1.
pub fn session(rows: usize, cols: usize) -> Session {
    Session::from_table(
        &grid_table(rows, cols),
        PopupId::FIRST,
        SessionOptions::default(),
    )
}

/// Writes `content` to a CSV file inside a fresh temp dir.
pub fn temp_csv(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("table.csv");
    std::fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}
