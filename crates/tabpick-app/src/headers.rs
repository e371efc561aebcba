// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::{Bounds, CellCoord, ListError, Table, encode_header_list, parse_header_list};

/// Per-cell flags owned by the header toggle component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFlags {
    pub header: bool,
    pub hot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header token {coord} does not name a cell in this table")]
    UnknownCell { coord: CellCoord },
    #[error(transparent)]
    List(#[from] ListError),
}

/// Header flags for every existing cell of the table.
///
/// Coordinates inside the bounds without a cell are simply absent; every
/// operation skips them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderGrid {
    bounds: Bounds,
    cells: BTreeMap<CellCoord, CellFlags>,
}

impl HeaderGrid {
    pub fn new<I>(bounds: Bounds, coords: I) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let cells = coords
            .into_iter()
            .filter(|coord| bounds.contains(*coord))
            .map(|coord| (coord, CellFlags::default()))
            .collect();
        Self { bounds, cells }
    }

    pub fn from_table(table: &Table) -> Self {
        Self::new(table.bounds(), table.coords())
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn flags(&self, coord: CellCoord) -> Option<CellFlags> {
        self.cells.get(&coord).copied()
    }

    pub fn is_header(&self, coord: CellCoord) -> bool {
        self.cells.get(&coord).is_some_and(|flags| flags.header)
    }

    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.keys().copied()
    }

    /// Header cells in row-major, column-minor order.
    pub fn header_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells
            .iter()
            .filter(|(_, flags)| flags.header)
            .map(|(coord, _)| *coord)
    }

    /// Clears the header flag across `row` if any cell in it is a header,
    /// otherwise sets it on every cell. Returns the new state, or `None` when
    /// the row has no cells.
    pub fn toggle_header_row(&mut self, row: usize) -> Option<bool> {
        if !self.bounds.contains_row(row) {
            return None;
        }

        let columns = self.bounds.columns();
        let start = CellCoord::new(row, *columns.start());
        let end = CellCoord::new(row, *columns.end());
        let mut row_cells = self.cells.range_mut(start..=end).peekable();
        row_cells.peek()?;

        let cells = row_cells.map(|(_, flags)| flags).collect::<Vec<_>>();
        let has_header = cells.iter().any(|flags| flags.header);
        for flags in cells {
            flags.header = !has_header;
        }

        debug!(row, header = !has_header, "toggled header row");
        Some(!has_header)
    }

    /// Flips the header flag of one cell. `None` when there is no such cell.
    pub fn toggle_header_cell(&mut self, coord: CellCoord) -> Option<bool> {
        let flags = self.cells.get_mut(&coord)?;
        flags.header = !flags.header;
        Some(flags.header)
    }

    /// Sets the pointer-over flag. Returns whether anything changed.
    pub fn set_hot(&mut self, coord: CellCoord, hot: bool) -> bool {
        match self.cells.get_mut(&coord) {
            Some(flags) if flags.hot != hot => {
                flags.hot = hot;
                true
            }
            _ => false,
        }
    }

    pub fn pack_headers(&self) -> String {
        encode_header_list(self.header_cells())
    }

    /// Marks the cells named by a previously packed header list. Cells not in
    /// the list keep their current flag.
    pub fn restore_headers(&mut self, list: &str) -> Result<usize, HeaderError> {
        let coords = parse_header_list(list)?;
        if let Some(coord) = coords.iter().find(|coord| !self.contains(**coord)) {
            return Err(HeaderError::UnknownCell { coord: *coord });
        }

        for coord in &coords {
            if let Some(flags) = self.cells.get_mut(coord) {
                flags.header = true;
            }
        }
        Ok(coords.len())
    }
}

const CLICK_NAGS: [(u32, &str); 7] = [
    (10, "Aren't you getting bored of this yet?"),
    (
        15,
        "Seriously, this is getting a bit out of hand, you know...",
    ),
    (
        20,
        "What do you have about this cell? Sheesh, all these other cells, but noooo, got to click this one again and again...",
    ),
    (
        25,
        "Oh, come on, this isn't even funny now, you're going to wear out this poor cell",
    ),
    (30, "There's a name for people like you, you know?"),
    (
        35,
        "Keep this up and you're going to break your mouse button. Or get RSI. And you'll deserve it, you horrible cell molester.",
    ),
    (40, "okay, I'm out of here, this is just too creepy. Weirdo."),
];

/// Counts repeated clicks on the same cell and produces a nag at fixed
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickStreak {
    last: Option<CellCoord>,
    repeats: u32,
}

impl ClickStreak {
    pub fn record(&mut self, coord: CellCoord) -> Option<&'static str> {
        if self.last != Some(coord) {
            self.last = Some(coord);
            self.repeats = 0;
            return None;
        }

        self.repeats = self.repeats.saturating_add(1);
        CLICK_NAGS
            .iter()
            .find(|(threshold, _)| *threshold == self.repeats)
            .map(|(_, message)| *message)
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}
