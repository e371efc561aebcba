// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// A table cell address. Field order gives row-major ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn element_id(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row, self.col)
    }
}

/// Inclusive row and column limits of the table being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl Bounds {
    pub const fn new(min_row: usize, max_row: usize, min_col: usize, max_col: usize) -> Self {
        Self {
            min_row,
            max_row,
            min_col,
            max_col,
        }
    }

    /// Bounds for `rows` x `cols` cells starting at (`first_row`, `first_col`).
    /// Both counts must be at least one.
    pub fn from_extent(first_row: usize, first_col: usize, rows: usize, cols: usize) -> Self {
        Self::new(
            first_row,
            first_row + rows.saturating_sub(1),
            first_col,
            first_col + cols.saturating_sub(1),
        )
    }

    pub fn rows(self) -> RangeInclusive<usize> {
        self.min_row..=self.max_row
    }

    pub fn columns(self) -> RangeInclusive<usize> {
        self.min_col..=self.max_col
    }

    pub fn contains_row(self, row: usize) -> bool {
        self.rows().contains(&row)
    }

    pub fn contains_col(self, col: usize) -> bool {
        self.columns().contains(&col)
    }

    pub fn contains(self, coord: CellCoord) -> bool {
        self.contains_row(coord.row) && self.contains_col(coord.col)
    }
}

/// Click behaviour and icon of a popup column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnMode {
    Anchor,
    Body,
    AnchorAdd,
    BodyAdd,
}

impl ColumnMode {
    pub const ALL: [Self; 4] = [Self::Anchor, Self::Body, Self::AnchorAdd, Self::BodyAdd];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Body => "body",
            Self::AnchorAdd => "anchor_add",
            Self::BodyAdd => "body_add",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "anchor" => Some(Self::Anchor),
            "body" => Some(Self::Body),
            "anchor_add" => Some(Self::AnchorAdd),
            "body_add" => Some(Self::BodyAdd),
            _ => None,
        }
    }

    /// Icon path for this mode, `{icon_path}{mode}.png` or the `_over` variant.
    pub fn icon_source(self, icon_path: &str, hovered: bool) -> String {
        let suffix = if hovered { "_over" } else { "" };
        format!("{icon_path}{}{suffix}.png", self.as_str())
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickMode {
    Anchor,
    Body,
}

impl PickMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Body => "body",
        }
    }
}

/// Which component the user is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Headers,
    Popups,
}

impl Stage {
    pub const ALL: [Self; 2] = [Self::Headers, Self::Popups];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Popups => "popups",
        }
    }
}

/// Cell text loaded from a CSV file. Rows may be ragged; coordinates past the
/// end of a short row have no cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub first_row: usize,
    pub first_col: usize,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(first_row: usize, first_col: usize, rows: Vec<Vec<String>>) -> Self {
        Self {
            first_row,
            first_col,
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_extent(self.first_row, self.first_col, self.rows.len(), self.width())
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&str> {
        let row = coord.row.checked_sub(self.first_row)?;
        let col = coord.col.checked_sub(self.first_col)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.rows.iter().enumerate().flat_map(move |(row_index, row)| {
            (0..row.len()).map(move |col_index| {
                CellCoord::new(self.first_row + row_index, self.first_col + col_index)
            })
        })
    }
}
