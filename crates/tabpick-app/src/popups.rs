// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{ColumnMode, ListError, PickMode, PopupId, PopupPair, encode_popup_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    pub mode: ColumnMode,
    pub anchor: Option<PopupId>,
    pub body: Option<PopupId>,
    pub title: String,
}

impl Default for ColumnState {
    fn default() -> Self {
        Self {
            mode: ColumnMode::AnchorAdd,
            anchor: None,
            body: None,
            title: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    PickStarted {
        column: usize,
        id: PopupId,
    },
    PickCancelled {
        column: usize,
    },
    PopupCreated {
        id: PopupId,
        anchor: usize,
        body: usize,
    },
    PopupCleared {
        id: PopupId,
        anchor: usize,
        body: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    #[error("column {column} is outside the popup columns {min}..={max}")]
    ColumnOutOfRange {
        column: usize,
        min: usize,
        max: usize,
    },
    #[error("Unable to find anchor or body columns for popup id {id}. This should not happen.")]
    PopupNotFound { id: PopupId },
    #[error("column {column} is in {mode} mode but holds no popup id. This should not happen.")]
    MissingPopupId { column: usize, mode: ColumnMode },
    #[error("popup a{anchor}b{body} reuses a column that already belongs to another popup")]
    ColumnInUse { anchor: usize, body: usize },
    #[error("popup a{column}b{column} uses the same column as anchor and body")]
    SameColumn { column: usize },
    #[error("every popup id up to 4294967295 is taken; start again with a lower next id")]
    IdsExhausted,
    #[error(transparent)]
    List(#[from] ListError),
}

/// Two-phase anchor/body column picker.
///
/// Idle (`PickMode::Anchor`) waits for an anchor column; after one is picked the
/// picker waits for a body column (`PickMode::Body`) and remembers the start
/// column. Column modes and the anchor/body slots always describe the same
/// popups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupPicker {
    min_col: usize,
    columns: Vec<ColumnState>,
    pick_mode: PickMode,
    start_column: Option<usize>,
    next_id: Option<PopupId>,
}

impl PopupPicker {
    pub fn new(min_col: usize, max_col: usize, next_id: PopupId) -> Self {
        let count = (max_col + 1).saturating_sub(min_col);
        Self {
            min_col,
            columns: vec![ColumnState::default(); count],
            pick_mode: PickMode::Anchor,
            start_column: None,
            next_id: Some(next_id),
        }
    }

    pub fn min_col(&self) -> usize {
        self.min_col
    }

    pub fn max_col(&self) -> usize {
        (self.min_col + self.columns.len()).saturating_sub(1)
    }

    pub fn pick_mode(&self) -> PickMode {
        self.pick_mode
    }

    pub fn start_column(&self) -> Option<usize> {
        self.start_column
    }

    pub fn is_picking(&self) -> bool {
        self.pick_mode == PickMode::Body
    }

    /// `None` once every id has been handed out.
    pub fn next_id(&self) -> Option<PopupId> {
        self.next_id
    }

    pub fn column(&self, col: usize) -> Option<&ColumnState> {
        col.checked_sub(self.min_col)
            .and_then(|index| self.columns.get(index))
    }

    pub fn mode(&self, col: usize) -> Option<ColumnMode> {
        self.column(col).map(|state| state.mode)
    }

    pub fn columns(&self) -> impl Iterator<Item = (usize, &ColumnState)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, state)| (self.min_col + index, state))
    }

    pub fn is_anchor_highlighted(&self, col: usize) -> bool {
        self.column(col).is_some_and(|state| state.anchor.is_some())
    }

    pub fn is_body_highlighted(&self, col: usize) -> bool {
        self.column(col).is_some_and(|state| state.body.is_some())
    }

    /// Icon source for a column header image.
    pub fn icon_source(&self, col: usize, icon_path: &str, hovered: bool) -> Option<String> {
        self.mode(col)
            .map(|mode| mode.icon_source(icon_path, hovered))
    }

    pub fn handle_column_click(&mut self, col: usize) -> Result<Vec<PickerEvent>, PickerError> {
        let state = self.column_checked(col)?.clone();
        let events = match (state.mode, self.pick_mode) {
            (ColumnMode::Anchor, PickMode::Anchor) => {
                let id = state.anchor.ok_or(PickerError::MissingPopupId {
                    column: col,
                    mode: state.mode,
                })?;
                vec![self.clear_popup(id)?]
            }
            (ColumnMode::Body, PickMode::Anchor) => {
                let id = state.body.ok_or(PickerError::MissingPopupId {
                    column: col,
                    mode: state.mode,
                })?;
                vec![self.clear_popup(id)?]
            }
            (ColumnMode::AnchorAdd, PickMode::Anchor) => vec![self.start_pick(col)?],
            (ColumnMode::BodyAdd, PickMode::Body) => vec![self.complete_pick(col)?],
            (ColumnMode::BodyAdd, PickMode::Anchor) => Vec::new(),
            (ColumnMode::Anchor | ColumnMode::Body | ColumnMode::AnchorAdd, PickMode::Body) => {
                self.start_column
                    .map(|start| self.cancel_popup(start))
                    .transpose()?
                    .into_iter()
                    .collect()
            }
        };
        Ok(events)
    }

    /// Abandons the in-progress pick started at `col`.
    pub fn cancel_popup(&mut self, col: usize) -> Result<PickerEvent, PickerError> {
        self.column_checked(col)?;
        Ok(self.abort_pick(col))
    }

    fn abort_pick(&mut self, col: usize) -> PickerEvent {
        self.pick_mode = PickMode::Anchor;
        self.start_column = None;
        self.set_column_heads(col, ColumnMode::BodyAdd, ColumnMode::AnchorAdd);
        if let Some(state) = self.column_mut(col) {
            state.anchor = None;
        }

        debug!(column = col, "cancelled popup pick");
        PickerEvent::PickCancelled { column: col }
    }

    /// Removes the popup `id`. Leaves the picker untouched when either of its
    /// columns cannot be found.
    pub fn clear_popup(&mut self, id: PopupId) -> Result<PickerEvent, PickerError> {
        let anchor = self.columns().find(|(_, state)| state.anchor == Some(id));
        let body = self.columns().find(|(_, state)| state.body == Some(id));
        let (Some((anchor, _)), Some((body, _))) = (anchor, body) else {
            warn!(%id, "popup columns missing on clear");
            return Err(PickerError::PopupNotFound { id });
        };

        if let Some(state) = self.column_mut(anchor) {
            state.anchor = None;
        }
        if let Some(state) = self.column_mut(body) {
            state.body = None;
        }
        self.set_column_mode(anchor, ColumnMode::AnchorAdd, String::new());
        self.set_column_mode(body, ColumnMode::AnchorAdd, String::new());

        debug!(%id, anchor, body, "cleared popup");
        Ok(PickerEvent::PopupCleared { id, anchor, body })
    }

    /// Complete popups as (anchor, body) pairs, ordered by anchor column.
    pub fn complete_pairs(&self) -> Vec<PopupPair> {
        self.columns()
            .filter_map(|(anchor, state)| {
                let id = state.anchor?;
                let (body, _) = self
                    .columns()
                    .find(|(_, candidate)| candidate.body == Some(id))?;
                Some(PopupPair::new(anchor, body))
            })
            .collect()
    }

    /// Serializes the complete popups, cancelling any pick in progress first.
    pub fn pack_popups(&mut self) -> String {
        if let Some(start) = self.start_column
            && self.is_picking()
        {
            self.abort_pick(start);
        }
        encode_popup_list(self.complete_pairs())
    }

    /// Recreates popups from a packed popup list, allocating ids from the
    /// current next id in list order. A pick in progress is cancelled first, so
    /// its start column is free. Nothing changes when any pair is invalid.
    pub fn restore_popups(&mut self, list: &str) -> Result<usize, PickerError> {
        let pairs = crate::parse_popup_list(list)?;

        let start = self.start_column.filter(|_| self.is_picking());
        let mut used = self
            .columns()
            .filter(|(col, state)| {
                Some(*col) != start && (state.anchor.is_some() || state.body.is_some())
            })
            .map(|(col, _)| col)
            .collect::<Vec<_>>();
        let mut ids = Vec::with_capacity(pairs.len());
        let mut next_id = self.next_id;
        for pair in &pairs {
            self.column_checked(pair.anchor)?;
            self.column_checked(pair.body)?;
            if pair.anchor == pair.body {
                return Err(PickerError::SameColumn { column: pair.anchor });
            }
            if used.contains(&pair.anchor) || used.contains(&pair.body) {
                return Err(PickerError::ColumnInUse {
                    anchor: pair.anchor,
                    body: pair.body,
                });
            }
            used.extend([pair.anchor, pair.body]);
            let id = next_id.ok_or(PickerError::IdsExhausted)?;
            ids.push(id);
            next_id = id.next();
        }

        if let Some(start) = start {
            self.abort_pick(start);
        }
        for (pair, id) in pairs.iter().zip(ids) {
            let title = popup_title(id);
            if let Some(state) = self.column_mut(pair.anchor) {
                state.anchor = Some(id);
            }
            if let Some(state) = self.column_mut(pair.body) {
                state.body = Some(id);
            }
            self.set_column_mode(pair.anchor, ColumnMode::Anchor, title.clone());
            self.set_column_mode(pair.body, ColumnMode::Body, title);
            self.next_id = id.next();
        }
        Ok(pairs.len())
    }

    fn start_pick(&mut self, col: usize) -> Result<PickerEvent, PickerError> {
        let id = self.available_id()?;
        self.pick_mode = PickMode::Body;
        self.start_column = Some(col);
        self.set_column_heads(col, ColumnMode::AnchorAdd, ColumnMode::BodyAdd);
        if let Some(state) = self.column_mut(col) {
            state.anchor = Some(id);
        }

        debug!(column = col, %id, "started popup pick");
        Ok(PickerEvent::PickStarted { column: col, id })
    }

    fn complete_pick(&mut self, col: usize) -> Result<PickerEvent, PickerError> {
        let id = self.available_id()?;
        let anchor = self.start_column.unwrap_or(col);
        self.pick_mode = PickMode::Anchor;
        if let Some(state) = self.column_mut(col) {
            state.body = Some(id);
        }
        self.set_column_heads(col, ColumnMode::BodyAdd, ColumnMode::AnchorAdd);

        let title = popup_title(id);
        self.set_column_mode(col, ColumnMode::Body, title.clone());
        self.set_column_mode(anchor, ColumnMode::Anchor, title);

        self.next_id = id.next();
        self.start_column = None;

        debug!(%id, anchor, body = col, "created popup");
        Ok(PickerEvent::PopupCreated {
            id,
            anchor,
            body: col,
        })
    }

    fn available_id(&self) -> Result<PopupId, PickerError> {
        self.next_id.ok_or(PickerError::IdsExhausted)
    }

    /// Moves every column in `replace` mode, except `trigger`, to `target`.
    fn set_column_heads(&mut self, trigger: usize, replace: ColumnMode, target: ColumnMode) {
        let min_col = self.min_col;
        for (index, state) in self.columns.iter_mut().enumerate() {
            if min_col + index != trigger && state.mode == replace {
                state.mode = target;
                state.title.clear();
            }
        }
    }

    fn set_column_mode(&mut self, col: usize, mode: ColumnMode, title: String) {
        if let Some(state) = self.column_mut(col) {
            state.mode = mode;
            state.title = title;
        }
    }

    fn column_checked(&self, col: usize) -> Result<&ColumnState, PickerError> {
        self.column(col).ok_or(PickerError::ColumnOutOfRange {
            column: col,
            min: self.min_col,
            max: self.max_col(),
        })
    }

    fn column_mut(&mut self, col: usize) -> Option<&mut ColumnState> {
        col.checked_sub(self.min_col)
            .and_then(|index| self.columns.get_mut(index))
    }
}

fn popup_title(id: PopupId) -> String {
    format!("Popup #{id}")
}
