// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::info;

use crate::{
    Bounds, CellCoord, ClickStreak, HeaderError, HeaderGrid, PackedLists, PickerError,
    PickerEvent, PopupId, PopupPicker, Stage, Table,
};

/// Something the pointer can rest on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTarget {
    Cell(CellCoord),
    PopupHeader(usize),
    RowToggle(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    pub click_nags: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    NextStage,
    PrevStage,
    ToggleHeaderRow(usize),
    ClickCell(CellCoord),
    ClickColumn(usize),
    PointerEnter(HoverTarget),
    PointerLeave(HoverTarget),
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StageChanged(Stage),
    HeaderRowToggled { row: usize, header: bool },
    HeaderCellToggled { coord: CellCoord, header: bool },
    HoverChanged(Option<HoverTarget>),
    Picker(PickerEvent),
    Alert(String),
    Submitted(PackedLists),
}

/// All editing state for one table: header flags, popup picker and the bits
/// of pointer state the page rendering needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub stage: Stage,
    headers: HeaderGrid,
    picker: PopupPicker,
    hover: Option<HoverTarget>,
    streak: Option<ClickStreak>,
}

impl Session {
    pub fn new(headers: HeaderGrid, next_id: PopupId, options: SessionOptions) -> Self {
        let bounds = headers.bounds();
        Self {
            stage: Stage::Headers,
            picker: PopupPicker::new(bounds.min_col, bounds.max_col, next_id),
            headers,
            hover: None,
            streak: options.click_nags.then(ClickStreak::default),
        }
    }

    pub fn from_table(table: &Table, next_id: PopupId, options: SessionOptions) -> Self {
        Self::new(HeaderGrid::from_table(table), next_id, options)
    }

    pub fn bounds(&self) -> Bounds {
        self.headers.bounds()
    }

    pub fn headers(&self) -> &HeaderGrid {
        &self.headers
    }

    pub fn picker(&self) -> &PopupPicker {
        &self.picker
    }

    pub fn hover(&self) -> Option<HoverTarget> {
        self.hover
    }

    pub fn restore_headers(&mut self, list: &str) -> Result<usize, HeaderError> {
        self.headers.restore_headers(list)
    }

    pub fn restore_popups(&mut self, list: &str) -> Result<usize, PickerError> {
        self.picker.restore_popups(list)
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Vec<SessionEvent> {
        match command {
            SessionCommand::NextStage => self.rotate_stage(1),
            SessionCommand::PrevStage => self.rotate_stage(-1),
            SessionCommand::ToggleHeaderRow(row) => self
                .headers
                .toggle_header_row(row)
                .map(|header| vec![SessionEvent::HeaderRowToggled { row, header }])
                .unwrap_or_default(),
            SessionCommand::ClickCell(coord) => self.click_cell(coord),
            SessionCommand::ClickColumn(col) => match self.picker.handle_column_click(col) {
                Ok(events) => events.into_iter().map(SessionEvent::Picker).collect(),
                Err(error) => vec![SessionEvent::Alert(error.to_string())],
            },
            SessionCommand::PointerEnter(target) => self.pointer_enter(target),
            SessionCommand::PointerLeave(target) => self.pointer_leave(target),
            SessionCommand::Submit => self.submit(),
        }
    }

    /// Packs both lists. A pick in progress is cancelled first.
    pub fn pack(&mut self) -> (PackedLists, Option<PickerEvent>) {
        let cancelled = match self.picker.start_column() {
            Some(column) if self.picker.is_picking() => {
                Some(PickerEvent::PickCancelled { column })
            }
            _ => None,
        };
        let lists = PackedLists {
            headers: self.headers.pack_headers(),
            popups: self.picker.pack_popups(),
        };
        (lists, cancelled)
    }

    fn submit(&mut self) -> Vec<SessionEvent> {
        let (lists, cancelled) = self.pack();
        info!(
            headers = %lists.headers,
            popups = %lists.popups,
            "packed submission"
        );

        let mut events = Vec::new();
        if let Some(event) = cancelled {
            events.push(SessionEvent::Picker(event));
        }
        events.push(SessionEvent::Submitted(lists));
        events
    }

    fn click_cell(&mut self, coord: CellCoord) -> Vec<SessionEvent> {
        let Some(header) = self.headers.toggle_header_cell(coord) else {
            return Vec::new();
        };

        let mut events = vec![SessionEvent::HeaderCellToggled { coord, header }];
        if let Some(message) = self.streak.as_mut().and_then(|streak| streak.record(coord)) {
            events.push(SessionEvent::Alert(message.to_owned()));
        }
        events
    }

    fn pointer_enter(&mut self, target: HoverTarget) -> Vec<SessionEvent> {
        if self.hover == Some(target) {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(previous) = self.hover {
            events.extend(self.pointer_leave(previous));
        }
        if let HoverTarget::Cell(coord) = target {
            self.headers.set_hot(coord, true);
        }
        self.hover = Some(target);
        events.push(SessionEvent::HoverChanged(self.hover));
        events
    }

    fn pointer_leave(&mut self, target: HoverTarget) -> Vec<SessionEvent> {
        if let HoverTarget::Cell(coord) = target {
            self.headers.set_hot(coord, false);
        }
        if self.hover != Some(target) {
            return Vec::new();
        }
        self.hover = None;
        vec![SessionEvent::HoverChanged(None)]
    }

    fn rotate_stage(&mut self, delta: isize) -> Vec<SessionEvent> {
        let stages = Stage::ALL;
        let current = stages
            .iter()
            .position(|stage| *stage == self.stage)
            .unwrap_or(0) as isize;
        let len = stages.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.stage = stages[next];
        vec![SessionEvent::StageChanged(self.stage)]
    }
}

#[cfg(test)]
mod tests {
    use super::{HoverTarget, Session, SessionCommand, SessionEvent, SessionOptions};
    use crate::{Bounds, CellCoord, HeaderGrid, PackedLists, PickerEvent, PopupId, Stage};

    fn session(rows: usize, cols: usize, options: SessionOptions) -> Session {
        let bounds = Bounds::from_extent(1, 1, rows, cols);
        let coords = bounds
            .rows()
            .flat_map(|row| bounds.columns().map(move |col| CellCoord::new(row, col)))
            .collect::<Vec<_>>();
        Session::new(HeaderGrid::new(bounds, coords), PopupId::FIRST, options)
    }

    #[test]
    fn stage_rotation_wraps() {
        let mut state = session(1, 1, SessionOptions::default());

        assert_eq!(
            state.dispatch(SessionCommand::PrevStage),
            vec![SessionEvent::StageChanged(Stage::Popups)]
        );
        assert_eq!(
            state.dispatch(SessionCommand::NextStage),
            vec![SessionEvent::StageChanged(Stage::Headers)]
        );
    }

    #[test]
    fn submit_packs_both_lists() {
        let mut state = session(2, 4, SessionOptions::default());
        state.dispatch(SessionCommand::ToggleHeaderRow(1));
        state.dispatch(SessionCommand::ClickColumn(2));
        state.dispatch(SessionCommand::ClickColumn(3));

        let events = state.dispatch(SessionCommand::Submit);
        assert_eq!(
            events,
            vec![SessionEvent::Submitted(PackedLists {
                headers: "r1c1;r1c2;r1c3;r1c4;".to_owned(),
                popups: "a2b3;".to_owned(),
            })]
        );
    }

    #[test]
    fn submit_mid_pick_reports_cancellation() {
        let mut state = session(1, 3, SessionOptions::default());
        state.dispatch(SessionCommand::ClickColumn(3));

        let events = state.dispatch(SessionCommand::Submit);
        assert_eq!(
            events,
            vec![
                SessionEvent::Picker(PickerEvent::PickCancelled { column: 3 }),
                SessionEvent::Submitted(PackedLists::default()),
            ]
        );
        assert!(!state.picker().is_picking());
    }

    #[test]
    fn column_click_errors_become_alerts() {
        let mut state = session(1, 2, SessionOptions::default());
        let events = state.dispatch(SessionCommand::ClickColumn(7));
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Alert(message)] if message.contains("column 7")
        ));
    }

    #[test]
    fn cell_click_toggles_and_skips_missing_cells() {
        let mut state = session(1, 2, SessionOptions::default());
        let coord = CellCoord::new(1, 2);

        assert_eq!(
            state.dispatch(SessionCommand::ClickCell(coord)),
            vec![SessionEvent::HeaderCellToggled {
                coord,
                header: true
            }]
        );
        assert!(state.headers().is_header(coord));
        assert!(
            state
                .dispatch(SessionCommand::ClickCell(CellCoord::new(4, 4)))
                .is_empty()
        );
    }

    #[test]
    fn click_nags_only_when_enabled() {
        let coord = CellCoord::new(1, 1);

        let mut quiet = session(1, 1, SessionOptions::default());
        let quiet_alerts = (0..=10)
            .flat_map(|_| quiet.dispatch(SessionCommand::ClickCell(coord)))
            .filter(|event| matches!(event, SessionEvent::Alert(_)))
            .count();
        assert_eq!(quiet_alerts, 0);

        let mut noisy = session(1, 1, SessionOptions { click_nags: true });
        let noisy_alerts = (0..=10)
            .flat_map(|_| noisy.dispatch(SessionCommand::ClickCell(coord)))
            .filter(|event| matches!(event, SessionEvent::Alert(_)))
            .count();
        assert_eq!(noisy_alerts, 1);
    }

    #[test]
    fn pointer_moves_hot_flag_between_cells() {
        let mut state = session(1, 2, SessionOptions::default());
        let first = CellCoord::new(1, 1);
        let second = CellCoord::new(1, 2);

        state.dispatch(SessionCommand::PointerEnter(HoverTarget::Cell(first)));
        assert_eq!(state.headers().flags(first).map(|f| f.hot), Some(true));

        let events = state.dispatch(SessionCommand::PointerEnter(HoverTarget::Cell(second)));
        assert_eq!(
            events,
            vec![
                SessionEvent::HoverChanged(None),
                SessionEvent::HoverChanged(Some(HoverTarget::Cell(second))),
            ]
        );
        assert_eq!(state.headers().flags(first).map(|f| f.hot), Some(false));
        assert_eq!(state.headers().flags(second).map(|f| f.hot), Some(true));

        state.dispatch(SessionCommand::PointerLeave(HoverTarget::Cell(second)));
        assert_eq!(state.hover(), None);
        assert_eq!(state.headers().flags(second).map(|f| f.hot), Some(false));
    }

    #[test]
    fn restores_seed_lists() -> anyhow::Result<()> {
        let mut state = session(2, 3, SessionOptions::default());
        state.restore_headers("r2c2;")?;
        state.restore_popups("a3b1;")?;

        let (lists, cancelled) = state.pack();
        assert_eq!(cancelled, None);
        assert_eq!(lists.headers, "r2c2;");
        assert_eq!(lists.popups, "a3b1;");
        assert_eq!(state.picker().next_id(), Some(PopupId::new(2)));
        Ok(())
    }
}
