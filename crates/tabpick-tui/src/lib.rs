// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table as TableWidget, Tabs};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tabpick_app::{
    ANCHOR_CLASS, BODY_CLASS, CellCoord, ColumnMode, ElementPage, HEADER_CLASS, HOT_CLASS,
    HoverTarget, PackedLists, Page, PickerEvent, RenderOptions, Session,
    SessionCommand, SessionEvent, Stage, Table, popup_header_id, row_toggle_id, store_lists,
    sync_page,
};
use tracing::{debug, info};

const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const MIN_COLUMN_WIDTH: u16 = 6;
const MAX_COLUMN_WIDTH: u16 = 24;
const GUTTER_WIDTH: u16 = 7;

/// How a submission was handed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// Nothing further will arrive for this submission.
    Stored,
    /// A `SubmitFinished` event will follow on the internal channel.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { status: u16 },
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    SubmitFinished(SubmitOutcome),
}

pub trait AppRuntime {
    fn submit(
        &mut self,
        lists: &PackedLists,
        tx: Sender<InternalEvent>,
    ) -> Result<SubmitDisposition>;
}

/// Cursor over the table plus its gutters. A `None` row is the popup header
/// row; a `None` column is the row toggle column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    row: Option<usize>,
    col: Option<usize>,
}

impl Cursor {
    fn target(self) -> Option<HoverTarget> {
        match (self.row, self.col) {
            (Some(row), Some(col)) => Some(HoverTarget::Cell(CellCoord::new(row, col))),
            (None, Some(col)) => Some(HoverTarget::PopupHeader(col)),
            (Some(row), None) => Some(HoverTarget::RowToggle(row)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorMove {
    Row(isize),
    Column(isize),
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    table: Table,
    page: ElementPage,
    render: RenderOptions,
    cursor: Cursor,
    alerts: VecDeque<String>,
    help_visible: bool,
    status: Option<String>,
    status_token: u64,
    last_submission: Option<PackedLists>,
    submit_pending: bool,
}

impl ViewData {
    fn new(session: &Session, table: Table, render: RenderOptions) -> Self {
        let bounds = session.bounds();
        let mut page = ElementPage::for_session(session);
        sync_page(&mut page, session, &render);
        Self {
            table,
            page,
            render,
            cursor: Cursor {
                row: Some(bounds.min_row),
                col: Some(bounds.min_col),
            },
            alerts: VecDeque::new(),
            help_visible: false,
            status: None,
            status_token: 0,
            last_submission: None,
            submit_pending: false,
        }
    }
}

/// Runs the editor until the user quits. Returns the last submitted lists.
pub fn run_app<R: AppRuntime>(
    session: &mut Session,
    table: Table,
    render_options: RenderOptions,
    runtime: &mut R,
) -> Result<Option<PackedLists>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(session, table, render_options);
    let (internal_tx, internal_rx) = mpsc::channel();
    if let Some(target) = view_data.cursor.target() {
        let events = session.dispatch(SessionCommand::PointerEnter(target));
        apply_session_events(session, runtime, &mut view_data, &internal_tx, events);
    }

    let mut result: Result<()> = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(session, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result.map(|()| view_data.last_submission)
}

fn process_internal_events(
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::SubmitFinished(outcome) => {
                view_data.submit_pending = false;
                match outcome {
                    SubmitOutcome::Accepted { status } => {
                        emit_status(view_data, tx, format!("submission accepted ({status})"));
                    }
                    SubmitOutcome::Rejected { reason } => {
                        view_data
                            .alerts
                            .push_back(format!("submission failed: {reason}"));
                    }
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    // Alerts are modal: any key acknowledges the oldest one.
    if view_data.alerts.pop_front().is_some() {
        return false;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    let command = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Esc, _) => return true,
        (KeyCode::Char('?'), _) => {
            view_data.help_visible = true;
            return false;
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            return move_cursor(session, runtime, view_data, internal_tx, CursorMove::Row(1));
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            return move_cursor(session, runtime, view_data, internal_tx, CursorMove::Row(-1));
        }
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => {
            return move_cursor(
                session,
                runtime,
                view_data,
                internal_tx,
                CursorMove::Column(-1),
            );
        }
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => {
            return move_cursor(
                session,
                runtime,
                view_data,
                internal_tx,
                CursorMove::Column(1),
            );
        }
        (KeyCode::Tab, _) => Some(SessionCommand::NextStage),
        (KeyCode::BackTab, _) => Some(SessionCommand::PrevStage),
        (KeyCode::Char(' '), _) | (KeyCode::Enter, _) => activate_command(session, view_data),
        (KeyCode::Char('t'), KeyModifiers::NONE) => {
            view_data.cursor.row.map(SessionCommand::ToggleHeaderRow)
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(SessionCommand::Submit),
        _ => None,
    };

    if let Some(command) = command {
        run_command(session, runtime, view_data, internal_tx, command);
    }
    false
}

fn run_command<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: SessionCommand,
) {
    let events = session.dispatch(command);
    let stage_changed = events
        .iter()
        .any(|event| matches!(event, SessionEvent::StageChanged(_)));
    apply_session_events(session, runtime, view_data, internal_tx, events);
    if stage_changed {
        normalize_cursor(session, runtime, view_data, internal_tx);
    }
}

/// What space/enter does at the cursor on the current stage.
fn activate_command(session: &Session, view_data: &ViewData) -> Option<SessionCommand> {
    match view_data.cursor.target()? {
        HoverTarget::Cell(coord) => Some(match session.stage {
            Stage::Headers => SessionCommand::ClickCell(coord),
            Stage::Popups => SessionCommand::ClickColumn(coord.col),
        }),
        HoverTarget::PopupHeader(col) => Some(SessionCommand::ClickColumn(col)),
        HoverTarget::RowToggle(row) => Some(SessionCommand::ToggleHeaderRow(row)),
    }
}

fn move_cursor<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    movement: CursorMove,
) -> bool {
    let bounds = session.bounds();
    let mut cursor = view_data.cursor;
    match movement {
        CursorMove::Row(delta) => {
            let allow_gutter = session.stage == Stage::Popups && cursor.col.is_some();
            cursor.row = step(cursor.row, delta, bounds.min_row, bounds.max_row, allow_gutter);
        }
        CursorMove::Column(delta) => {
            let allow_gutter = session.stage == Stage::Headers && cursor.row.is_some();
            cursor.col = step(cursor.col, delta, bounds.min_col, bounds.max_col, allow_gutter);
        }
    }
    set_cursor(session, runtime, view_data, internal_tx, cursor);
    false
}

/// Moves one position within `min..=max`, with the gutter (`None`) sitting
/// just before `min` when allowed.
fn step(
    value: Option<usize>,
    delta: isize,
    min: usize,
    max: usize,
    allow_gutter: bool,
) -> Option<usize> {
    let span = max.saturating_sub(min) as isize;
    let position = value.map_or(-1, |value| value.saturating_sub(min) as isize);
    let lowest = if allow_gutter { -1 } else { 0 };
    let next = (position + delta).clamp(lowest, span);
    usize::try_from(next).ok().map(|offset| min + offset)
}

fn normalize_cursor<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let bounds = session.bounds();
    let mut cursor = view_data.cursor;
    match session.stage {
        Stage::Headers if cursor.row.is_none() => cursor.row = Some(bounds.min_row),
        Stage::Popups if cursor.col.is_none() => cursor.col = Some(bounds.min_col),
        _ => {}
    }
    set_cursor(session, runtime, view_data, internal_tx, cursor);
}

fn set_cursor<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    cursor: Cursor,
) {
    if cursor == view_data.cursor {
        return;
    }
    view_data.cursor = cursor;
    if let Some(target) = cursor.target() {
        let events = session.dispatch(SessionCommand::PointerEnter(target));
        apply_session_events(session, runtime, view_data, internal_tx, events);
    }
}

fn apply_session_events<R: AppRuntime>(
    session: &Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<SessionEvent>,
) {
    for event in events {
        match event {
            SessionEvent::Alert(message) => view_data.alerts.push_back(message),
            SessionEvent::Submitted(lists) => {
                submit_lists(runtime, view_data, internal_tx, lists);
            }
            SessionEvent::HoverChanged(_) => {}
            other => {
                if let Some(message) = event_status(&other) {
                    emit_status(view_data, internal_tx, message);
                }
            }
        }
    }
    sync_page(&mut view_data.page, session, &view_data.render);
}

fn submit_lists<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    lists: PackedLists,
) {
    let alerts = store_lists(&mut view_data.page, &lists);
    view_data.alerts.extend(alerts);
    info!(headers = %lists.headers, popups = %lists.popups, "submitting lists");

    match runtime.submit(&lists, internal_tx.clone()) {
        Ok(SubmitDisposition::Stored) => {
            emit_status(view_data, internal_tx, "submitted");
        }
        Ok(SubmitDisposition::Pending) => {
            view_data.submit_pending = true;
            emit_status(view_data, internal_tx, "submitting...");
        }
        Err(error) => {
            debug!(%error, "submit failed");
            view_data
                .alerts
                .push_back(format!("submission failed: {error:#}"));
        }
    }
    view_data.last_submission = Some(lists);
}

fn event_status(event: &SessionEvent) -> Option<String> {
    let message = match event {
        SessionEvent::StageChanged(stage) => format!("{} stage", stage.label()),
        SessionEvent::HeaderRowToggled { row, header: true } => format!("row {row} marked as header"),
        SessionEvent::HeaderRowToggled { row, header: false } => {
            format!("row {row} headers cleared")
        }
        SessionEvent::HeaderCellToggled { coord, header } => {
            let state = if *header { "header" } else { "data" };
            format!("{coord} is now {state}")
        }
        SessionEvent::Picker(PickerEvent::PickStarted { column, id }) => {
            format!("popup #{id} anchored at column {column}; pick its body column")
        }
        SessionEvent::Picker(PickerEvent::PickCancelled { column }) => {
            format!("popup pick from column {column} cancelled")
        }
        SessionEvent::Picker(PickerEvent::PopupCreated { id, anchor, body }) => {
            format!("popup #{id}: anchor column {anchor}, body column {body}")
        }
        SessionEvent::Picker(PickerEvent::PopupCleared { id, .. }) => {
            format!("popup #{id} removed")
        }
        SessionEvent::HoverChanged(_) | SessionEvent::Alert(_) | SessionEvent::Submitted(_) => {
            return None;
        }
    };
    Some(message)
}

fn render(frame: &mut ratatui::Frame<'_>, session: &Session, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = Stage::ALL
        .iter()
        .position(|stage| *stage == session.stage)
        .unwrap_or(0);
    let tabs = Tabs::new(Stage::ALL.iter().map(|stage| stage.label()).collect::<Vec<_>>())
        .block(Block::default().title("tabpick").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_table(frame, layout[1], session, view_data);

    let status = Paragraph::new(status_text(session, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(alert) = view_data.alerts.front() {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(format!("{alert}\n\n(press any key)")).block(
            Block::default()
                .title("alert")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(popup, area);
    } else if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, session: &Session, view_data: &ViewData) {
    let bounds = session.bounds();
    let columns = bounds.columns().collect::<Vec<_>>();

    let mut widths = vec![Constraint::Length(GUTTER_WIDTH)];
    widths.extend(
        columns
            .iter()
            .map(|col| Constraint::Length(column_width(&view_data.table, bounds.rows(), *col))),
    );

    let gutter_header = Cell::from(String::new());
    let header_cells = columns.iter().map(|col| {
        let (label, hovered) = column_header_label(session, &view_data.page, *col);
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if hovered {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(label).style(style)
    });
    let header = Row::new(std::iter::once(gutter_header).chain(header_cells));

    let rows = bounds.rows().map(|row| {
        let (toggle_label, toggle_hovered) = row_toggle_label(&view_data.page, row);
        let mut toggle_style = Style::default().fg(Color::DarkGray);
        if toggle_hovered {
            toggle_style = toggle_style.fg(Color::White).add_modifier(Modifier::REVERSED);
        }
        let toggle = Cell::from(toggle_label).style(toggle_style);

        let cells = columns.iter().map(move |col| {
            let coord = CellCoord::new(row, *col);
            let text = view_data.table.cell(coord).unwrap_or_default().to_owned();
            Cell::from(text).style(cell_style(&view_data.page, coord))
        });
        Row::new(std::iter::once(toggle).chain(cells))
    });

    let table = TableWidget::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(session))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn column_width(
    table: &Table,
    rows: std::ops::RangeInclusive<usize>,
    col: usize,
) -> u16 {
    let widest = rows
        .filter_map(|row| table.cell(CellCoord::new(row, col)))
        .map(|text| text.chars().count())
        .max()
        .unwrap_or(0);
    u16::try_from(widest)
        .unwrap_or(MAX_COLUMN_WIDTH)
        .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

fn cell_style(page: &ElementPage, coord: CellCoord) -> Style {
    let id = coord.element_id();
    let mut style = Style::default();
    if page.has_class(&id, ANCHOR_CLASS) {
        style = style.bg(Color::Blue);
    }
    if page.has_class(&id, BODY_CLASS) {
        style = style.bg(Color::Magenta);
    }
    if page.has_class(&id, HEADER_CLASS) {
        style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
    }
    if page.has_class(&id, HOT_CLASS) {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

/// Header label for a column: its number on the headers stage, the picker
/// icon on the popups stage. The flag reports the `_over` icon.
fn column_header_label(session: &Session, page: &ElementPage, col: usize) -> (String, bool) {
    if session.stage == Stage::Headers {
        return (format!("c{col}"), false);
    }

    let id = popup_header_id(col);
    let src = page.attribute(&id, "src").unwrap_or_default();
    let (mode, hovered) = icon_mode(&src);
    let glyph = match mode {
        Some(ColumnMode::Anchor) => "anchor",
        Some(ColumnMode::Body) => "body",
        Some(ColumnMode::AnchorAdd) => "+anchor",
        Some(ColumnMode::BodyAdd) => "+body",
        None => "?",
    };
    let title = page.attribute(&id, "title").unwrap_or_default();
    let label = match title.strip_prefix("Popup ") {
        Some(number) => format!("{glyph} {number}"),
        None => glyph.to_owned(),
    };
    (label, hovered)
}

fn row_toggle_label(page: &ElementPage, row: usize) -> (String, bool) {
    let src = page
        .attribute(&row_toggle_id(row), "src")
        .unwrap_or_default();
    let hovered = file_stem(&src).ends_with("_over");
    (format!("r{row} ⇄"), hovered)
}

/// Column mode named by an icon source, and whether it is the `_over` variant.
fn icon_mode(src: &str) -> (Option<ColumnMode>, bool) {
    let stem = file_stem(src);
    match stem.strip_suffix("_over") {
        Some(name) => (ColumnMode::parse(name), true),
        None => (ColumnMode::parse(stem), false),
    }
}

fn file_stem(src: &str) -> &str {
    let name = src.rsplit('/').next().unwrap_or(src);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

fn table_title(session: &Session) -> String {
    let picker = session.picker();
    let popups = picker.complete_pairs().len();
    let headers = session.headers().header_cells().count();
    let next = match picker.next_id() {
        Some(id) => format!("next popup #{id}"),
        None => "no popup ids left".to_owned(),
    };
    format!("{headers} header cells | {popups} popups | {next}")
}

fn status_text(session: &Session, view_data: &ViewData) -> String {
    if let Some(status) = &view_data.status {
        return status.clone();
    }

    let picker = session.picker();
    let mode = picker.pick_mode().as_str();
    let pick = match picker.start_column() {
        Some(column) if picker.is_picking() => format!("pick: {mode} (anchor c{column})"),
        _ => format!("pick: {mode}"),
    };
    let pending = if view_data.submit_pending {
        " | submitting"
    } else {
        ""
    };
    format!("h/j/k/l move | space click | t row | tab stage | s submit | ? help | q quit | {pick}{pending}")
}

fn help_overlay_text() -> &'static str {
    "h/j/k/l, arrows   move (the pointer follows the cursor)\n\
     space, enter      click: toggle cell header / pick popup column\n\
     t                 toggle header status of the cursor row\n\
     tab, shift+tab    switch between headers and popups stages\n\
     s                 pack hlist/plist and submit\n\
     ?                 toggle this help\n\
     q, esc, ctrl+q    quit\n\
     \n\
     popups: click a +anchor column, then a +body column.\n\
     clicking an anchor or body column removes its popup;\n\
     clicking anything else mid-pick cancels the pick."
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, Cursor, InternalEvent, SubmitDisposition, SubmitOutcome, ViewData,
        activate_command, column_header_label, file_stem, handle_key_event, icon_mode,
        process_internal_events, row_toggle_label, status_text, step, table_title,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc;
    use tabpick_app::{
        ColumnMode, HEADER_CLASS, HOT_CLASS, HoverTarget, PackedLists, Page, PopupId,
        RenderOptions, Session, SessionCommand, SessionOptions, Stage,
    };
    use tabpick_testkit::{grid_table, session};

    #[derive(Debug, Default)]
    struct TestRuntime {
        submitted: Vec<PackedLists>,
        pending: bool,
        fail_with: Option<String>,
    }

    impl AppRuntime for TestRuntime {
        fn submit(
            &mut self,
            lists: &PackedLists,
            _tx: mpsc::Sender<InternalEvent>,
        ) -> Result<SubmitDisposition> {
            if let Some(message) = &self.fail_with {
                return Err(anyhow!("{message}"));
            }
            self.submitted.push(lists.clone());
            Ok(if self.pending {
                SubmitDisposition::Pending
            } else {
                SubmitDisposition::Stored
            })
        }
    }

    fn fixture(rows: usize, cols: usize) -> (Session, ViewData) {
        let state = session(rows, cols);
        let view_data = ViewData::new(&state, grid_table(rows, cols), RenderOptions::default());
        (state, view_data)
    }

    fn internal_tx() -> mpsc::Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn press(
        state: &mut Session,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    #[test]
    fn step_clamps_and_enters_gutter_only_when_allowed() {
        assert_eq!(step(Some(1), -1, 1, 4, false), Some(1));
        assert_eq!(step(Some(1), -1, 1, 4, true), None);
        assert_eq!(step(None, 1, 1, 4, true), Some(1));
        assert_eq!(step(Some(4), 1, 1, 4, true), Some(4));
        assert_eq!(step(Some(2), 1, 1, 4, false), Some(3));
    }

    #[test]
    fn space_on_headers_stage_toggles_cell_under_cursor() {
        let (mut state, mut view_data) = fixture(2, 2);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(' '));

        assert!(view_data.page.has_class("r1c2", HEADER_CLASS));
        assert!(view_data.page.has_class("r1c2", HOT_CLASS));
        assert!(!view_data.page.has_class("r1c1", HOT_CLASS));
        assert_eq!(view_data.status.as_deref(), Some("r1c2 is now header"));
    }

    #[test]
    fn left_of_first_column_focuses_row_toggle() {
        let (mut state, mut view_data) = fixture(2, 3);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Down);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Left);
        assert_eq!(view_data.cursor.target(), Some(HoverTarget::RowToggle(2)));
        assert!(row_toggle_label(&view_data.page, 2).1);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(state.pack().0.headers, "r2c1;r2c2;r2c3;");
    }

    #[test]
    fn popups_stage_picks_anchor_then_body() {
        let (mut state, mut view_data) = fixture(2, 4);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert_eq!(state.stage, Stage::Popups);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(' '));
        assert!(status_text(&state, &view_data).contains("anchored at column 2"));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Up);
        assert_eq!(view_data.cursor.target(), Some(HoverTarget::PopupHeader(2)));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        assert_eq!(
            column_header_label(&state, &view_data.page, 3),
            ("+body".to_owned(), true)
        );
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(
            column_header_label(&state, &view_data.page, 2),
            ("anchor #1".to_owned(), false)
        );
        assert_eq!(
            column_header_label(&state, &view_data.page, 3),
            ("body #1".to_owned(), true)
        );
        assert_eq!(state.pack().0.popups, "a2b3;");
    }

    #[test]
    fn stage_switch_moves_cursor_out_of_foreign_gutter() {
        let (mut state, mut view_data) = fixture(2, 2);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Left);
        assert_eq!(view_data.cursor, Cursor { row: Some(1), col: None });
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert_eq!(
            view_data.cursor,
            Cursor {
                row: Some(1),
                col: Some(1)
            }
        );
        assert_eq!(
            activate_command(&state, &view_data),
            Some(SessionCommand::ClickColumn(1))
        );
    }

    #[test]
    fn submit_writes_hidden_fields_and_records_lists() {
        let (mut state, mut view_data) = fixture(1, 3);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('t'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));

        let expected = PackedLists {
            headers: "r1c1;r1c2;r1c3;".to_owned(),
            popups: String::new(),
        };
        assert_eq!(runtime.submitted, vec![expected.clone()]);
        assert_eq!(view_data.last_submission, Some(expected));
        assert_eq!(
            view_data.page.attribute("hlist", "value").as_deref(),
            Some("r1c1;r1c2;r1c3;")
        );
        assert_eq!(view_data.status.as_deref(), Some("submitted"));
    }

    #[test]
    fn missing_hidden_field_raises_alert_but_still_submits() {
        let (mut state, mut view_data) = fixture(1, 1);
        let mut runtime = TestRuntime::default();
        view_data.page.remove("plist");

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert_eq!(runtime.submitted.len(), 1);
        assert_eq!(
            view_data.alerts.front().map(String::as_str),
            Some("Missing popup list element!")
        );

        assert!(!press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('q')));
        assert!(view_data.alerts.is_empty());
        assert!(press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('q')));
    }

    #[test]
    fn runtime_failure_becomes_alert() {
        let (mut state, mut view_data) = fixture(1, 1);
        let mut runtime = TestRuntime {
            fail_with: Some("disk full".to_owned()),
            ..TestRuntime::default()
        };

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert_eq!(
            view_data.alerts.front().map(String::as_str),
            Some("submission failed: disk full")
        );
    }

    #[test]
    fn pending_submission_resolves_from_internal_event() {
        let (mut state, mut view_data) = fixture(1, 1);
        let mut runtime = TestRuntime {
            pending: true,
            ..TestRuntime::default()
        };
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert!(view_data.submit_pending);

        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::SubmitFinished(SubmitOutcome::Rejected {
            reason: "server returned 500".to_owned(),
        }))
        .expect("send event");
        process_internal_events(&mut view_data, &tx, &rx);

        assert!(!view_data.submit_pending);
        assert_eq!(
            view_data.alerts.front().map(String::as_str),
            Some("submission failed: server returned 500")
        );
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let (_state, mut view_data) = fixture(1, 1);
        view_data.status = Some("hello".to_owned());
        view_data.status_token = 2;

        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::ClearStatus { token: 1 })
            .expect("send event");
        process_internal_events(&mut view_data, &tx, &rx);
        assert_eq!(view_data.status.as_deref(), Some("hello"));

        tx.send(InternalEvent::ClearStatus { token: 2 })
            .expect("send event");
        process_internal_events(&mut view_data, &tx, &rx);
        assert_eq!(view_data.status, None);
    }

    #[test]
    fn status_and_title_describe_picker() {
        let (mut state, view_data) = fixture(1, 3);
        assert!(status_text(&state, &view_data).ends_with("pick: anchor"));
        assert!(table_title(&state).ends_with("next popup #1"));

        state.dispatch(SessionCommand::ClickColumn(2));
        assert!(status_text(&state, &view_data).ends_with("pick: body (anchor c2)"));

        let mut last = Session::from_table(
            &grid_table(1, 2),
            PopupId::new(u32::MAX),
            SessionOptions::default(),
        );
        last.dispatch(SessionCommand::ClickColumn(1));
        last.dispatch(SessionCommand::ClickColumn(2));
        assert!(table_title(&last).ends_with("no popup ids left"));
    }

    #[test]
    fn icon_sources_decode_to_modes() {
        assert_eq!(
            icon_mode("templates/default/images/icons/anchor_add_over.png"),
            (Some(ColumnMode::AnchorAdd), true)
        );
        assert_eq!(icon_mode("icons/body.png"), (Some(ColumnMode::Body), false));
        assert_eq!(icon_mode(""), (None, false));
        assert_eq!(file_stem("a.b/c.d.png"), "c.d");
    }

    #[test]
    fn help_toggles_and_blocks_other_keys() {
        let (mut state, mut view_data) = fixture(1, 2);
        let mut runtime = TestRuntime::default();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('?'));
        assert!(view_data.help_visible);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(' '));
        assert!(!view_data.page.has_class("r1c1", HEADER_CLASS));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);
        assert!(!view_data.help_visible);
    }
}
