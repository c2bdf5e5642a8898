// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use chatfold_app::{
    AccountId, ChatItem, DropHighlight, Folder, FolderContainerView, FolderEditor, FolderFilter,
    FolderMutation, Gesture, MutationOutcome, OrganizerCommand, OrganizerEvent, OrganizerState,
    Point, PointerButton, SlotKind,
};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const IDLE_POLL: Duration = Duration::from_millis(120);
const STATUS_TTL: Duration = Duration::from_secs(4);
const WHEEL_STEP: i32 = 3;

/// Backend the shell loads from and sends folder mutations to.
pub trait OrganizerRuntime {
    fn load_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>>;
    fn load_folders(&mut self, account: AccountId) -> Result<Vec<Folder>>;
    fn apply_mutation(
        &mut self,
        account: AccountId,
        mutation: &FolderMutation,
    ) -> Result<MutationOutcome>;

    /// Runs `mutation` and reports its result on `tx`. The default runs it
    /// inline; runtimes backed by slow services hand it to a worker.
    fn spawn_mutation(
        &mut self,
        request_id: u64,
        account: AccountId,
        mutation: FolderMutation,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .apply_mutation(account, &mutation)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::MutationFinished { request_id, result })
            .map_err(|_| anyhow!("mutation event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    MutationFinished {
        request_id: u64,
        result: Result<MutationOutcome, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ScreenLayout {
    folder_bar: Rect,
    folder_inner: Rect,
    chat_list: Rect,
    chat_inner: Rect,
    status: Rect,
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    layout: Option<ScreenLayout>,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Reload,
    Command(OrganizerCommand),
    Ignore,
}

pub fn run_app<R: OrganizerRuntime>(state: &mut OrganizerState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    reload(state, runtime, &mut view_data, &internal_tx);

    let result = event_loop(
        &mut terminal,
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        &internal_rx,
    );

    state.dispatch(OrganizerCommand::Teardown);
    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn event_loop<B: Backend, R: OrganizerRuntime>(
    terminal: &mut Terminal<B>,
    state: &mut OrganizerState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) -> Result<()> {
    loop {
        process_internal_events(state, runtime, view_data, internal_tx, internal_rx);

        let size = terminal.size().context("read terminal size")?;
        if let Some(command) = sync_layout(view_data, Rect::new(0, 0, size.width, size.height)) {
            apply_command(state, runtime, view_data, internal_tx, command);
        }
        let layout = view_data.layout.unwrap_or_default();
        terminal
            .draw(|frame| render(frame, state, &layout))
            .context("draw frame")?;

        if event::poll(poll_timeout(state, Instant::now())).context("poll event")? {
            match event::read().context("read event")? {
                Event::Key(key) => match key_action(state, key) {
                    KeyAction::Quit => return Ok(()),
                    KeyAction::Reload => reload(state, runtime, view_data, internal_tx),
                    KeyAction::Command(command) => {
                        apply_command(state, runtime, view_data, internal_tx, command);
                    }
                    KeyAction::Ignore => {}
                },
                Event::Mouse(mouse) => {
                    if let Some(command) = mouse_command(mouse, Instant::now()) {
                        apply_command(state, runtime, view_data, internal_tx, command);
                    }
                }
                _ => {}
            }
        }

        apply_command(
            state,
            runtime,
            view_data,
            internal_tx,
            OrganizerCommand::Tick {
                now: Instant::now(),
            },
        );
    }
}

fn poll_timeout(state: &OrganizerState, now: Instant) -> Duration {
    if let Some(deadline) = state.selection().next_deadline() {
        return deadline.saturating_duration_since(now);
    }
    if state.is_autoscrolling() {
        return state.selection().config().scroll.interval;
    }
    IDLE_POLL
}

fn process_internal_events<R: OrganizerRuntime>(
    state: &mut OrganizerState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(OrganizerCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::MutationFinished { request_id, result } => {
                apply_command(
                    state,
                    runtime,
                    view_data,
                    tx,
                    OrganizerCommand::MutationFinished { request_id, result },
                );
            }
        }
    }
}

fn apply_command<R: OrganizerRuntime>(
    state: &mut OrganizerState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: OrganizerCommand,
) {
    let events = state.dispatch(command);
    handle_events(state, runtime, view_data, tx, events);
}

fn handle_events<R: OrganizerRuntime>(
    state: &mut OrganizerState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<OrganizerEvent>,
) {
    for event in events {
        match event {
            OrganizerEvent::MutationRequested {
                request_id,
                mutation,
            } => {
                let account = state.account;
                let spawned = runtime.spawn_mutation(request_id, account, mutation, tx.clone());
                if let Err(error) = spawned {
                    apply_command(
                        state,
                        runtime,
                        view_data,
                        tx,
                        OrganizerCommand::MutationFinished {
                            request_id,
                            result: Err(format!("{error:#}")),
                        },
                    );
                }
            }
            OrganizerEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(tx, view_data.status_token);
            }
            OrganizerEvent::ConfirmationRequested(confirmation) => {
                tracing::debug!(prompt = %confirmation.prompt(), "confirmation requested");
            }
            _ => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn reload<R: OrganizerRuntime>(
    state: &mut OrganizerState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match load_snapshot(runtime, state.account) {
        Ok((chats, folders)) => {
            tracing::info!(chats = chats.len(), folders = folders.len(), "organizer loaded");
            apply_command(state, runtime, view_data, tx, OrganizerCommand::ReplaceChats(chats));
            apply_command(
                state,
                runtime,
                view_data,
                tx,
                OrganizerCommand::ReplaceFolders(folders),
            );
        }
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "load failed");
            apply_command(
                state,
                runtime,
                view_data,
                tx,
                OrganizerCommand::SetStatus(format!("load failed: {error:#}")),
            );
        }
    }
}

fn load_snapshot<R: OrganizerRuntime>(
    runtime: &mut R,
    account: AccountId,
) -> Result<(Vec<ChatItem>, Vec<Folder>)> {
    let chats = runtime.load_chats(account).context("load chats")?;
    let folders = runtime.load_folders(account).context("load folders")?;
    Ok((chats, folders))
}

fn sync_layout(view_data: &mut ViewData, area: Rect) -> Option<OrganizerCommand> {
    let layout = screen_layout(area);
    if view_data.layout == Some(layout) {
        return None;
    }
    view_data.layout = Some(layout);
    Some(OrganizerCommand::Resize {
        folders: app_rect(layout.folder_inner),
        chats: app_rect(layout.chat_inner),
    })
}

fn screen_layout(area: Rect) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    let frame = Block::default().borders(Borders::ALL);
    ScreenLayout {
        folder_bar: rows[0],
        folder_inner: frame.inner(rows[0]),
        chat_list: rows[1],
        chat_inner: frame.inner(rows[1]),
        status: rows[2],
    }
}

fn app_rect(area: Rect) -> chatfold_app::Rect {
    chatfold_app::Rect::new(
        i32::from(area.x),
        i32::from(area.y),
        i32::from(area.width),
        i32::from(area.height),
    )
}

fn mouse_command(event: MouseEvent, now: Instant) -> Option<OrganizerCommand> {
    let point = Point::new(i32::from(event.column), i32::from(event.row));
    let modifier = event
        .modifiers
        .intersects(KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT);

    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(OrganizerCommand::PointerDown {
            point,
            button: PointerButton::Primary,
            modifier,
        }),
        MouseEventKind::Down(MouseButton::Right) => Some(OrganizerCommand::PointerDown {
            point,
            button: PointerButton::Secondary,
            modifier,
        }),
        MouseEventKind::Drag(MouseButton::Left) => Some(OrganizerCommand::PointerMove {
            point,
            modifier,
            now,
        }),
        MouseEventKind::Up(MouseButton::Left) => Some(OrganizerCommand::PointerUp { point, now }),
        MouseEventKind::ScrollDown | MouseEventKind::ScrollRight => {
            Some(OrganizerCommand::Wheel {
                point,
                delta: WHEEL_STEP,
            })
        }
        MouseEventKind::ScrollUp | MouseEventKind::ScrollLeft => Some(OrganizerCommand::Wheel {
            point,
            delta: -WHEEL_STEP,
        }),
        _ => None,
    }
}

fn key_action(state: &OrganizerState, key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    if state.pending_confirmation().is_some() {
        return match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                KeyAction::Command(OrganizerCommand::Confirm(true))
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                KeyAction::Command(OrganizerCommand::Confirm(false))
            }
            _ => KeyAction::Ignore,
        };
    }

    if state.folders().editor().is_some() {
        return match key.code {
            KeyCode::Enter => KeyAction::Command(OrganizerCommand::EditorSubmit),
            KeyCode::Esc => KeyAction::Command(OrganizerCommand::EditorCancel),
            KeyCode::Backspace => KeyAction::Command(OrganizerCommand::EditorBackspace),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                KeyAction::Command(OrganizerCommand::EditorInput(ch))
            }
            _ => KeyAction::Ignore,
        };
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('q') => KeyAction::Quit,
            _ => KeyAction::Ignore,
        };
    }

    match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('g') | KeyCode::F(5) => KeyAction::Reload,
        KeyCode::Char('n') => KeyAction::Command(OrganizerCommand::BeginCreateFolder),
        KeyCode::Char('r') => KeyAction::Command(OrganizerCommand::BeginRenameActive),
        KeyCode::Char('d') => KeyAction::Command(OrganizerCommand::RequestDeleteActive),
        KeyCode::Tab => KeyAction::Command(OrganizerCommand::CycleFolder { forward: true }),
        KeyCode::BackTab => KeyAction::Command(OrganizerCommand::CycleFolder { forward: false }),
        KeyCode::Esc => KeyAction::Command(OrganizerCommand::ClearSelection),
        _ => KeyAction::Ignore,
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &OrganizerState, layout: &ScreenLayout) {
    let folders = Paragraph::new(folder_bar_line(state.folders()))
        .scroll((0, to_cells(state.folders().scroll_offset())))
        .block(Block::default().title("folders").borders(Borders::ALL));
    frame.render_widget(folders, layout.folder_bar);

    let chats = Paragraph::new(chat_lines(state))
        .scroll((to_cells(state.chats().scroll_offset()), 0))
        .block(
            Block::default()
                .title(chat_list_title(state))
                .borders(Borders::ALL),
        );
    frame.render_widget(chats, layout.chat_list);

    if let Some(area) = marquee_area(state) {
        let marquee = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        frame.render_widget(marquee, area);
    }

    let status = Paragraph::new(status_text(state)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout.status);

    if let Some(confirmation) = state.pending_confirmation() {
        let area = centered_rect(50, 30, frame.area());
        frame.render_widget(Clear, area);
        let modal = Paragraph::new(format!("{}\n\n[y] yes   [n] no", confirmation.prompt()))
            .block(
                Block::default()
                    .title("confirm")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(modal, area);
    }
}

fn to_cells(offset: i32) -> u16 {
    u16::try_from(offset.max(0)).unwrap_or(u16::MAX)
}

fn folder_bar_line(folders: &FolderContainerView) -> Line<'static> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for slot in folders.layout() {
        if slot.left > cursor {
            let gap = usize::try_from(slot.left - cursor).unwrap_or(0);
            spans.push(Span::raw(" ".repeat(gap)));
        }
        cursor = slot.left + slot.width;
        spans.push(Span::styled(slot.label, slot_style(folders, slot.kind)));
    }
    Line::from(spans)
}

fn slot_style(folders: &FolderContainerView, kind: SlotKind) -> Style {
    match kind {
        SlotKind::Chip(filter) => {
            let renaming = match folders.editor() {
                Some(FolderEditor::Renaming { folder, .. }) => {
                    FolderFilter::Folder(*folder) == filter
                }
                _ => false,
            };
            match folders.highlight(filter) {
                Some(DropHighlight::Add) => Style::default().fg(Color::Black).bg(Color::Green),
                Some(DropHighlight::Remove) => Style::default().fg(Color::White).bg(Color::Red),
                None if renaming => Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::UNDERLINED),
                None if filter == folders.active() => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                None => Style::default(),
            }
        }
        SlotKind::Editor => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::UNDERLINED),
        SlotKind::NewFolder => Style::default().fg(Color::DarkGray),
    }
}

fn chat_lines(state: &OrganizerState) -> Vec<Line<'static>> {
    let list = state.chats();
    let gutter = " ".repeat(usize::try_from(list.gutter()).unwrap_or(0));
    let padding = usize::try_from(list.row_height() - 1).unwrap_or(0);

    let mut lines = Vec::with_capacity(list.row_count());
    for chat in list.rows() {
        let label_style = if state.selected_ids().contains(&chat.id) {
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(gutter.clone()),
            Span::styled(format!("{}{}", badge(chat), chat.title()), label_style),
            Span::styled(
                format!("  {}", chat.subtitle()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.extend((0..padding).map(|_| Line::default()));
    }

    if lines.is_empty() {
        lines.push(Line::styled(
            format!("{gutter}no chats here"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines
}

fn badge(chat: &ChatItem) -> String {
    let initials = chat.initials().chars().take(2).collect::<String>();
    format!("{initials:<2} ")
}

fn chat_list_title(state: &OrganizerState) -> String {
    let folders = state.folders();
    let scope = match folders.active_folder() {
        Some(folder) => format!("chats in {}", folder.title),
        None => "chats".to_owned(),
    };
    let selected = state.selected_ids().len();
    if selected == 0 {
        format!("{scope} ({})", state.chats().row_count())
    } else {
        format!(
            "{scope} ({}) - {selected} selected",
            state.chats().row_count()
        )
    }
}

fn marquee_area(state: &OrganizerState) -> Option<Rect> {
    let chats = state.chats();
    let area = state
        .selection()
        .marquee_rect(chats)?
        .intersection(&chats.viewport())?;
    Some(Rect::new(
        u16::try_from(area.left).ok()?,
        u16::try_from(area.top).ok()?,
        u16::try_from(area.width()).ok()?,
        u16::try_from(area.height()).ok()?,
    ))
}

fn status_text(state: &OrganizerState) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    if let Gesture::Dragging(drag) = state.selection().gesture() {
        let count = drag.payload().len();
        let noun = if count == 1 { "chat" } else { "chats" };
        return if state.folders().active_folder().is_some() {
            format!("dragging {count} {noun} -- release on a folder to add, or on All to remove")
        } else {
            format!("dragging {count} {noun} -- release on a folder to add")
        };
    }
    if state.folders().editor().is_some() {
        return "enter save | esc cancel".to_owned();
    }
    "q quit | n new folder | r rename | d delete | tab next folder | esc clear selection"
        .to_owned()
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
