// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::{
    AccountId, AutoScrollConfig, ChatId, ChatItem, ChatListView, ChipHit, Confirmation,
    DragClassifier, DragContext, DropEffect, Folder, FolderContainerView, FolderFilter,
    FolderMutation, GestureConfig, MutationOutcome, Point, Rect, SelectionController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizerConfig {
    pub gesture: GestureConfig,
    pub folder_scroll: AutoScrollConfig,
    pub row_height: i32,
    pub gutter: i32,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            folder_scroll: AutoScrollConfig::default(),
            row_height: 1,
            gutter: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizerCommand {
    ReplaceChats(Vec<ChatItem>),
    ReplaceFolders(Vec<Folder>),
    Resize {
        folders: Rect,
        chats: Rect,
    },
    SelectFolder(FolderFilter),
    CycleFolder {
        forward: bool,
    },
    PointerDown {
        point: Point,
        button: PointerButton,
        modifier: bool,
    },
    PointerMove {
        point: Point,
        modifier: bool,
        now: Instant,
    },
    PointerUp {
        point: Point,
        now: Instant,
    },
    Wheel {
        point: Point,
        delta: i32,
    },
    Tick {
        now: Instant,
    },
    ClearSelection,
    BeginCreateFolder,
    BeginRenameActive,
    RequestDeleteActive,
    EditorInput(char),
    EditorBackspace,
    EditorSubmit,
    EditorCancel,
    Confirm(bool),
    MutationFinished {
        request_id: u64,
        result: Result<MutationOutcome, String>,
    },
    SetStatus(String),
    ClearStatus,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizerEvent {
    SelectionChanged(usize),
    FilterChanged(FolderFilter),
    FoldersChanged,
    DragStarted(usize),
    DragEnded,
    MutationRequested {
        request_id: u64,
        mutation: FolderMutation,
    },
    ConfirmationRequested(Confirmation),
    StatusUpdated(String),
    StatusCleared,
    Scrolled,
}

/// Press on a row label that is either a click or the start of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowPress {
    row: ChatId,
    origin: Point,
    modifier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerState {
    pub account: AccountId,
    pub status_line: Option<String>,
    selection: SelectionController,
    classifier: DragClassifier,
    folders: FolderContainerView,
    chats: ChatListView,
    press: Option<RowPress>,
    confirmation: Option<Confirmation>,
    in_flight: BTreeMap<u64, FolderMutation>,
    next_request: u64,
}

impl OrganizerState {
    pub fn new(account: AccountId, config: OrganizerConfig) -> Self {
        let context = DragContext::new();
        Self {
            account,
            status_line: None,
            selection: SelectionController::new(config.gesture),
            classifier: DragClassifier::new(context.clone()),
            folders: FolderContainerView::with_autoscroll(context, config.folder_scroll),
            chats: ChatListView::new(config.row_height, config.gutter),
            press: None,
            confirmation: None,
            in_flight: BTreeMap::new(),
            next_request: 1,
        }
    }

    pub fn selected_ids(&self) -> &BTreeSet<ChatId> {
        self.selection.selection().ids()
    }

    pub fn drag_in_progress(&self) -> bool {
        self.classifier.context().is_active()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn folders(&self) -> &FolderContainerView {
        &self.folders
    }

    pub fn chats(&self) -> &ChatListView {
        &self.chats
    }

    pub fn pending_confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.selection.is_autoscrolling() || self.folders.is_autoscrolling()
    }

    pub fn dispatch(&mut self, command: OrganizerCommand) -> Vec<OrganizerEvent> {
        match command {
            OrganizerCommand::ReplaceChats(chats) => {
                let before = self.row_order();
                self.chats.set_chats(chats);
                self.chats.apply_filter(self.folders.active_folder());
                self.rows_changed(&before)
            }
            OrganizerCommand::ReplaceFolders(folders) => {
                let fell_back = self.folders.set_folders(folders);
                let mut events = vec![OrganizerEvent::FoldersChanged];
                events.extend(self.after_folder_change(fell_back));
                events
            }
            OrganizerCommand::Resize { folders, chats } => {
                self.folders.set_viewport(folders);
                self.chats.set_viewport(chats);
                let changed = self.selection.refresh(&self.chats);
                self.selection_event(changed)
            }
            OrganizerCommand::SelectFolder(filter) => self.select_folder(filter),
            OrganizerCommand::CycleFolder { forward } => {
                self.select_folder(self.folders.cycled(forward))
            }
            OrganizerCommand::PointerDown {
                point,
                button,
                modifier,
            } => self.pointer_down(point, button, modifier),
            OrganizerCommand::PointerMove {
                point,
                modifier,
                now,
            } => self.pointer_move(point, modifier, now),
            OrganizerCommand::PointerUp { point, now } => self.pointer_up(point, now),
            OrganizerCommand::Wheel { point, delta } => self.wheel(point, delta),
            OrganizerCommand::Tick { now } => self.tick(now),
            OrganizerCommand::ClearSelection => {
                let changed = self.selection.clear_selection();
                self.selection_event(changed)
            }
            OrganizerCommand::BeginCreateFolder => {
                self.folders.begin_create();
                Vec::new()
            }
            OrganizerCommand::BeginRenameActive => {
                if self.folders.begin_rename(self.folders.active()) {
                    Vec::new()
                } else {
                    vec![self.set_status("pick a folder to rename")]
                }
            }
            OrganizerCommand::RequestDeleteActive => {
                match self.folders.request_delete(self.folders.active()) {
                    Some(confirmation) => self.ask(confirmation),
                    None => vec![self.set_status("pick a folder to delete")],
                }
            }
            OrganizerCommand::EditorInput(ch) => {
                self.folders.input_char(ch);
                Vec::new()
            }
            OrganizerCommand::EditorBackspace => {
                self.folders.backspace();
                Vec::new()
            }
            OrganizerCommand::EditorSubmit => match self.folders.submit() {
                Some(mutation) => vec![self.request(mutation)],
                None => Vec::new(),
            },
            OrganizerCommand::EditorCancel => {
                self.folders.cancel();
                Vec::new()
            }
            OrganizerCommand::Confirm(accepted) => match self.confirmation.take() {
                Some(confirmation) if accepted => vec![self.request(confirmation.mutation())],
                Some(confirmation) => {
                    tracing::debug!(prompt = %confirmation.prompt(), "confirmation declined");
                    Vec::new()
                }
                None => Vec::new(),
            },
            OrganizerCommand::MutationFinished { request_id, result } => {
                self.mutation_finished(request_id, result)
            }
            OrganizerCommand::SetStatus(message) => vec![self.set_status(&message)],
            OrganizerCommand::ClearStatus => {
                self.status_line = None;
                vec![OrganizerEvent::StatusCleared]
            }
            OrganizerCommand::Teardown => {
                self.press = None;
                self.classifier
                    .on_drag_end(&mut self.selection, &mut self.folders);
                self.selection.teardown();
                Vec::new()
            }
        }
    }

    fn pointer_down(
        &mut self,
        point: Point,
        button: PointerButton,
        modifier: bool,
    ) -> Vec<OrganizerEvent> {
        if self.confirmation.is_some() {
            return Vec::new();
        }

        // A release lost outside the terminal leaves the old gesture open.
        self.press = None;
        self.selection.drop_marquee();
        let mut events = Vec::new();
        if self.selection.drag().is_some() {
            tracing::debug!("new press ended an unreleased drag");
            self.classifier
                .on_drag_end(&mut self.selection, &mut self.folders);
            events.push(OrganizerEvent::DragEnded);
        }
        events.extend(self.route_press(point, button, modifier));
        events
    }

    fn route_press(
        &mut self,
        point: Point,
        button: PointerButton,
        modifier: bool,
    ) -> Vec<OrganizerEvent> {
        if self.folders.viewport().contains(point) {
            let hit = self.folders.hit(point);
            if hit != Some(ChipHit::Editor) {
                self.folders.blur();
            }
            return match (hit, button) {
                (Some(ChipHit::Chip(filter)), PointerButton::Primary) => {
                    self.select_folder(filter)
                }
                (Some(ChipHit::Chip(filter)), PointerButton::Secondary) => {
                    self.folders.begin_rename(filter);
                    Vec::new()
                }
                (Some(ChipHit::Delete(id)), PointerButton::Primary) => {
                    match self.folders.request_delete(FolderFilter::Folder(id)) {
                        Some(confirmation) => self.ask(confirmation),
                        None => Vec::new(),
                    }
                }
                (Some(ChipHit::NewFolder), PointerButton::Primary) => {
                    self.folders.begin_create();
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }

        if !self.chats.viewport().contains(point) || button != PointerButton::Primary {
            return Vec::new();
        }
        self.folders.blur();

        match self.chats.interactive_at(point) {
            Some(row) => {
                self.press = Some(RowPress {
                    row,
                    origin: point,
                    modifier,
                });
                Vec::new()
            }
            None => {
                self.press = None;
                let changed = self
                    .selection
                    .on_pointer_down(point, false, modifier, &self.chats);
                self.selection_event(changed)
            }
        }
    }

    fn pointer_move(&mut self, point: Point, modifier: bool, now: Instant) -> Vec<OrganizerEvent> {
        let mut events = Vec::new();

        if let Some(press) = self.press {
            let threshold = i64::from(self.selection.config().click_threshold);
            if point.distance_squared(press.origin) < threshold * threshold {
                return events;
            }
            self.press = None;
            let Some(started) =
                self.classifier
                    .on_drag_start(&mut self.selection, press.row, &self.chats)
            else {
                return events;
            };
            if started.collapsed {
                events.push(OrganizerEvent::SelectionChanged(
                    self.selection.selection().len(),
                ));
            }
            events.push(OrganizerEvent::DragStarted(started.chats));
        }

        if self.selection.drag().is_some() {
            self.folders.drag_over(point, now);
        } else if self.selection.marquee().is_some() {
            let changed = self
                .selection
                .on_pointer_move(point, modifier, &self.chats, now);
            events.extend(self.selection_event(changed));
        }
        events
    }

    fn pointer_up(&mut self, point: Point, now: Instant) -> Vec<OrganizerEvent> {
        if let Some(press) = self.press.take() {
            let changed = self.selection.on_row_click(press.row, press.modifier, now);
            return self.selection_event(changed);
        }

        if self.selection.drag().is_none() {
            self.selection.on_pointer_up(now);
            return Vec::new();
        }

        let target = self.folders.target_at(point);
        let effect = self
            .classifier
            .on_drop(&mut self.selection, target, &self.folders, &self.chats);
        self.classifier
            .on_drag_end(&mut self.selection, &mut self.folders);
        let mut events = vec![OrganizerEvent::DragEnded];
        match effect {
            DropEffect::None => {}
            DropEffect::Mutate(mutation) => events.push(self.request(mutation)),
            DropEffect::Confirm(confirmation) => events.extend(self.ask(confirmation)),
        }
        events
    }

    fn wheel(&mut self, point: Point, delta: i32) -> Vec<OrganizerEvent> {
        let moved = if self.folders.viewport().contains(point) {
            self.folders.scroll_by(delta)
        } else if self.chats.viewport().contains(point) {
            self.chats.scroll_by(delta)
        } else {
            0
        };
        if moved == 0 {
            return Vec::new();
        }
        let mut events = vec![OrganizerEvent::Scrolled];
        let changed = self.selection.refresh(&self.chats);
        events.extend(self.selection_event(changed));
        events
    }

    fn tick(&mut self, now: Instant) -> Vec<OrganizerEvent> {
        let mut events = Vec::new();
        let outcome = self.selection.tick(&mut self.chats, now);
        let folder_scrolled = self.folders.tick(now);
        if outcome.scrolled != 0 || folder_scrolled != 0 {
            events.push(OrganizerEvent::Scrolled);
        }
        events.extend(self.selection_event(outcome.selection_changed));
        events
    }

    fn select_folder(&mut self, filter: FolderFilter) -> Vec<OrganizerEvent> {
        if !self.folders.set_active(filter) {
            return Vec::new();
        }
        self.filter_changed()
    }

    fn filter_changed(&mut self) -> Vec<OrganizerEvent> {
        self.chats.apply_filter(self.folders.active_folder());
        self.selection.drop_marquee();
        self.press = None;
        let mut events = vec![OrganizerEvent::FilterChanged(self.folders.active())];
        let changed = self.selection.clear_selection();
        events.extend(self.selection_event(changed));
        events
    }

    fn after_folder_change(&mut self, fell_back: bool) -> Vec<OrganizerEvent> {
        if fell_back {
            return self.filter_changed();
        }
        let before = self.row_order();
        self.chats.apply_filter(self.folders.active_folder());
        self.rows_changed(&before)
    }

    fn row_order(&self) -> Vec<ChatId> {
        self.chats.rows().map(|chat| chat.id).collect()
    }

    /// A marquee keeps running unless the rendered rows moved under it.
    fn rows_changed(&mut self, before: &[ChatId]) -> Vec<OrganizerEvent> {
        let known = self.chats.rendered_ids();
        if self.press.is_some_and(|press| !known.contains(&press.row)) {
            self.press = None;
        }
        if self.row_order() != before {
            self.selection.drop_marquee();
        }
        let changed = self.selection.retain_known(&known);
        self.selection_event(changed)
    }

    fn mutation_finished(
        &mut self,
        request_id: u64,
        result: Result<MutationOutcome, String>,
    ) -> Vec<OrganizerEvent> {
        let mutation = self.in_flight.remove(&request_id);
        match result {
            Ok(outcome) => {
                tracing::info!(request_id, ?outcome, "folder mutation finished");
                let fell_back = self.folders.apply(&outcome);
                let mut events = vec![OrganizerEvent::FoldersChanged];
                events.extend(self.after_folder_change(fell_back));
                events.push(self.set_status(&outcome.status()));
                events
            }
            Err(message) => {
                let label = mutation
                    .as_ref()
                    .map_or("Failed to update folder", FolderMutation::failure_label);
                tracing::warn!(request_id, error = %message, "{label}");
                vec![self.set_status(&format!("{label}: {message}"))]
            }
        }
    }

    fn ask(&mut self, confirmation: Confirmation) -> Vec<OrganizerEvent> {
        self.confirmation = Some(confirmation.clone());
        vec![OrganizerEvent::ConfirmationRequested(confirmation)]
    }

    fn request(&mut self, mutation: FolderMutation) -> OrganizerEvent {
        let request_id = self.next_request;
        self.next_request += 1;
        tracing::debug!(request_id, ?mutation, "folder mutation requested");
        self.in_flight.insert(request_id, mutation.clone());
        OrganizerEvent::MutationRequested {
            request_id,
            mutation,
        }
    }

    fn selection_event(&self, changed: bool) -> Vec<OrganizerEvent> {
        if changed {
            vec![OrganizerEvent::SelectionChanged(
                self.selection.selection().len(),
            )]
        } else {
            Vec::new()
        }
    }

    fn set_status(&mut self, message: &str) -> OrganizerEvent {
        self.status_line = Some(message.to_owned());
        OrganizerEvent::StatusUpdated(message.to_owned())
    }
}
