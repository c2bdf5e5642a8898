// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Instant;

use crate::{
    AutoScrollConfig, DragContext, EdgeAutoScroll, Folder, FolderFilter, FolderId,
    FolderMutation, MutationOutcome, PSEUDO_FOLDER_TITLE, Point, Rect,
};

const CHIP_GAP: i32 = 1;
const NEW_FOLDER_LABEL: &str = "+ new";

/// Destructive actions that wait for a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteFolder { folder: FolderId, title: String },
    DeleteEmptiedFolder { folder: FolderId, title: String },
}

impl Confirmation {
    pub fn prompt(&self) -> String {
        match self {
            Self::DeleteFolder { title, .. } => format!("Delete folder \"{title}\"?"),
            Self::DeleteEmptiedFolder { title, .. } => {
                format!("This empties \"{title}\". Delete the folder instead?")
            }
        }
    }

    pub fn mutation(&self) -> FolderMutation {
        match self {
            Self::DeleteFolder { folder, .. } | Self::DeleteEmptiedFolder { folder, .. } => {
                FolderMutation::Delete { folder: *folder }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEditor {
    Creating { input: String },
    Renaming { folder: FolderId, input: String },
}

impl FolderEditor {
    pub fn input(&self) -> &str {
        match self {
            Self::Creating { input } | Self::Renaming { input, .. } => input,
        }
    }

    fn input_mut(&mut self) -> &mut String {
        match self {
            Self::Creating { input } | Self::Renaming { input, .. } => input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHighlight {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Chip(FolderFilter),
    NewFolder,
    Editor,
}

/// One horizontal cell run on the folder bar, in content coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipSlot {
    pub kind: SlotKind,
    pub label: String,
    pub left: i32,
    pub width: i32,
}

impl ChipSlot {
    const fn right(&self) -> i32 {
        self.left + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipHit {
    Chip(FolderFilter),
    Delete(FolderId),
    NewFolder,
    Editor,
}

/// Folder bar: the "All" pseudo-folder followed by concrete folders by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderContainerView {
    folders: Vec<Folder>,
    active: FolderFilter,
    editor: Option<FolderEditor>,
    hover: Option<FolderFilter>,
    /// Last drag position over the bar; auto-scroll re-targets from it.
    pointer: Option<Point>,
    drag: DragContext,
    viewport: Rect,
    scroll_x: i32,
    autoscroll: EdgeAutoScroll,
}

impl FolderContainerView {
    pub fn new(drag: DragContext) -> Self {
        Self::with_autoscroll(drag, AutoScrollConfig::default())
    }

    pub fn with_autoscroll(drag: DragContext, config: AutoScrollConfig) -> Self {
        Self {
            folders: Vec::new(),
            active: FolderFilter::All,
            editor: None,
            hover: None,
            pointer: None,
            drag,
            viewport: Rect::default(),
            scroll_x: 0,
            autoscroll: EdgeAutoScroll::new(config),
        }
    }

    pub fn drag_context(&self) -> &DragContext {
        &self.drag
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.id == id)
    }

    pub const fn active(&self) -> FolderFilter {
        self.active
    }

    pub fn active_folder(&self) -> Option<&Folder> {
        self.active.folder_id().and_then(|id| self.folder(id))
    }

    pub fn editor(&self) -> Option<&FolderEditor> {
        self.editor.as_ref()
    }

    pub const fn hover(&self) -> Option<FolderFilter> {
        self.hover
    }

    /// Replaces the folder list. Service-reported defaults are dropped in
    /// favor of the pseudo-folder. Returns whether the active filter fell
    /// back to "All".
    pub fn set_folders(&mut self, folders: Vec<Folder>) -> bool {
        let mut folders = folders
            .into_iter()
            .filter(|folder| !folder.is_service_default())
            .collect::<Vec<_>>();
        folders.sort_by_key(|folder| folder.id);
        folders.dedup_by_key(|folder| folder.id);
        self.folders = folders;

        let renaming_missing = matches!(
            &self.editor,
            Some(FolderEditor::Renaming { folder, .. }) if self.folder(*folder).is_none()
        );
        if renaming_missing {
            self.editor = None;
        }
        self.clamp_scroll();
        self.fall_back_if_missing()
    }

    fn fall_back_if_missing(&mut self) -> bool {
        match self.active {
            FolderFilter::Folder(id) if self.folder(id).is_none() => {
                self.active = FolderFilter::All;
                true
            }
            _ => false,
        }
    }

    pub fn set_active(&mut self, filter: FolderFilter) -> bool {
        if filter == self.active {
            return false;
        }
        if filter.folder_id().is_some_and(|id| self.folder(id).is_none()) {
            return false;
        }
        self.active = filter;
        self.reveal(filter);
        true
    }

    /// Next (or previous) filter in bar order, wrapping.
    pub fn cycled(&self, forward: bool) -> FolderFilter {
        let order = std::iter::once(FolderFilter::All)
            .chain(self.folders.iter().map(|folder| FolderFilter::Folder(folder.id)))
            .collect::<Vec<_>>();
        let current = order
            .iter()
            .position(|filter| *filter == self.active)
            .unwrap_or(0);
        let len = order.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        order[next]
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.clamp_scroll();
    }

    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    pub const fn scroll_offset(&self) -> i32 {
        self.scroll_x
    }

    pub fn layout(&self) -> Vec<ChipSlot> {
        let mut slots = Vec::with_capacity(self.folders.len() + 2);
        let mut left: i32 = 0;
        let mut push = |kind, label: String| {
            let width = i32::try_from(label.chars().count()).unwrap_or(i32::MAX);
            slots.push(ChipSlot {
                kind,
                label,
                left,
                width,
            });
            left = left.saturating_add(width).saturating_add(CHIP_GAP);
        };

        push(
            SlotKind::Chip(FolderFilter::All),
            format!(" {PSEUDO_FOLDER_TITLE} "),
        );
        for folder in &self.folders {
            let label = match &self.editor {
                Some(FolderEditor::Renaming { folder: id, input }) if *id == folder.id => {
                    format!(" {input}_ ")
                }
                _ => format!(" {} × ", folder.title),
            };
            push(SlotKind::Chip(FolderFilter::Folder(folder.id)), label);
        }
        match &self.editor {
            Some(FolderEditor::Creating { input }) => push(SlotKind::Editor, format!("[{input}_]")),
            _ => push(SlotKind::NewFolder, NEW_FOLDER_LABEL.to_owned()),
        }
        slots
    }

    fn content_width(&self) -> i32 {
        self.layout().last().map_or(0, ChipSlot::right)
    }

    fn max_scroll(&self) -> i32 {
        (self.content_width() - self.viewport.width()).max(0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_x = self.scroll_x.clamp(0, self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: i32) -> i32 {
        let before = self.scroll_x;
        self.scroll_x = self.scroll_x.saturating_add(delta).clamp(0, self.max_scroll());
        self.scroll_x - before
    }

    fn reveal(&mut self, filter: FolderFilter) {
        let Some(slot) = self
            .layout()
            .into_iter()
            .find(|slot| slot.kind == SlotKind::Chip(filter))
        else {
            return;
        };
        if slot.left < self.scroll_x {
            self.scroll_x = slot.left;
        } else if slot.right() > self.scroll_x + self.viewport.width() {
            self.scroll_x = slot.right() - self.viewport.width();
        }
        self.clamp_scroll();
    }

    pub fn hit(&self, point: Point) -> Option<ChipHit> {
        if !self.viewport.contains(point) {
            return None;
        }
        let x = point.x - self.viewport.left + self.scroll_x;
        let slot = self
            .layout()
            .into_iter()
            .find(|slot| slot.left <= x && x < slot.right())?;
        Some(match slot.kind {
            SlotKind::Chip(FolderFilter::Folder(id))
                if !self.is_renaming(id) && x == slot.right() - 2 =>
            {
                ChipHit::Delete(id)
            }
            SlotKind::Chip(filter) => ChipHit::Chip(filter),
            SlotKind::NewFolder => ChipHit::NewFolder,
            SlotKind::Editor => ChipHit::Editor,
        })
    }

    /// Folder or pseudo-folder under `point`, as a drop target.
    pub fn target_at(&self, point: Point) -> Option<FolderFilter> {
        match self.hit(point)? {
            ChipHit::Chip(filter) => Some(filter),
            ChipHit::Delete(id) => Some(FolderFilter::Folder(id)),
            ChipHit::NewFolder | ChipHit::Editor => None,
        }
    }

    fn is_renaming(&self, id: FolderId) -> bool {
        matches!(&self.editor, Some(FolderEditor::Renaming { folder, .. }) if *folder == id)
    }

    pub fn begin_create(&mut self) {
        self.editor = Some(FolderEditor::Creating {
            input: String::new(),
        });
        self.scroll_x = self.max_scroll();
    }

    /// Only concrete folders can be renamed.
    pub fn begin_rename(&mut self, filter: FolderFilter) -> bool {
        let Some(folder) = filter.folder_id().and_then(|id| self.folder(id)) else {
            return false;
        };
        self.editor = Some(FolderEditor::Renaming {
            folder: folder.id,
            input: folder.title.clone(),
        });
        true
    }

    pub fn input_char(&mut self, ch: char) {
        if let Some(editor) = self.editor.as_mut() {
            editor.input_mut().push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.input_mut().pop();
        }
    }

    /// Closes the editor; yields a mutation only for a non-blank title that
    /// differs from the current one.
    pub fn submit(&mut self) -> Option<FolderMutation> {
        match self.editor.take()? {
            FolderEditor::Creating { input } => {
                let title = input.trim();
                (!title.is_empty()).then(|| FolderMutation::Create {
                    title: title.to_owned(),
                })
            }
            FolderEditor::Renaming { folder, input } => {
                let title = input.trim();
                if title.is_empty() {
                    self.editor = Some(FolderEditor::Renaming { folder, input });
                    return None;
                }
                let unchanged = self
                    .folder(folder)
                    .is_some_and(|current| current.title == title);
                (!unchanged).then(|| FolderMutation::Rename {
                    folder,
                    title: title.to_owned(),
                })
            }
        }
    }

    /// Focus left the editor without a submit. A rename is discarded; a
    /// create entry closes only when still blank.
    pub fn blur(&mut self) {
        match &self.editor {
            Some(FolderEditor::Creating { input }) if !input.trim().is_empty() => {}
            _ => self.editor = None,
        }
    }

    pub fn cancel(&mut self) {
        self.editor = None;
    }

    pub fn request_delete(&self, filter: FolderFilter) -> Option<Confirmation> {
        let folder = filter.folder_id().and_then(|id| self.folder(id))?;
        Some(Confirmation::DeleteFolder {
            folder: folder.id,
            title: folder.title.clone(),
        })
    }

    /// Updates the hover target while a drag is over the bar and steers
    /// horizontal auto-scroll.
    pub fn drag_over(&mut self, point: Point, now: Instant) -> Option<FolderFilter> {
        if !self.drag.is_active() || !self.viewport.contains(point) {
            self.drag_leave();
            return None;
        }
        self.pointer = Some(point);
        self.hover = self.target_at(point);
        self.autoscroll
            .track(point.x, self.viewport.left, self.viewport.right, now);
        self.hover
    }

    pub fn drag_leave(&mut self) {
        self.hover = None;
        self.pointer = None;
        self.autoscroll.stop();
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.autoscroll.is_running()
    }

    pub fn tick(&mut self, now: Instant) -> i32 {
        if !self.drag.is_active() {
            self.autoscroll.stop();
            return 0;
        }
        let wanted = self.autoscroll.pump(now);
        if wanted == 0 {
            return 0;
        }
        let moved = self.scroll_by(wanted);
        if moved != 0
            && let Some(point) = self.pointer
        {
            self.hover = self.target_at(point);
        }
        moved
    }

    pub fn highlight(&self, filter: FolderFilter) -> Option<DropHighlight> {
        if !self.drag.is_active() || self.hover != Some(filter) {
            return None;
        }
        match filter {
            FolderFilter::Folder(_) => Some(DropHighlight::Add),
            FolderFilter::All if self.active_folder().is_some() => Some(DropHighlight::Remove),
            FolderFilter::All => None,
        }
    }

    /// Folds a finished mutation into local folder state. Returns whether
    /// the active filter fell back to "All".
    pub fn apply(&mut self, outcome: &MutationOutcome) -> bool {
        match outcome {
            MutationOutcome::Created(folder) => {
                if self.folder(folder.id).is_none() && !folder.is_service_default() {
                    self.folders.push(folder.clone());
                    self.folders.sort_by_key(|folder| folder.id);
                }
            }
            MutationOutcome::Renamed { folder, title } => {
                if let Some(current) = self.folders.iter_mut().find(|f| f.id == *folder) {
                    current.title.clone_from(title);
                }
            }
            MutationOutcome::Deleted(folder) => {
                self.folders.retain(|current| current.id != *folder);
                if self.is_renaming(*folder) {
                    self.editor = None;
                }
            }
            MutationOutcome::Added { folder, chats } => {
                if let Some(current) = self.folders.iter_mut().find(|f| f.id == *folder) {
                    current.members.extend(chats.iter().copied());
                }
            }
            MutationOutcome::Removed { folder, chats } => {
                if let Some(current) = self.folders.iter_mut().find(|f| f.id == *folder) {
                    for chat in chats {
                        current.members.remove(chat);
                    }
                }
            }
        }
        self.clamp_scroll();
        self.fall_back_if_missing()
    }
}
