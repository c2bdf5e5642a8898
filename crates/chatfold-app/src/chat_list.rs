// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::{ChatId, ChatItem, ExternalChatId, Folder, GeometryCache, Point, Rect};

/// Width of the initials badge plus the space after it.
const BADGE_WIDTH: i32 = 3;

/// Rows of the chat list in a stable order, laid out top to bottom inside a
/// scrollable viewport. Owns no gesture logic; highlighting is derived from
/// the selection by whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListView {
    chats: Vec<ChatItem>,
    index: BTreeMap<ChatId, usize>,
    rows: Vec<usize>,
    positions: BTreeMap<ChatId, usize>,
    viewport: Rect,
    row_height: i32,
    gutter: i32,
    scroll: i32,
}

impl Default for ChatListView {
    fn default() -> Self {
        Self::new(1, 2)
    }
}

impl ChatListView {
    pub fn new(row_height: i32, gutter: i32) -> Self {
        Self {
            chats: Vec::new(),
            index: BTreeMap::new(),
            rows: Vec::new(),
            positions: BTreeMap::new(),
            viewport: Rect::default(),
            row_height: row_height.max(1),
            gutter: gutter.max(0),
            scroll: 0,
        }
    }

    /// Replaces the account's chats and shows all of them until a filter is
    /// applied again.
    pub fn set_chats(&mut self, chats: Vec<ChatItem>) {
        self.index = chats
            .iter()
            .enumerate()
            .map(|(position, chat)| (chat.id, position))
            .collect();
        self.chats = chats;
        self.apply_filter(None);
    }

    /// `None` shows every chat; a folder shows only its members.
    pub fn apply_filter(&mut self, folder: Option<&Folder>) {
        self.rows = self
            .chats
            .iter()
            .enumerate()
            .filter(|(_, chat)| folder.is_none_or(|folder| folder.contains(chat.external_id)))
            .map(|(position, _)| position)
            .collect();
        self.positions = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, position)| (self.chats[*position].id, row))
            .collect();
        self.clamp_scroll();
    }

    pub fn rows(&self) -> impl Iterator<Item = &ChatItem> + '_ {
        self.rows.iter().map(|position| &self.chats[*position])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn chat(&self, id: ChatId) -> Option<&ChatItem> {
        self.index.get(&id).map(|position| &self.chats[*position])
    }

    /// Whether `id` is currently rendered (passes the active filter).
    pub fn is_rendered(&self, id: ChatId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn rendered_ids(&self) -> BTreeSet<ChatId> {
        self.positions.keys().copied().collect()
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.clamp_scroll();
    }

    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    pub const fn row_height(&self) -> i32 {
        self.row_height
    }

    pub const fn gutter(&self) -> i32 {
        self.gutter
    }

    pub const fn scroll_offset(&self) -> i32 {
        self.scroll
    }

    pub fn max_scroll(&self) -> i32 {
        let rows = i32::try_from(self.rows.len()).unwrap_or(i32::MAX);
        rows.saturating_mul(self.row_height)
            .saturating_sub(self.viewport.height())
            .max(0)
    }

    /// Scrolls by `delta`, clamped to the content; returns the distance
    /// actually moved.
    pub fn scroll_by(&mut self, delta: i32) -> i32 {
        let before = self.scroll;
        self.scroll = self.scroll.saturating_add(delta).clamp(0, self.max_scroll());
        self.scroll - before
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.clamp(0, self.max_scroll());
    }

    /// Screen-space rectangle of a rendered row, whether or not it is
    /// currently scrolled into view.
    pub fn row_rect(&self, id: ChatId) -> Option<Rect> {
        let row = i32::try_from(*self.positions.get(&id)?).ok()?;
        let top = self.viewport.top + row * self.row_height - self.scroll;
        Some(Rect::from_edges(
            self.viewport.left,
            top,
            self.viewport.right,
            top + self.row_height,
        ))
    }

    /// The part of a row that starts clicks and drags: its badge and title.
    pub fn label_rect(&self, id: ChatId) -> Option<Rect> {
        let row = self.row_rect(id)?;
        let title = i32::try_from(self.chat(id)?.title().chars().count()).unwrap_or(i32::MAX);
        let left = row.left + self.gutter;
        let right = left.saturating_add(BADGE_WIDTH).saturating_add(title).min(row.right);
        Some(Rect::from_edges(left, row.top, right, row.bottom))
    }

    pub fn row_at(&self, point: Point) -> Option<ChatId> {
        if !self.viewport.contains(point) {
            return None;
        }
        let offset = point.y - self.viewport.top + self.scroll;
        let row = usize::try_from(offset / self.row_height).ok()?;
        self.rows.get(row).map(|position| self.chats[*position].id)
    }

    /// Row whose label is under `point`; anything else in the list is empty
    /// space where a marquee may start.
    pub fn interactive_at(&self, point: Point) -> Option<ChatId> {
        let id = self.row_at(point)?;
        self.label_rect(id)?.contains(point).then_some(id)
    }

    pub fn geometry(&self) -> GeometryCache {
        GeometryCache::capture(
            self.rows()
                .filter_map(|chat| self.row_rect(chat.id).map(|rect| (chat.id, rect))),
        )
    }

    /// `ids` in row order, skipping any that are not rendered.
    pub fn ordered<'a>(&self, ids: impl IntoIterator<Item = &'a ChatId>) -> Vec<ChatId> {
        let mut ordered = ids
            .into_iter()
            .filter_map(|id| self.positions.get(id).map(|row| (*row, *id)))
            .collect::<Vec<_>>();
        ordered.sort_unstable();
        ordered.into_iter().map(|(_, id)| id).collect()
    }

    pub fn external_ids(&self, ids: &[ChatId]) -> Vec<ExternalChatId> {
        ids.iter()
            .filter_map(|id| self.chat(*id).map(|chat| chat.external_id))
            .collect()
    }
}
