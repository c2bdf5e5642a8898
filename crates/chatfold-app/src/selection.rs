// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::{
    AutoScrollConfig, ChatId, ChatListView, DragGesture, EdgeAutoScroll, GeometryCache, Point,
    Rect,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    /// Distance the pointer must travel before a marquee is shown.
    pub click_threshold: i32,
    /// How long row clicks are ignored after a shown marquee ends.
    pub click_suppress: Duration,
    /// Extra extent of the pointer's own cell on the far corner of a marquee.
    /// Zero for pixel input, one for terminal cells.
    pub hotspot: i32,
    pub scroll: AutoScrollConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            click_threshold: 5,
            click_suppress: Duration::from_millis(100),
            hotspot: 0,
            scroll: AutoScrollConfig::default(),
        }
    }
}

/// Chats currently selected in the list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    ids: BTreeSet<ChatId>,
}

impl SelectionState {
    pub fn ids(&self) -> &BTreeSet<ChatId> {
        &self.ids
    }

    pub fn contains(&self, id: ChatId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn replace(&mut self, ids: BTreeSet<ChatId>) -> bool {
        if self.ids == ids {
            return false;
        }
        self.ids = ids;
        true
    }

    fn clear(&mut self) -> bool {
        self.replace(BTreeSet::new())
    }

    fn select_only(&mut self, id: ChatId) -> bool {
        self.replace(BTreeSet::from([id]))
    }

    fn toggle(&mut self, id: ChatId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    fn retain(&mut self, known: &BTreeSet<ChatId>) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| known.contains(id));
        before != self.ids.len()
    }
}

/// Rubber-band selection in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarqueeGesture {
    origin: Point,
    current: Point,
    additive: bool,
    shown: bool,
    baseline: BTreeSet<ChatId>,
    cache: GeometryCache,
    scroll_at_start: i32,
    autoscroll: EdgeAutoScroll,
}

impl MarqueeGesture {
    pub const fn origin(&self) -> Point {
        self.origin
    }

    pub const fn current(&self) -> Point {
        self.current
    }

    pub const fn additive(&self) -> bool {
        self.additive
    }

    pub const fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.autoscroll.is_running()
    }

    /// The origin stays pinned to the content it was pressed on, so it moves
    /// on screen as the list scrolls.
    fn scroll_delta(&self, scroll: i32) -> i32 {
        scroll - self.scroll_at_start
    }

    fn area(&self, scroll: i32, hotspot: i32) -> Rect {
        let origin = self.origin.offset(0, -self.scroll_delta(scroll));
        let mut area = Rect::from_corners(origin, self.current);
        area.right = area.right.saturating_add(hotspot);
        area.bottom = area.bottom.saturating_add(hotspot);
        area
    }

    fn selection(&self, scroll: i32, hotspot: i32) -> BTreeSet<ChatId> {
        let hits = self
            .cache
            .hits(self.area(scroll, hotspot), self.scroll_delta(scroll));
        if self.additive {
            self.baseline.union(&hits).copied().collect()
        } else {
            hits
        }
    }
}

/// Marquee and drag are exclusive; holding both in one value keeps them so.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Marquee(MarqueeGesture),
    Dragging(DragGesture),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub scrolled: i32,
    pub selection_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionController {
    config: GestureConfig,
    selection: SelectionState,
    gesture: Gesture,
    marquee_finished_at: Option<Instant>,
}

impl SelectionController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub const fn config(&self) -> GestureConfig {
        self.config
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn marquee(&self) -> Option<&MarqueeGesture> {
        match &self.gesture {
            Gesture::Marquee(marquee) => Some(marquee),
            _ => None,
        }
    }

    pub fn marquee_shown(&self) -> bool {
        self.marquee().is_some_and(MarqueeGesture::is_shown)
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.marquee().is_some_and(MarqueeGesture::is_autoscrolling)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.marquee()
            .and_then(|marquee| marquee.autoscroll.next_deadline())
    }

    /// Screen rectangle of the marquee once it has passed the click threshold.
    pub fn marquee_rect(&self, list: &ChatListView) -> Option<Rect> {
        self.marquee()
            .filter(|marquee| marquee.shown)
            .map(|marquee| marquee.area(list.scroll_offset(), self.config.hotspot))
    }

    /// Starts a marquee unless the press landed on a row label. Returns
    /// whether the selection changed.
    pub fn on_pointer_down(
        &mut self,
        point: Point,
        target_is_interactive: bool,
        modifier: bool,
        list: &ChatListView,
    ) -> bool {
        if target_is_interactive {
            return false;
        }

        let changed = if modifier {
            false
        } else {
            self.selection.clear()
        };
        self.gesture = Gesture::Marquee(MarqueeGesture {
            origin: point,
            current: point,
            additive: false,
            shown: false,
            baseline: self.selection.ids.clone(),
            cache: list.geometry(),
            scroll_at_start: list.scroll_offset(),
            autoscroll: EdgeAutoScroll::new(self.config.scroll),
        });
        tracing::debug!(x = point.x, y = point.y, modifier, "marquee started");
        changed
    }

    pub fn on_pointer_move(
        &mut self,
        point: Point,
        modifier: bool,
        list: &ChatListView,
        now: Instant,
    ) -> bool {
        let threshold = i64::from(self.config.click_threshold);
        let Gesture::Marquee(marquee) = &mut self.gesture else {
            return false;
        };

        marquee.current = point;
        marquee.additive = modifier;
        if !marquee.shown {
            let origin = marquee
                .origin
                .offset(0, -marquee.scroll_delta(list.scroll_offset()));
            if point.distance_squared(origin) < threshold * threshold {
                return false;
            }
            marquee.shown = true;
        }

        let viewport = list.viewport();
        marquee
            .autoscroll
            .track(point.y, viewport.top, viewport.bottom, now);
        let next = marquee.selection(list.scroll_offset(), self.config.hotspot);
        self.selection.replace(next)
    }

    pub fn on_pointer_up(&mut self, now: Instant) {
        if !matches!(self.gesture, Gesture::Marquee(_)) {
            return;
        }
        if self.marquee_shown() {
            self.marquee_finished_at = Some(now);
        }
        self.gesture = Gesture::Idle;
        tracing::debug!(selected = self.selection.len(), "marquee finished");
    }

    /// Advances auto-scroll, moving `list` and re-deriving the selection from
    /// the unmoved pointer.
    pub fn tick(&mut self, list: &mut ChatListView, now: Instant) -> TickOutcome {
        let hotspot = self.config.hotspot;
        let Gesture::Marquee(marquee) = &mut self.gesture else {
            return TickOutcome::default();
        };

        let wanted = marquee.autoscroll.pump(now);
        if wanted == 0 {
            return TickOutcome::default();
        }
        let scrolled = list.scroll_by(wanted);
        if scrolled == 0 || !marquee.shown {
            return TickOutcome {
                scrolled,
                selection_changed: false,
            };
        }
        let next = marquee.selection(list.scroll_offset(), hotspot);
        TickOutcome {
            scrolled,
            selection_changed: self.selection.replace(next),
        }
    }

    pub fn suppressing_clicks(&self, now: Instant) -> bool {
        self.marquee_finished_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.config.click_suppress)
    }

    /// A click on a row label that never became a drag.
    pub fn on_row_click(&mut self, id: ChatId, modifier: bool, now: Instant) -> bool {
        if self.suppressing_clicks(now) {
            return false;
        }
        self.marquee_finished_at = None;
        if modifier {
            self.selection.toggle(id);
            true
        } else {
            self.selection.select_only(id)
        }
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// Drops selected ids that are no longer rendered.
    pub fn retain_known(&mut self, known: &BTreeSet<ChatId>) -> bool {
        if let Gesture::Marquee(marquee) = &mut self.gesture {
            marquee.baseline.retain(|id| known.contains(id));
        }
        self.selection.retain(known)
    }

    /// Re-derives a shown marquee's selection after the list scrolled by
    /// something other than the auto-scroll timer.
    pub fn refresh(&mut self, list: &ChatListView) -> bool {
        let hotspot = self.config.hotspot;
        let Some(marquee) = self.marquee().filter(|marquee| marquee.shown) else {
            return false;
        };
        let next = marquee.selection(list.scroll_offset(), hotspot);
        self.selection.replace(next)
    }

    pub fn teardown(&mut self) {
        self.gesture = Gesture::Idle;
        self.marquee_finished_at = None;
    }

    /// A marquee's snapshot is useless once the rendered rows change.
    pub(crate) fn drop_marquee(&mut self) {
        if matches!(self.gesture, Gesture::Marquee(_)) {
            self.gesture = Gesture::Idle;
        }
    }

    pub(crate) fn select_only(&mut self, id: ChatId) -> bool {
        self.selection.select_only(id)
    }

    pub(crate) fn begin_drag(&mut self, drag: DragGesture) {
        self.gesture = Gesture::Dragging(drag);
    }

    pub(crate) fn drag(&self) -> Option<&DragGesture> {
        match &self.gesture {
            Gesture::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    pub(crate) fn finish_drag(&mut self) -> Option<DragGesture> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Dragging(drag) => Some(drag),
            other => {
                self.gesture = other;
                None
            }
        }
    }
}
