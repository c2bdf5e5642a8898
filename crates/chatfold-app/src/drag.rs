// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    ChatId, ChatListView, Confirmation, FolderContainerView, FolderFilter, FolderMutation,
    SelectionController,
};

pub const DRAG_MEDIA_TYPE: &str = "application/x-chatfold-chats";

/// "Drag in progress" signal shared by the classifier and the folder bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DragContext(Rc<Cell<bool>>);

impl DragContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }

    fn set(&self, active: bool) {
        self.0.set(active);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    pub chat_ids: Vec<ChatId>,
}

/// Typed, serialized payload as it travels from the drag source to a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragTransfer {
    pub media_type: String,
    pub data: String,
}

impl DragPayload {
    pub fn encode(&self) -> Result<DragTransfer> {
        let data = serde_json::to_string(self).context("encode drag payload")?;
        Ok(DragTransfer {
            media_type: DRAG_MEDIA_TYPE.to_owned(),
            data,
        })
    }
}

impl DragTransfer {
    /// `None` for foreign or malformed transfers.
    pub fn decode(&self) -> Option<DragPayload> {
        if self.media_type != DRAG_MEDIA_TYPE {
            return None;
        }
        serde_json::from_str(&self.data).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragGesture {
    payload: Vec<ChatId>,
    transfer: DragTransfer,
}

impl DragGesture {
    pub fn payload(&self) -> &[ChatId] {
        &self.payload
    }

    pub fn transfer(&self) -> &DragTransfer {
        &self.transfer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragStarted {
    pub chats: usize,
    /// The selection collapsed to the dragged row first.
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropEffect {
    None,
    Mutate(FolderMutation),
    Confirm(Confirmation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragClassifier {
    context: DragContext,
}

impl DragClassifier {
    pub fn new(context: DragContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &DragContext {
        &self.context
    }

    /// Starts a drag from `row`. Refused while a marquee is on screen.
    pub fn on_drag_start(
        &self,
        selection: &mut SelectionController,
        row: ChatId,
        list: &ChatListView,
    ) -> Option<DragStarted> {
        if selection.marquee_shown() || !list.is_rendered(row) {
            return None;
        }

        let collapsed = if selection.selection().contains(row) {
            false
        } else {
            selection.select_only(row)
        };
        let payload = list.ordered(selection.selection().ids());
        let transfer = match (DragPayload {
            chat_ids: payload.clone(),
        })
        .encode()
        {
            Ok(transfer) => transfer,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "drag refused");
                return None;
            }
        };

        let chats = payload.len();
        selection.begin_drag(DragGesture { payload, transfer });
        self.context.set(true);
        tracing::debug!(chats, collapsed, "drag started");
        Some(DragStarted { chats, collapsed })
    }

    /// Ends the gesture and resolves what dropping it on `target` means. The
    /// resulting mutation runs later; the gesture is already idle.
    pub fn on_drop(
        &self,
        selection: &mut SelectionController,
        target: Option<FolderFilter>,
        folders: &FolderContainerView,
        list: &ChatListView,
    ) -> DropEffect {
        let Some(drag) = selection.finish_drag() else {
            return DropEffect::None;
        };
        match target {
            Some(target) => self.resolve_drop(&drag.transfer, target, folders, list),
            None => DropEffect::None,
        }
    }

    pub fn resolve_drop(
        &self,
        transfer: &DragTransfer,
        target: FolderFilter,
        folders: &FolderContainerView,
        list: &ChatListView,
    ) -> DropEffect {
        let Some(payload) = transfer.decode() else {
            tracing::debug!(media_type = %transfer.media_type, "ignored undecodable drop");
            return DropEffect::None;
        };
        let chats = list.external_ids(&payload.chat_ids);
        if chats.is_empty() {
            return DropEffect::None;
        }

        match target {
            FolderFilter::Folder(id) if folders.folder(id).is_some() => {
                DropEffect::Mutate(FolderMutation::BulkAdd { folder: id, chats })
            }
            FolderFilter::Folder(_) => DropEffect::None,
            FolderFilter::All => {
                let Some(active) = folders.active_folder() else {
                    return DropEffect::None;
                };
                if active.members_after_removing(&chats).is_empty() {
                    DropEffect::Confirm(Confirmation::DeleteEmptiedFolder {
                        folder: active.id,
                        title: active.title.clone(),
                    })
                } else {
                    DropEffect::Mutate(FolderMutation::BulkRemove {
                        folder: active.id,
                        chats,
                    })
                }
            }
        }
    }

    /// Runs on every drag exit, dropped or not.
    pub fn on_drag_end(
        &self,
        selection: &mut SelectionController,
        folders: &mut FolderContainerView,
    ) {
        selection.finish_drag();
        folders.drag_leave();
        self.context.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::{DRAG_MEDIA_TYPE, DragClassifier, DragContext, DragTransfer, DropEffect};
    use crate::{
        ChatId, ChatItem, ChatKind, ChatListView, Confirmation, ExternalChatId, Folder,
        FolderContainerView, FolderFilter, FolderId, FolderMutation, Gesture, GestureConfig,
        Point, Rect, SelectionController,
    };
    use std::collections::BTreeSet;
    use std::time::Instant;

    struct Harness {
        classifier: DragClassifier,
        selection: SelectionController,
        folders: FolderContainerView,
        list: ChatListView,
    }

    fn harness() -> Harness {
        let context = DragContext::new();
        let mut list = ChatListView::new(1, 2);
        list.set_chats(
            [7, 8, 9]
                .into_iter()
                .map(|id| ChatItem {
                    id: ChatId::new(id),
                    external_id: ExternalChatId::new(id),
                    display_name: format!("chat {id}"),
                    handle: None,
                    kind: ChatKind::Group,
                })
                .collect(),
        );
        list.set_viewport(Rect::new(0, 2, 40, 10));

        let mut jobs = Folder::new(FolderId::new(3), "jobs");
        jobs.members
            .extend([ExternalChatId::new(7), ExternalChatId::new(9)]);
        let mut folders = FolderContainerView::new(context.clone());
        folders.set_folders(vec![jobs, Folder::new(FolderId::new(4), "misc")]);

        Harness {
            classifier: DragClassifier::new(context),
            selection: SelectionController::new(GestureConfig::default()),
            folders,
            list,
        }
    }

    fn ids(values: &[i64]) -> BTreeSet<ChatId> {
        values.iter().copied().map(ChatId::new).collect()
    }

    #[test]
    fn dragging_unselected_row_collapses_selection_to_it() {
        let mut h = harness();
        let now = Instant::now();
        h.selection.on_row_click(ChatId::new(7), false, now);
        h.selection.on_row_click(ChatId::new(9), true, now);

        let started = h
            .classifier
            .on_drag_start(&mut h.selection, ChatId::new(8), &h.list)
            .expect("drag starts");
        assert!(started.collapsed);
        assert_eq!(started.chats, 1);
        assert_eq!(h.selection.selection().ids(), &ids(&[8]));
        assert!(h.classifier.context().is_active());
        assert!(h.folders.drag_context().is_active());
    }

    #[test]
    fn dragging_selected_row_carries_selection_in_list_order() {
        let mut h = harness();
        let now = Instant::now();
        h.selection.on_row_click(ChatId::new(9), false, now);
        h.selection.on_row_click(ChatId::new(7), true, now);
        h.classifier
            .on_drag_start(&mut h.selection, ChatId::new(9), &h.list)
            .expect("drag starts");
        let Gesture::Dragging(drag) = h.selection.gesture() else {
            panic!("expected drag gesture");
        };
        assert_eq!(drag.payload(), &[ChatId::new(7), ChatId::new(9)]);
        assert_eq!(drag.transfer().media_type, DRAG_MEDIA_TYPE);
    }

    #[test]
    fn drag_is_refused_while_marquee_is_shown() {
        let mut h = harness();
        let now = Instant::now();
        h.selection
            .on_pointer_down(Point::new(30, 2), false, false, &h.list);
        h.selection
            .on_pointer_move(Point::new(39, 9), false, &h.list, now);
        assert!(h.selection.marquee_shown());
        assert_eq!(
            h.classifier
                .on_drag_start(&mut h.selection, ChatId::new(8), &h.list),
            None
        );
        assert!(!h.classifier.context().is_active());
    }

    #[test]
    fn drop_on_folder_adds_and_resets_gesture() {
        let mut h = harness();
        h.classifier
            .on_drag_start(&mut h.selection, ChatId::new(8), &h.list)
            .expect("drag starts");
        let effect = h.classifier.on_drop(
            &mut h.selection,
            Some(FolderFilter::Folder(FolderId::new(4))),
            &h.folders,
            &h.list,
        );
        assert_eq!(
            effect,
            DropEffect::Mutate(FolderMutation::BulkAdd {
                folder: FolderId::new(4),
                chats: vec![ExternalChatId::new(8)],
            })
        );
        assert_eq!(h.selection.gesture(), &Gesture::Idle);
        h.classifier.on_drag_end(&mut h.selection, &mut h.folders);
        assert!(!h.folders.drag_context().is_active());
    }

    #[test]
    fn drop_on_pseudo_folder_without_active_folder_is_noop() {
        let mut h = harness();
        h.classifier
            .on_drag_start(&mut h.selection, ChatId::new(7), &h.list)
            .expect("drag starts");
        let effect = h.classifier.on_drop(
            &mut h.selection,
            Some(FolderFilter::All),
            &h.folders,
            &h.list,
        );
        assert_eq!(effect, DropEffect::None);
    }

    #[test]
    fn partial_removal_from_active_folder_removes() {
        let mut h = harness();
        h.folders.set_active(FolderFilter::Folder(FolderId::new(3)));
        h.classifier
            .on_drag_start(&mut h.selection, ChatId::new(7), &h.list)
            .expect("drag starts");
        let effect = h.classifier.on_drop(
            &mut h.selection,
            Some(FolderFilter::All),
            &h.folders,
            &h.list,
        );
        assert_eq!(
            effect,
            DropEffect::Mutate(FolderMutation::BulkRemove {
                folder: FolderId::new(3),
                chats: vec![ExternalChatId::new(7)],
            })
        );
    }

    #[test]
    fn removing_whole_membership_asks_to_delete_folder() {
        let mut h = harness();
        let now = Instant::now();
        h.folders.set_active(FolderFilter::Folder(FolderId::new(3)));
        h.selection.on_row_click(ChatId::new(7), false, now);
        h.selection.on_row_click(ChatId::new(9), true, now);
        h.classifier
            .on_drag_start(&mut h.selection, ChatId::new(9), &h.list)
            .expect("drag starts");
        let effect = h.classifier.on_drop(
            &mut h.selection,
            Some(FolderFilter::All),
            &h.folders,
            &h.list,
        );
        assert_eq!(
            effect,
            DropEffect::Confirm(Confirmation::DeleteEmptiedFolder {
                folder: FolderId::new(3),
                title: "jobs".to_owned(),
            })
        );
    }

    #[test]
    fn malformed_transfer_is_ignored() {
        let h = harness();
        let foreign = DragTransfer {
            media_type: "text/plain".to_owned(),
            data: "[7]".to_owned(),
        };
        let garbled = DragTransfer {
            media_type: DRAG_MEDIA_TYPE.to_owned(),
            data: "{not json".to_owned(),
        };
        for transfer in [foreign, garbled] {
            assert_eq!(
                h.classifier.resolve_drop(
                    &transfer,
                    FolderFilter::Folder(FolderId::new(3)),
                    &h.folders,
                    &h.list,
                ),
                DropEffect::None
            );
        }
    }
}
