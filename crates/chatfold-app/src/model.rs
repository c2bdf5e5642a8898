// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::*;

pub const PSEUDO_FOLDER_ID: FolderId = FolderId::new(0);
pub const PSEUDO_FOLDER_TITLE: &str = "All";
/// Title the remote service reports for its built-in default filter.
pub const SERVICE_DEFAULT_FOLDER_TITLE: &str = "All Chats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Person,
    Group,
    Channel,
}

impl ChatKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "User",
            Self::Group => "Group",
            Self::Channel => "Channel",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "User" | "user" | "person" => Some(Self::Person),
            "Group" | "group" | "Chat" | "chat" => Some(Self::Group),
            "Channel" | "channel" => Some(Self::Channel),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatItem {
    pub id: ChatId,
    pub external_id: ExternalChatId,
    pub display_name: String,
    pub handle: Option<String>,
    pub kind: ChatKind,
}

impl ChatItem {
    pub fn title(&self) -> &str {
        if !self.display_name.trim().is_empty() {
            return &self.display_name;
        }
        match self.handle.as_deref() {
            Some(handle) if !handle.is_empty() => handle,
            _ => "Unknown",
        }
    }

    /// `@handle` when both a name and a handle exist, otherwise the kind.
    pub fn subtitle(&self) -> String {
        match self.handle.as_deref() {
            Some(handle) if !handle.is_empty() && !self.display_name.trim().is_empty() => {
                format!("@{handle}")
            }
            _ => self.kind.label().to_owned(),
        }
    }

    pub fn initials(&self) -> String {
        let parts = self.title().split_whitespace().collect::<Vec<_>>();
        match parts.as_slice() {
            [] => "?".to_owned(),
            [single] => single.chars().take(2).collect::<String>().to_uppercase(),
            [first, .., last] => first
                .chars()
                .take(1)
                .chain(last.chars().take(1))
                .collect::<String>()
                .to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub title: String,
    pub members: BTreeSet<ExternalChatId>,
}

impl Folder {
    pub fn new(id: FolderId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            members: BTreeSet::new(),
        }
    }

    pub fn contains(&self, chat: ExternalChatId) -> bool {
        self.members.contains(&chat)
    }

    /// Entries the service reports for its default filter; the view renders
    /// its own pseudo-folder instead.
    pub fn is_service_default(&self) -> bool {
        self.id == PSEUDO_FOLDER_ID || self.title == SERVICE_DEFAULT_FOLDER_TITLE
    }

    pub fn members_after_removing(&self, chats: &[ExternalChatId]) -> BTreeSet<ExternalChatId> {
        let removed = chats.iter().copied().collect::<BTreeSet<_>>();
        self.members.difference(&removed).copied().collect()
    }
}

/// Active folder filter, or a drop target on the folder bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FolderFilter {
    #[default]
    All,
    Folder(FolderId),
}

impl FolderFilter {
    pub fn from_id(id: FolderId) -> Self {
        if id == PSEUDO_FOLDER_ID {
            Self::All
        } else {
            Self::Folder(id)
        }
    }

    pub const fn folder_id(self) -> Option<FolderId> {
        match self {
            Self::All => None,
            Self::Folder(id) => Some(id),
        }
    }

    pub const fn is_pseudo(self) -> bool {
        matches!(self, Self::All)
    }
}
