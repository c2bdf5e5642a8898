// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{AccountId, ChatItem, ExternalChatId, Folder, FolderId};

/// Store that owns chats and folder membership.
///
/// Membership calls always take external chat ids.
pub trait FolderService {
    fn list_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>>;
    fn list_folders(&mut self, account: AccountId) -> Result<Vec<Folder>>;
    fn create_folder(&mut self, account: AccountId, title: &str) -> Result<Folder>;
    fn rename_folder(&mut self, account: AccountId, folder: FolderId, title: &str) -> Result<()>;
    fn delete_folder(&mut self, account: AccountId, folder: FolderId) -> Result<()>;
    fn bulk_add_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()>;
    fn bulk_remove_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderMutation {
    Create {
        title: String,
    },
    Rename {
        folder: FolderId,
        title: String,
    },
    Delete {
        folder: FolderId,
    },
    BulkAdd {
        folder: FolderId,
        chats: Vec<ExternalChatId>,
    },
    BulkRemove {
        folder: FolderId,
        chats: Vec<ExternalChatId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Created(Folder),
    Renamed {
        folder: FolderId,
        title: String,
    },
    Deleted(FolderId),
    Added {
        folder: FolderId,
        chats: Vec<ExternalChatId>,
    },
    Removed {
        folder: FolderId,
        chats: Vec<ExternalChatId>,
    },
}

impl FolderMutation {
    pub fn apply<S>(&self, service: &mut S, account: AccountId) -> Result<MutationOutcome>
    where
        S: FolderService + ?Sized,
    {
        match self {
            Self::Create { title } => {
                let title = title.trim();
                if title.is_empty() {
                    bail!("folder title is empty -- type a name and retry");
                }
                service.create_folder(account, title).map(MutationOutcome::Created)
            }
            Self::Rename { folder, title } => {
                let title = title.trim();
                if title.is_empty() {
                    bail!("folder title is empty -- type a name and retry");
                }
                service.rename_folder(account, *folder, title)?;
                Ok(MutationOutcome::Renamed {
                    folder: *folder,
                    title: title.to_owned(),
                })
            }
            Self::Delete { folder } => {
                service.delete_folder(account, *folder)?;
                Ok(MutationOutcome::Deleted(*folder))
            }
            Self::BulkAdd { folder, chats } => {
                service.bulk_add_chats(account, *folder, chats)?;
                Ok(MutationOutcome::Added {
                    folder: *folder,
                    chats: chats.clone(),
                })
            }
            Self::BulkRemove { folder, chats } => {
                service.bulk_remove_chats(account, *folder, chats)?;
                Ok(MutationOutcome::Removed {
                    folder: *folder,
                    chats: chats.clone(),
                })
            }
        }
    }

    pub const fn failure_label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "Failed to create Telegram folder",
            Self::Rename { .. } => "Failed to rename Telegram folder",
            Self::Delete { .. } => "Failed to delete Telegram folder",
            Self::BulkAdd { .. } => "Failed to add chat to folder",
            Self::BulkRemove { .. } => "Failed to remove chat from folder",
        }
    }
}

impl MutationOutcome {
    pub fn status(&self) -> String {
        match self {
            Self::Created(_) => "Telegram folder created".to_owned(),
            Self::Renamed { .. } => "Telegram folder renamed".to_owned(),
            Self::Deleted(_) => "Telegram folder deleted".to_owned(),
            Self::Added { chats, .. } => format!("{} added to folder", counted_chats(chats.len())),
            Self::Removed { chats, .. } => {
                format!("{} removed from folder", counted_chats(chats.len()))
            }
        }
    }
}

fn counted_chats(count: usize) -> String {
    if count == 1 {
        "Chat".to_owned()
    } else {
        format!("{count} chats")
    }
}
