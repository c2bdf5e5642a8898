// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use chatfold_app::{
    AccountId, ChatId, ChatItem, ChatKind, ExternalChatId, Folder, FolderId, FolderService,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CHANNEL_TOPICS: [&str; 12] = [
    "Rust", "Golang", "Python", "Frontend", "Backend", "DevOps", "Data", "ML", "Mobile", "QA",
    "Security", "Embedded",
];
const CHANNEL_SUFFIXES: [&str; 6] = ["Jobs", "Vacancies", "Careers", "Hiring", "Remote", "Work"];
const GROUP_NAMES: [&str; 8] = [
    "Relocation chat",
    "Remote workers",
    "Freelance board",
    "Startup founders",
    "Meetup crew",
    "Interview prep",
    "Salary talk",
    "Career swap",
];

const FOLDER_TITLES: [&str; 10] = [
    "jobs",
    "rust",
    "remote",
    "friends",
    "recruiters",
    "archive",
    "news",
    "later",
    "europe",
    "freelance",
];

const CHANNEL_ID_BASE: i64 = -1_001_000_000_000;

/// Chat as it would arrive from the dialog store, before a local id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeChat {
    pub external_id: ExternalChatId,
    pub name: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct ChatFaker {
    rng: DeterministicRng,
    seed: u64,
    next_external: i64,
}

impl ChatFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            next_external: 1,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// External ids are unique per faker; channels and groups get the
    /// negative ids Telegram uses for them.
    pub fn chat(&mut self) -> FakeChat {
        let serial = self.next_external;
        self.next_external += 1;

        match self.int_n(3) {
            0 => {
                let first = self.pick(&FIRST_NAMES);
                let last = self.pick(&LAST_NAMES);
                let username = (self.int_n(3) != 0)
                    .then(|| format!("{}_{}", first.to_lowercase(), last.to_lowercase()));
                FakeChat {
                    external_id: ExternalChatId::new(serial),
                    name: format!("{first} {last}"),
                    username,
                    kind: ChatKind::Person,
                }
            }
            1 => {
                let name = self.pick(&GROUP_NAMES);
                FakeChat {
                    external_id: ExternalChatId::new(-serial),
                    name: name.to_owned(),
                    username: None,
                    kind: ChatKind::Group,
                }
            }
            _ => {
                let topic = self.pick(&CHANNEL_TOPICS);
                let suffix = self.pick(&CHANNEL_SUFFIXES);
                FakeChat {
                    external_id: ExternalChatId::new(CHANNEL_ID_BASE - serial),
                    name: format!("{topic} {suffix}"),
                    username: Some(format!(
                        "{}{}",
                        topic.to_lowercase(),
                        suffix.to_lowercase()
                    )),
                    kind: ChatKind::Channel,
                }
            }
        }
    }

    /// `count` chats with local ids `1..=count` in list order.
    pub fn chat_items(&mut self, count: usize) -> Vec<ChatItem> {
        (1..=count)
            .map(|index| {
                let chat = self.chat();
                ChatItem {
                    id: ChatId::new(index as i64),
                    external_id: chat.external_id,
                    display_name: chat.name,
                    handle: chat.username,
                    kind: chat.kind,
                }
            })
            .collect()
    }

    pub fn folder_title(&mut self) -> String {
        self.pick(&FOLDER_TITLES).to_owned()
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.int_n(values.len())]
    }
}

/// Plain chat with matching local and external ids.
pub fn chat(id: i64, name: &str) -> ChatItem {
    ChatItem {
        id: ChatId::new(id),
        external_id: ExternalChatId::new(id),
        display_name: name.to_owned(),
        handle: None,
        kind: ChatKind::Person,
    }
}

pub fn folder(id: i64, title: &str, members: &[i64]) -> Folder {
    let mut folder = Folder::new(FolderId::new(id), title);
    folder.members = members.iter().copied().map(ExternalChatId::new).collect();
    folder
}

/// One call observed by [`RecordingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListChats,
    ListFolders,
    CreateFolder(String),
    RenameFolder(FolderId, String),
    DeleteFolder(FolderId),
    BulkAdd(FolderId, Vec<ExternalChatId>),
    BulkRemove(FolderId, Vec<ExternalChatId>),
}

/// In-memory folder service that records every call it receives.
#[derive(Debug, Clone)]
pub struct RecordingService {
    pub account: AccountId,
    pub chats: Vec<ChatItem>,
    pub folders: BTreeMap<FolderId, Folder>,
    pub calls: Vec<ServiceCall>,
    failure: Option<String>,
}

impl RecordingService {
    pub fn new(account: AccountId, chats: Vec<ChatItem>, folders: Vec<Folder>) -> Self {
        Self {
            account,
            chats,
            folders: folders
                .into_iter()
                .map(|folder| (folder.id, folder))
                .collect(),
            calls: Vec::new(),
            failure: None,
        }
    }

    /// Makes the next call fail with `message`.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.get(&id)
    }

    fn record(&mut self, account: AccountId, call: ServiceCall) -> Result<()> {
        self.calls.push(call);
        if let Some(message) = self.failure.take() {
            bail!(message);
        }
        if account != self.account {
            bail!(
                "account {} is not linked -- pick account {}",
                account.get(),
                self.account.get()
            );
        }
        Ok(())
    }

    fn folder_mut(&mut self, id: FolderId) -> Result<&mut Folder> {
        self.folders
            .get_mut(&id)
            .with_context(|| format!("folder {} not found -- reload folders", id.get()))
    }
}

impl FolderService for RecordingService {
    fn list_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>> {
        self.record(account, ServiceCall::ListChats)?;
        Ok(self.chats.clone())
    }

    fn list_folders(&mut self, account: AccountId) -> Result<Vec<Folder>> {
        self.record(account, ServiceCall::ListFolders)?;
        Ok(self.folders.values().cloned().collect())
    }

    fn create_folder(&mut self, account: AccountId, title: &str) -> Result<Folder> {
        self.record(account, ServiceCall::CreateFolder(title.to_owned()))?;
        let next = self
            .folders
            .keys()
            .next_back()
            .map_or(2, |id| id.get() + 1)
            .max(2);
        let folder = Folder::new(FolderId::new(next), title);
        self.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    fn rename_folder(&mut self, account: AccountId, folder: FolderId, title: &str) -> Result<()> {
        self.record(account, ServiceCall::RenameFolder(folder, title.to_owned()))?;
        self.folder_mut(folder)?.title = title.to_owned();
        Ok(())
    }

    fn delete_folder(&mut self, account: AccountId, folder: FolderId) -> Result<()> {
        self.record(account, ServiceCall::DeleteFolder(folder))?;
        self.folders
            .remove(&folder)
            .map(|_| ())
            .with_context(|| format!("folder {} not found -- reload folders", folder.get()))
    }

    fn bulk_add_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.record(account, ServiceCall::BulkAdd(folder, chats.to_vec()))?;
        self.folder_mut(folder)?.members.extend(chats.iter().copied());
        Ok(())
    }

    fn bulk_remove_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.record(account, ServiceCall::BulkRemove(folder, chats.to_vec()))?;
        let target = self.folder_mut(folder)?;
        target.members = target.members_after_removing(chats);
        Ok(())
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("chatfold.db");
    Ok((dir, db_path))
}
