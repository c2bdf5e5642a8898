// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use chatfold_app::{
    AccountId, ChatId, ChatItem, ChatKind, ExternalChatId, Folder, FolderId, FolderService,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "chatfold";

/// Ids 0 and 1 belong to the pseudo-folder and the service's own default
/// filter; user folders start after them.
const FIRST_FOLDER_ID: i64 = 2;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "chats",
        &[
            "id",
            "account_id",
            "external_id",
            "name",
            "username",
            "entity_type",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "folders",
        &["account_id", "id", "title", "created_at", "updated_at"],
    ),
    (
        "folder_members",
        &["account_id", "folder_id", "external_id", "created_at"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_chats_account_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_chats_account_id ON chats (account_id);",
    },
    RequiredIndex {
        name: "idx_folder_members_external_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_folder_members_external_id ON folder_members (account_id, external_id);",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub external_id: ExternalChatId,
    pub name: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    /// Inserts or refreshes a chat, keyed by its external id.
    pub fn upsert_chat(&self, account: AccountId, chat: &NewChat) -> Result<ChatId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO chats (
                  account_id, external_id, name, username, entity_type,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (account_id, external_id) DO UPDATE SET
                  name = excluded.name,
                  username = excluded.username,
                  entity_type = excluded.entity_type,
                  updated_at = excluded.updated_at
                ",
                params![
                    account.get(),
                    chat.external_id.get(),
                    chat.name,
                    chat.username,
                    chat.kind.as_str(),
                    now,
                    now,
                ],
            )
            .with_context(|| format!("upsert chat {}", chat.external_id.get()))?;

        let id = self
            .conn
            .query_row(
                "SELECT id FROM chats WHERE account_id = ? AND external_id = ?",
                params![account.get(), chat.external_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .context("read upserted chat id")?;
        Ok(ChatId::new(id))
    }

    pub fn list_chats(&self, account: AccountId) -> Result<Vec<ChatItem>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, external_id, name, username, entity_type
                FROM chats
                WHERE account_id = ?
                ORDER BY id ASC
                ",
            )
            .context("prepare chats query")?;
        let rows = stmt
            .query_map(params![account.get()], |row| {
                let entity_type: String = row.get(4)?;
                let kind = ChatKind::parse(&entity_type).ok_or_else(|| {
                    to_sql_error(anyhow!(
                        "unknown chat type {entity_type:?}; expected User, Group, or Channel"
                    ))
                })?;
                Ok(ChatItem {
                    id: ChatId::new(row.get(0)?),
                    external_id: ExternalChatId::new(row.get(1)?),
                    display_name: row.get(2)?,
                    handle: row.get(3)?,
                    kind,
                })
            })
            .context("query chats")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect chats")
    }

    pub fn list_folders(&self, account: AccountId) -> Result<Vec<Folder>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, title
                FROM folders
                WHERE account_id = ?
                ORDER BY id ASC
                ",
            )
            .context("prepare folders query")?;
        let rows = stmt
            .query_map(params![account.get()], |row| {
                Ok(Folder::new(
                    FolderId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                ))
            })
            .context("query folders")?;
        let mut folders = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect folders")?;

        let mut members = self.folder_members(account)?;
        for folder in &mut folders {
            if let Some(ids) = members.remove(&folder.id) {
                folder.members = ids;
            }
        }
        Ok(folders)
    }

    fn folder_members(
        &self,
        account: AccountId,
    ) -> Result<BTreeMap<FolderId, BTreeSet<ExternalChatId>>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT folder_id, external_id
                FROM folder_members
                WHERE account_id = ?
                ",
            )
            .context("prepare folder members query")?;
        let rows = stmt
            .query_map(params![account.get()], |row| {
                Ok((
                    FolderId::new(row.get(0)?),
                    ExternalChatId::new(row.get(1)?),
                ))
            })
            .context("query folder members")?;

        let mut members = BTreeMap::<FolderId, BTreeSet<ExternalChatId>>::new();
        for row in rows {
            let (folder, chat) = row.context("read folder member")?;
            members.entry(folder).or_default().insert(chat);
        }
        Ok(members)
    }

    pub fn create_folder(&self, account: AccountId, title: &str) -> Result<Folder> {
        let title = require_title(title)?;
        let next_id: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(id) + 1, ?) FROM folders WHERE account_id = ?",
                params![FIRST_FOLDER_ID, account.get()],
                |row| row.get(0),
            )
            .context("allocate folder id")?;
        let id = next_id.max(FIRST_FOLDER_ID);

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO folders (account_id, id, title, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![account.get(), id, title, now, now],
            )
            .with_context(|| format!("insert folder {title:?}"))?;
        tracing::debug!(account = account.get(), folder = id, "folder created");
        Ok(Folder::new(FolderId::new(id), title))
    }

    pub fn rename_folder(&self, account: AccountId, folder: FolderId, title: &str) -> Result<()> {
        let title = require_title(title)?;
        let now = now_rfc3339()?;
        let changed = self
            .conn
            .execute(
                "
                UPDATE folders
                SET title = ?, updated_at = ?
                WHERE account_id = ? AND id = ?
                ",
                params![title, now, account.get(), folder.get()],
            )
            .with_context(|| format!("rename folder {}", folder.get()))?;
        if changed == 0 {
            bail!(missing_folder(folder));
        }
        Ok(())
    }

    pub fn delete_folder(&self, account: AccountId, folder: FolderId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM folders WHERE account_id = ? AND id = ?",
                params![account.get(), folder.get()],
            )
            .with_context(|| format!("delete folder {}", folder.get()))?;
        if changed == 0 {
            bail!(missing_folder(folder));
        }
        Ok(())
    }

    /// Adds members; chats already in the folder are left alone.
    pub fn bulk_add_chats(
        &self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.require_folder(account, folder)?;
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin bulk add")?;
        for chat in chats {
            tx.execute(
                "
                INSERT OR IGNORE INTO folder_members (account_id, folder_id, external_id, created_at)
                VALUES (?, ?, ?, ?)
                ",
                params![account.get(), folder.get(), chat.get(), now],
            )
            .with_context(|| format!("add chat {} to folder {}", chat.get(), folder.get()))?;
        }
        tx.commit().context("commit bulk add")
    }

    pub fn bulk_remove_chats(
        &self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.require_folder(account, folder)?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin bulk remove")?;
        for chat in chats {
            tx.execute(
                "
                DELETE FROM folder_members
                WHERE account_id = ? AND folder_id = ? AND external_id = ?
                ",
                params![account.get(), folder.get(), chat.get()],
            )
            .with_context(|| {
                format!("remove chat {} from folder {}", chat.get(), folder.get())
            })?;
        }
        tx.commit().context("commit bulk remove")
    }

    fn require_folder(&self, account: AccountId, folder: FolderId) -> Result<()> {
        let found = self
            .conn
            .query_row(
                "SELECT id FROM folders WHERE account_id = ? AND id = ?",
                params![account.get(), folder.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .with_context(|| format!("look up folder {}", folder.get()))?;
        if found.is_none() {
            bail!(missing_folder(folder));
        }
        Ok(())
    }
}

impl FolderService for Store {
    fn list_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>> {
        Store::list_chats(self, account)
    }

    fn list_folders(&mut self, account: AccountId) -> Result<Vec<Folder>> {
        Store::list_folders(self, account)
    }

    fn create_folder(&mut self, account: AccountId, title: &str) -> Result<Folder> {
        Store::create_folder(self, account, title)
    }

    fn rename_folder(&mut self, account: AccountId, folder: FolderId, title: &str) -> Result<()> {
        Store::rename_folder(self, account, folder, title)
    }

    fn delete_folder(&mut self, account: AccountId, folder: FolderId) -> Result<()> {
        Store::delete_folder(self, account, folder)
    }

    fn bulk_add_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        Store::bulk_add_chats(self, account, folder, chats)
    }

    fn bulk_remove_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        Store::bulk_remove_chats(self, account, folder, chats)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("CHATFOLD_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set CHATFOLD_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("chatfold.db"))
}

/// Rejects URI forms; SQLite would otherwise treat them as options.
pub fn validate_db_path(path: &str) -> Result<()> {
    match path {
        "" => bail!("database path is empty -- set [backend].db_path or CHATFOLD_DB_PATH"),
        ":memory:" => return Ok(()),
        _ => {}
    }

    let uri_scheme = path
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty() && scheme.chars().all(char::is_alphabetic));
    let problem = if let Some(scheme) = uri_scheme {
        format!("is a {scheme}:// URI")
    } else if path.starts_with("file:") {
        "uses file: URI syntax".to_owned()
    } else if path.contains('?') {
        "carries query parameters".to_owned()
    } else {
        return Ok(());
    };
    bail!("database path {path:?} {problem}; pass a plain filesystem path instead")
}

fn require_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        bail!("folder title must not be empty -- type a name and retry");
    }
    Ok(title)
}

fn missing_folder(folder: FolderId) -> String {
    format!(
        "folder {} no longer exists -- reload folders and retry",
        folder.get()
    )
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%')",
        [],
        |row| row.get::<_, bool>(0),
    )
    .context("look for existing tables")
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required) in REQUIRED_SCHEMA {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            bail!(
                "database is missing required table `{table}`; use a chatfold database or point CHATFOLD_DB_PATH elsewhere"
            );
        }

        let missing = required
            .iter()
            .filter(|column| !present.contains(**column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            bail!(
                "table `{table}` lacks columns {}; this database predates chatfold's schema, move it aside and restart",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    REQUIRED_INDEXES.iter().try_for_each(|index| {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("create index `{}`", index.name))
    })
}

/// Column names of `table`; empty when the table does not exist.
fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .with_context(|| format!("inspect table {table}"))?;
    let names = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))
        .with_context(|| format!("read columns of {table}"))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("read columns of {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )
    .context("set connection pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    let source: Box<dyn std::error::Error + Send + Sync> = error.into();
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, source)
}
