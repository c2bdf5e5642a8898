// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use chatfold_app::{
    AccountId, ExternalChatId, FolderId, FolderMutation, FolderService, MutationOutcome,
};
use chatfold_db::{NewChat, Store, validate_db_path};
use chatfold_testkit::{ChatFaker, temp_db_path};

const ACCOUNT: AccountId = AccountId::new(1);

fn seeded_store(count: usize) -> Result<(Store, Vec<ExternalChatId>)> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let mut faker = ChatFaker::new(11);
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let fake = faker.chat();
        store.upsert_chat(
            ACCOUNT,
            &NewChat {
                external_id: fake.external_id,
                name: fake.name,
                username: fake.username,
                kind: fake.kind,
            },
        )?;
        ids.push(fake.external_id);
    }
    Ok((store, ids))
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/chatfold.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.create_folder(ACCOUNT, "jobs")?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    let folders = store.list_folders(ACCOUNT)?;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].title, "jobs");
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.raw_connection().execute_batch(
        "
            DROP TABLE folder_members;
            DROP TABLE folders;
            CREATE TABLE folders (
              account_id INTEGER NOT NULL,
              id INTEGER NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE TABLE folder_members (
              account_id INTEGER NOT NULL,
              folder_id INTEGER NOT NULL,
              external_id INTEGER NOT NULL,
              created_at TEXT NOT NULL
            );
        ",
    )?;

    let error = store
        .bootstrap()
        .expect_err("missing title column should be rejected");
    let message = format!("{error:#}");
    assert!(message.contains("`folders`"), "unexpected error: {message}");
    assert!(message.contains("title"), "unexpected error: {message}");
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")?;

    let error = store
        .bootstrap()
        .expect_err("unrelated database should be rejected");
    assert!(format!("{error:#}").contains("missing required table `chats`"));
    Ok(())
}

#[test]
fn chats_list_in_insertion_order_per_account() -> Result<()> {
    let (store, ids) = seeded_store(5)?;
    store.upsert_chat(
        AccountId::new(2),
        &NewChat {
            external_id: ExternalChatId::new(999),
            name: "elsewhere".to_owned(),
            username: None,
            kind: chatfold_app::ChatKind::Person,
        },
    )?;

    let chats = store.list_chats(ACCOUNT)?;
    let external = chats.iter().map(|chat| chat.external_id).collect::<Vec<_>>();
    assert_eq!(external, ids);
    assert!(chats.windows(2).all(|pair| pair[0].id < pair[1].id));
    Ok(())
}

#[test]
fn folder_ids_start_after_reserved_ids() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let first = store.create_folder(ACCOUNT, "  jobs  ")?;
    let second = store.create_folder(ACCOUNT, "rust")?;
    let other = store.create_folder(AccountId::new(2), "mine")?;

    assert_eq!(first.id, FolderId::new(2));
    assert_eq!(first.title, "jobs");
    assert_eq!(second.id, FolderId::new(3));
    assert_eq!(other.id, FolderId::new(2));
    assert!(store.create_folder(ACCOUNT, "   ").is_err());
    Ok(())
}

#[test]
fn bulk_add_is_idempotent_and_remove_is_selective() -> Result<()> {
    let (store, ids) = seeded_store(4)?;
    let folder = store.create_folder(ACCOUNT, "jobs")?;

    store.bulk_add_chats(ACCOUNT, folder.id, &ids[..3])?;
    store.bulk_add_chats(ACCOUNT, folder.id, &ids[..3])?;
    let members = &store.list_folders(ACCOUNT)?[0].members;
    assert_eq!(members.len(), 3);

    store.bulk_remove_chats(ACCOUNT, folder.id, &ids[..1])?;
    let members = store.list_folders(ACCOUNT)?[0].members.clone();
    assert_eq!(members.len(), 2);
    assert!(!members.contains(&ids[0]));
    assert!(members.contains(&ids[1]));
    assert!(members.contains(&ids[2]));
    Ok(())
}

#[test]
fn delete_folder_cascades_members() -> Result<()> {
    let (store, ids) = seeded_store(2)?;
    let folder = store.create_folder(ACCOUNT, "jobs")?;
    store.bulk_add_chats(ACCOUNT, folder.id, &ids)?;

    store.delete_folder(ACCOUNT, folder.id)?;

    assert!(store.list_folders(ACCOUNT)?.is_empty());
    let orphans: i64 = store.raw_connection().query_row(
        "SELECT COUNT(*) FROM folder_members",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(orphans, 0);
    Ok(())
}

#[test]
fn missing_folder_errors_are_actionable() -> Result<()> {
    let (store, ids) = seeded_store(1)?;
    let missing = FolderId::new(42);

    for error in [
        store.rename_folder(ACCOUNT, missing, "x").expect_err("rename"),
        store.delete_folder(ACCOUNT, missing).expect_err("delete"),
        store.bulk_add_chats(ACCOUNT, missing, &ids).expect_err("add"),
        store
            .bulk_remove_chats(ACCOUNT, missing, &ids)
            .expect_err("remove"),
    ] {
        let message = format!("{error:#}");
        assert!(
            message.contains("reload folders and retry"),
            "unexpected error: {message}"
        );
    }
    Ok(())
}

#[test]
fn folder_mutations_apply_through_service_trait() -> Result<()> {
    let (mut store, ids) = seeded_store(3)?;

    let created = FolderMutation::Create {
        title: "jobs".to_owned(),
    }
    .apply(&mut store, ACCOUNT)?;
    let MutationOutcome::Created(folder) = created else {
        anyhow::bail!("expected a created outcome");
    };

    FolderMutation::BulkAdd {
        folder: folder.id,
        chats: ids.clone(),
    }
    .apply(&mut store, ACCOUNT)?;
    FolderMutation::Rename {
        folder: folder.id,
        title: "work".to_owned(),
    }
    .apply(&mut store, ACCOUNT)?;

    let listed = FolderService::list_folders(&mut store, ACCOUNT)?;
    let stored = listed
        .iter()
        .find(|candidate| candidate.id == folder.id)
        .context("created folder should be listed")?;
    assert_eq!(stored.title, "work");
    assert_eq!(stored.members.len(), 3);

    FolderMutation::Delete { folder: folder.id }.apply(&mut store, ACCOUNT)?;
    assert!(FolderService::list_folders(&mut store, ACCOUNT)?.is_empty());
    Ok(())
}
