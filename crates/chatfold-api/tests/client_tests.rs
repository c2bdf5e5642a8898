// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use chatfold_api::Client;
use chatfold_app::{AccountId, ExternalChatId, FolderId, FolderMutation, MutationOutcome};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn header_value(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

#[test]
fn unreachable_backend_error_is_actionable() {
    let client = Client::new("http://127.0.0.1:1", None, Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .list_folders(AccountId::new(1))
        .expect_err("listing should fail for unreachable endpoint");
    assert!(error.to_string().contains("check backend.base_url"));
}

#[test]
fn list_chats_filters_account_and_sends_bearer_token() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/v1/dialogs");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(
            header_value(&request, "Authorization").as_deref(),
            Some("Bearer secret")
        );
        let body = r#"[
            {"id":1,"account_id":7,"entity_type":"User","name":"Avery Walker","username":"avery"},
            {"id":2,"account_id":8,"entity_type":"Group","name":"Elsewhere"},
            {"id":3,"account_id":7,"entity_type":"Channel","name":"Rust Jobs","telegram_id":-1001}
        ]"#;
        request
            .respond(
                Response::from_string(body)
                    .with_status_code(200)
                    .with_header(json_header()),
            )
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("secret"), Duration::from_secs(1))?;
    let chats = client.list_chats(AccountId::new(7))?;
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].handle.as_deref(), Some("avery"));
    assert_eq!(chats[1].external_id, ExternalChatId::new(-1001));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn folder_calls_hit_expected_endpoints() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0..5 {
            let mut request = server.recv().expect("request expected");
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("request body should be readable");
            seen.push((request.method().to_string(), request.url().to_owned(), body));

            let reply = if request.url() == "/api/v1/telegram/folders?account_id=7" {
                r#"[{"id":2,"title":"jobs","chat_ids":[-1001,5]}]"#
            } else if request.url() == "/api/v1/telegram/folder/create" {
                r#"{"id":3,"title":"rust"}"#
            } else {
                r#"{"status":"success"}"#
            };
            request
                .respond(
                    Response::from_string(reply)
                        .with_status_code(200)
                        .with_header(json_header()),
                )
                .expect("response should succeed");
        }
        seen
    });

    let mut client = Client::new(&addr, None, Duration::from_secs(1))?;
    let account = AccountId::new(7);

    let folders = client.list_folders(account)?;
    assert_eq!(folders.len(), 1);
    assert!(folders[0].contains(ExternalChatId::new(-1001)));

    let created = FolderMutation::Create {
        title: " rust ".to_owned(),
    }
    .apply(&mut client, account)?;
    match created {
        MutationOutcome::Created(folder) => {
            assert_eq!(folder.id, FolderId::new(3));
            assert!(folder.members.is_empty());
        }
        other => return Err(anyhow!("unexpected outcome {other:?}")),
    }

    client.rename_folder(account, FolderId::new(3), "rustlang")?;
    client.bulk_add_chats(
        account,
        FolderId::new(3),
        &[ExternalChatId::new(-1001), ExternalChatId::new(5)],
    )?;
    client.delete_folder(account, FolderId::new(3))?;

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[1].0, "POST");
    assert_eq!(seen[1].1, "/api/v1/telegram/folder/create");
    let create: serde_json::Value = serde_json::from_str(&seen[1].2)?;
    assert_eq!(create["title"], "rust");
    assert_eq!(create["account_id"], 7);

    assert_eq!(seen[2].0, "PATCH");
    assert_eq!(seen[2].1, "/api/v1/telegram/folder/rename");

    assert_eq!(seen[3].1, "/api/v1/telegram/folder/bulk-add");
    let bulk: serde_json::Value = serde_json::from_str(&seen[3].2)?;
    assert_eq!(bulk["chat_ids"], serde_json::json!([-1001, 5]));
    assert_eq!(bulk["folder_id"], 3);

    assert_eq!(seen[4].0, "DELETE");
    assert_eq!(seen[4].1, "/api/v1/telegram/folder/3?account_id=7");
    Ok(())
}

#[test]
fn server_detail_is_surfaced() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/v1/telegram/folder/bulk-remove");
        request
            .respond(
                Response::from_string(r#"{"detail":"Folder 9 not found"}"#)
                    .with_status_code(404)
                    .with_header(json_header()),
            )
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let error = client
        .bulk_remove_chats(AccountId::new(1), FolderId::new(9), &[ExternalChatId::new(1)])
        .expect_err("404 should fail");
    assert_eq!(error.to_string(), "server error (404): Folder 9 not found");

    handle.join().expect("server thread should join");
    Ok(())
}
