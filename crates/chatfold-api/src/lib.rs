// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use chatfold_app::{
    AccountId, ChatId, ChatItem, ChatKind, ExternalChatId, Folder, FolderId, FolderService,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("backend.base_url must not be empty");
        }
        let parsed = Url::parse(trimmed)
            .with_context(|| format!("backend.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "backend.base_url {trimmed:?} uses scheme {:?} -- use http:// or https://",
                parsed.scheme()
            );
        }
        let base_url = trimmed
            .strip_suffix(API_PREFIX)
            .unwrap_or(trimmed)
            .to_owned();

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            token: token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Chats of `account`, in the order the service lists them.
    pub fn list_chats(&self, account: AccountId) -> Result<Vec<ChatItem>> {
        let dialogs: Vec<DialogPayload> = self.fetch(self.http.get(self.endpoint("/dialogs")))?;
        dialogs
            .into_iter()
            .filter(|dialog| dialog.account_id == account.get())
            .map(DialogPayload::into_chat)
            .collect()
    }

    pub fn list_folders(&self, account: AccountId) -> Result<Vec<Folder>> {
        let folders: Vec<FolderPayload> = self.fetch(
            self.http
                .get(self.endpoint("/telegram/folders"))
                .query(&[("account_id", account.get())]),
        )?;
        Ok(folders.into_iter().map(FolderPayload::into_folder).collect())
    }

    pub fn create_folder(&self, account: AccountId, title: &str) -> Result<Folder> {
        let created: FolderPayload = self.fetch(
            self.http
                .post(self.endpoint("/telegram/folder/create"))
                .json(&CreateRequest {
                    account_id: account.get(),
                    title,
                }),
        )?;
        Ok(created.into_folder())
    }

    pub fn rename_folder(&self, account: AccountId, folder: FolderId, title: &str) -> Result<()> {
        self.execute(
            self.http
                .patch(self.endpoint("/telegram/folder/rename"))
                .json(&RenameRequest {
                    account_id: account.get(),
                    folder_id: folder.get(),
                    title,
                }),
        )
    }

    pub fn delete_folder(&self, account: AccountId, folder: FolderId) -> Result<()> {
        self.execute(
            self.http
                .delete(self.endpoint(&format!("/telegram/folder/{}", folder.get())))
                .query(&[("account_id", account.get())]),
        )
    }

    pub fn bulk_add_chats(
        &self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.execute(
            self.http
                .post(self.endpoint("/telegram/folder/bulk-add"))
                .json(&BulkRequest::new(account, folder, chats)),
        )
    }

    pub fn bulk_remove_chats(
        &self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        self.execute(
            self.http
                .post(self.endpoint("/telegram/folder/bulk-remove"))
                .json(&BulkRequest::new(account, folder, chats)),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request)?;
        let url = response.url().path().to_owned();
        response
            .json()
            .with_context(|| format!("decode response from {url}"))
    }

    fn execute(&self, request: RequestBuilder) -> Result<()> {
        let response = self.send(request)?;
        tracing::debug!(
            status = response.status().as_u16(),
            path = response.url().path(),
            "backend call finished"
        );
        Ok(())
    }
}

impl FolderService for Client {
    fn list_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>> {
        Client::list_chats(self, account)
    }

    fn list_folders(&mut self, account: AccountId) -> Result<Vec<Folder>> {
        Client::list_folders(self, account)
    }

    fn create_folder(&mut self, account: AccountId, title: &str) -> Result<Folder> {
        Client::create_folder(self, account, title)
    }

    fn rename_folder(&mut self, account: AccountId, folder: FolderId, title: &str) -> Result<()> {
        Client::rename_folder(self, account, folder, title)
    }

    fn delete_folder(&mut self, account: AccountId, folder: FolderId) -> Result<()> {
        Client::delete_folder(self, account, folder)
    }

    fn bulk_add_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        Client::bulk_add_chats(self, account, folder, chats)
    }

    fn bulk_remove_chats(
        &mut self,
        account: AccountId,
        folder: FolderId,
        chats: &[ExternalChatId],
    ) -> Result<()> {
        Client::bulk_remove_chats(self, account, folder, chats)
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check backend.base_url and that the service is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    if status == StatusCode::UNAUTHORIZED {
        return anyhow!("server returned 401 -- set backend.token to a valid access token");
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

impl ErrorEnvelope {
    fn message(self) -> Option<String> {
        let detail = match self.detail {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => Some(detail),
            _ => None,
        };
        detail.or(self.message.filter(|message| !message.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct DialogPayload {
    id: i64,
    account_id: i64,
    entity_type: String,
    #[serde(default)]
    telegram_id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl DialogPayload {
    fn into_chat(self) -> Result<ChatItem> {
        let kind = ChatKind::parse(&self.entity_type).ok_or_else(|| {
            anyhow!(
                "dialog {} has unknown entity_type {:?}; expected User, Group, or Channel",
                self.id,
                self.entity_type
            )
        })?;
        Ok(ChatItem {
            id: ChatId::new(self.id),
            external_id: ExternalChatId::new(self.telegram_id.unwrap_or(self.id)),
            display_name: self.name.unwrap_or_default(),
            handle: self.username.filter(|username| !username.is_empty()),
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FolderPayload {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    chat_ids: Vec<i64>,
}

impl FolderPayload {
    fn into_folder(self) -> Folder {
        let mut folder = Folder::new(FolderId::new(self.id), self.title);
        folder.members = self.chat_ids.into_iter().map(ExternalChatId::new).collect();
        folder
    }
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    account_id: i64,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct RenameRequest<'a> {
    account_id: i64,
    folder_id: i64,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct BulkRequest {
    account_id: i64,
    folder_id: i64,
    chat_ids: Vec<i64>,
}

impl BulkRequest {
    fn new(account: AccountId, folder: FolderId, chats: &[ExternalChatId]) -> Self {
        Self {
            account_id: account.get(),
            folder_id: folder.get(),
            chat_ids: chats.iter().map(|chat| chat.get()).collect(),
        }
    }
}
