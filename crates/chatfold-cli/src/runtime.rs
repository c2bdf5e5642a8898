// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use chatfold_app::{AccountId, ChatItem, Folder, FolderMutation, FolderService, MutationOutcome};
use chatfold_db::{NewChat, Store};
use chatfold_testkit::ChatFaker;
use chatfold_tui::{InternalEvent, OrganizerRuntime};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

const DEMO_SEED: u64 = 20_240_611;
const DEMO_CHATS: usize = 48;
const DEMO_FOLDERS: usize = 4;

/// A queued mutation plus the channel its result goes back on.
struct MutationJob {
    request_id: u64,
    account: AccountId,
    mutation: FolderMutation,
    reply: Sender<InternalEvent>,
}

/// Runs folder mutations on one worker thread so slow backends never block
/// input. Jobs apply in the order they were requested.
pub struct ServiceRuntime<S> {
    service: Arc<Mutex<S>>,
    queue: Option<Sender<MutationJob>>,
}

impl<S> ServiceRuntime<S>
where
    S: FolderService + Send + 'static,
{
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            queue: None,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.service
            .lock()
            .map_err(|_| anyhow!("folder service lock poisoned -- restart chatfold"))
    }

    /// Starts the worker on first use. It exits once the runtime is dropped.
    fn queue(&mut self) -> Result<&Sender<MutationJob>> {
        if self.queue.is_none() {
            let (tx, rx) = mpsc::channel::<MutationJob>();
            let service = Arc::clone(&self.service);
            thread::Builder::new()
                .name("chatfold-mutations".to_owned())
                .spawn(move || drain_mutations(&service, &rx))
                .context("spawn mutation worker")?;
            self.queue = Some(tx);
        }
        self.queue
            .as_ref()
            .ok_or_else(|| anyhow!("mutation worker unavailable -- restart chatfold"))
    }
}

fn drain_mutations<S: FolderService>(service: &Mutex<S>, jobs: &Receiver<MutationJob>) {
    for job in jobs {
        let result = match service.lock() {
            Ok(mut guard) => job
                .mutation
                .apply(&mut *guard, job.account)
                .map_err(|error| format!("{error:#}")),
            Err(_) => Err("folder service lock poisoned".to_owned()),
        };
        let finished = InternalEvent::MutationFinished {
            request_id: job.request_id,
            result,
        };
        if job.reply.send(finished).is_err() {
            tracing::debug!(request_id = job.request_id, "mutation result dropped after shutdown");
        }
    }
    tracing::debug!("mutation worker stopped");
}

impl<S> OrganizerRuntime for ServiceRuntime<S>
where
    S: FolderService + Send + 'static,
{
    fn load_chats(&mut self, account: AccountId) -> Result<Vec<ChatItem>> {
        self.lock()?.list_chats(account)
    }

    fn load_folders(&mut self, account: AccountId) -> Result<Vec<Folder>> {
        self.lock()?.list_folders(account)
    }

    fn apply_mutation(
        &mut self,
        account: AccountId,
        mutation: &FolderMutation,
    ) -> Result<MutationOutcome> {
        let mut service = self.lock()?;
        mutation.apply(&mut *service, account)
    }

    fn spawn_mutation(
        &mut self,
        request_id: u64,
        account: AccountId,
        mutation: FolderMutation,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let job = MutationJob {
            request_id,
            account,
            mutation,
            reply: tx,
        };
        self.queue()?
            .send(job)
            .map_err(|_| anyhow!("mutation worker stopped -- restart chatfold"))
    }
}

/// Fills `store` with generated chats and a few folders for `--demo`.
pub fn seed_demo(store: &Store, account: AccountId) -> Result<()> {
    let mut faker = ChatFaker::new(DEMO_SEED);
    let mut external = Vec::with_capacity(DEMO_CHATS);
    for _ in 0..DEMO_CHATS {
        let chat = faker.chat();
        store.upsert_chat(
            account,
            &NewChat {
                external_id: chat.external_id,
                name: chat.name,
                username: chat.username,
                kind: chat.kind,
            },
        )?;
        external.push(chat.external_id);
    }

    for index in 0..DEMO_FOLDERS {
        let folder = store.create_folder(account, &faker.folder_title())?;
        let members = external
            .iter()
            .copied()
            .skip(index)
            .step_by(DEMO_FOLDERS + 1)
            .collect::<Vec<_>>();
        store.bulk_add_chats(account, folder.id, &members)?;
    }

    tracing::info!(
        seed = DEMO_SEED,
        chats = DEMO_CHATS,
        folders = DEMO_FOLDERS,
        "demo data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEMO_CHATS, DEMO_FOLDERS, ServiceRuntime, seed_demo};
    use anyhow::{Result, anyhow};
    use chatfold_app::{AccountId, ExternalChatId, FolderId, FolderMutation, MutationOutcome};
    use chatfold_db::Store;
    use chatfold_testkit::{RecordingService, ServiceCall, chat, folder};
    use chatfold_tui::{InternalEvent, OrganizerRuntime};
    use std::sync::mpsc;
    use std::time::Duration;

    const ACCOUNT: AccountId = AccountId::new(3);

    fn recording() -> RecordingService {
        RecordingService::new(
            ACCOUNT,
            vec![chat(1, "Avery"), chat(2, "Jordan")],
            vec![folder(2, "jobs", &[1])],
        )
    }

    #[test]
    fn loads_through_the_service() -> Result<()> {
        let mut runtime = ServiceRuntime::new(recording());
        assert_eq!(runtime.load_chats(ACCOUNT)?.len(), 2);
        assert_eq!(runtime.load_folders(ACCOUNT)?.len(), 1);
        assert!(runtime.load_chats(AccountId::new(9)).is_err());
        Ok(())
    }

    #[test]
    fn spawned_mutation_reports_back_on_channel() -> Result<()> {
        let mut runtime = ServiceRuntime::new(recording());
        let (tx, rx) = mpsc::channel();

        runtime.spawn_mutation(
            7,
            ACCOUNT,
            FolderMutation::Rename {
                folder: FolderId::new(2),
                title: "work".to_owned(),
            },
            tx,
        )?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::MutationFinished {
                request_id: 7,
                result: Ok(MutationOutcome::Renamed {
                    folder: FolderId::new(2),
                    title: "work".to_owned(),
                }),
            }
        );

        let service = runtime
            .service
            .lock()
            .map_err(|_| anyhow!("service lock poisoned"))?;
        assert_eq!(
            service.calls.last(),
            Some(&ServiceCall::RenameFolder(FolderId::new(2), "work".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn spawned_failure_carries_error_text() -> Result<()> {
        let mut service = recording();
        service.fail_next("flood wait 30s");
        let mut runtime = ServiceRuntime::new(service);
        let (tx, rx) = mpsc::channel();

        let delete = FolderMutation::Delete {
            folder: FolderId::new(2),
        };
        runtime.spawn_mutation(1, ACCOUNT, delete, tx)?;

        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::MutationFinished { result, .. } => {
                assert_eq!(result, Err("flood wait 30s".to_owned()));
            }
            other => return Err(anyhow!("unexpected event {other:?}")),
        }
        Ok(())
    }

    #[test]
    fn queued_mutations_apply_in_request_order() -> Result<()> {
        let mut runtime = ServiceRuntime::new(recording());
        let (tx, rx) = mpsc::channel();
        let created = FolderId::new(3);
        let mutations = [
            FolderMutation::Create {
                title: "leads".to_owned(),
            },
            FolderMutation::Rename {
                folder: created,
                title: "clients".to_owned(),
            },
            FolderMutation::BulkAdd {
                folder: created,
                chats: vec![ExternalChatId::new(2)],
            },
            FolderMutation::Delete { folder: created },
        ];
        for (request_id, mutation) in (1..).zip(mutations) {
            runtime.spawn_mutation(request_id, ACCOUNT, mutation, tx.clone())?;
        }

        let mut finished = Vec::new();
        for _ in 0..4 {
            match rx.recv_timeout(Duration::from_secs(5))? {
                InternalEvent::MutationFinished { request_id, result } => {
                    assert!(result.is_ok(), "request {request_id} failed: {result:?}");
                    finished.push(request_id);
                }
                other => return Err(anyhow!("unexpected event {other:?}")),
            }
        }
        assert_eq!(finished, vec![1, 2, 3, 4]);

        let service = runtime
            .service
            .lock()
            .map_err(|_| anyhow!("service lock poisoned"))?;
        assert_eq!(
            service.calls,
            vec![
                ServiceCall::CreateFolder("leads".to_owned()),
                ServiceCall::RenameFolder(created, "clients".to_owned()),
                ServiceCall::BulkAdd(created, vec![ExternalChatId::new(2)]),
                ServiceCall::DeleteFolder(created),
            ]
        );
        Ok(())
    }

    #[test]
    fn demo_seed_populates_chats_and_folders() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        seed_demo(&store, ACCOUNT)?;

        let chats = store.list_chats(ACCOUNT)?;
        let folders = store.list_folders(ACCOUNT)?;
        assert_eq!(chats.len(), DEMO_CHATS);
        assert_eq!(folders.len(), DEMO_FOLDERS);
        assert_eq!(folders[0].id, FolderId::new(2));
        assert!(folders.iter().all(|folder| !folder.members.is_empty()));
        assert!(
            folders
                .iter()
                .flat_map(|folder| folder.members.iter())
                .all(|member| chats.iter().any(|chat| chat.external_id == *member))
        );
        assert!(store.list_chats(AccountId::new(99))?.is_empty());
        Ok(())
    }
}
