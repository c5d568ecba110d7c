//! StateManager - actor that owns KhirStore
//!
//! Processes commands via channels for serialized access to the SQLite store.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{ConversationTurn, LearnerChapterSession, Store, Transcript, learner_prefix, session_key};

use super::SessionStore;
use super::messages::{StateCommand, StateResponse, StoreError};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the store in `store_path`
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = Store::open(store_path.as_ref())?;
        Ok(Self::spawn_with_store(store))
    }

    /// Spawn a StateManager over an in-memory store
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        let store = Store::open_in_memory()?;
        Ok(Self::spawn_with_store(store))
    }

    fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    /// All sessions of one learner, ordered by chapter
    pub async fn list_sessions(&self, learner_id: &str) -> StateResponse<Vec<LearnerChapterSession>> {
        debug!(%learner_id, "list_sessions: called");
        let owner = learner_id.to_string();
        let sessions = self
            .request(|reply| StateCommand::ListSessions {
                learner_id: owner,
                reply,
            })
            .await?;
        Ok(sessions.into_iter().filter(|s| s.learner_id() == learner_id).collect())
    }

    /// Stop the actor; later requests fail with `ChannelClosed`
    pub async fn shutdown(&self) {
        debug!("shutdown: called");
        if self.tx.send(StateCommand::Shutdown).await.is_err() {
            debug!("shutdown: actor already stopped");
        }
    }
}

#[async_trait]
impl SessionStore for StateManager {
    async fn load_session(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> Result<Option<LearnerChapterSession>, StoreError> {
        debug!(%learner_id, %chapter_id, "load_session: called");
        let key = session_key(learner_id, chapter_id);
        let session = self
            .request(|reply| StateCommand::LoadSession { key: key.clone(), reply })
            .await?;
        match session {
            Some(s) if s.learner_id() != learner_id || s.chapter_id() != chapter_id => {
                warn!(
                    %key,
                    stored_learner = %s.learner_id(),
                    stored_chapter = %s.chapter_id(),
                    "load_session: key owner mismatch"
                );
                Err(StoreError::Backend(format!(
                    "stored session {} belongs to another learner or chapter",
                    key
                )))
            }
            other => Ok(other),
        }
    }

    async fn save_session(&self, session: &LearnerChapterSession) -> Result<(), StoreError> {
        debug!(key = %session.key(), phase = %session.phase(), "save_session: called");
        let session = session.clone();
        self.request(|reply| StateCommand::SaveSession { session, reply })
            .await
    }

    async fn load_transcript(&self, session_key: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        debug!(%session_key, "load_transcript: called");
        let key = session_key.to_string();
        let transcript = self
            .request(|reply| StateCommand::LoadTranscript { key, reply })
            .await?;
        Ok(transcript.map(|t| t.turns).unwrap_or_default())
    }

    async fn save_transcript(&self, session_key: &str, turns: &[ConversationTurn]) -> Result<(), StoreError> {
        debug!(%session_key, turn_count = turns.len(), "save_transcript: called");
        let transcript = Transcript::new(session_key, turns.to_vec());
        self.request(|reply| StateCommand::SaveTranscript { transcript, reply })
            .await
    }
}

fn backend(e: eyre::Report) -> StoreError {
    StoreError::Backend(format!("{:#}", e))
}

/// Send a reply, logging if the requester has gone away
fn respond<T>(reply: oneshot::Sender<StateResponse<T>>, result: StateResponse<T>) {
    if reply.send(result).is_err() {
        debug!("respond: requester dropped before reply");
    }
}

async fn actor_loop(store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: started");
    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::LoadSession { key, reply } => {
                debug!(%key, "actor_loop: LoadSession");
                respond(reply, store.get::<LearnerChapterSession>(&key).map_err(backend));
            }
            StateCommand::SaveSession { session, reply } => {
                debug!(key = %session.key(), "actor_loop: SaveSession");
                let result = store.upsert(&session).map_err(backend);
                if let Err(e) = &result {
                    warn!(key = %session.key(), error = %e, "actor_loop: session write failed");
                }
                respond(reply, result);
            }
            StateCommand::ListSessions { learner_id, reply } => {
                debug!(%learner_id, "actor_loop: ListSessions");
                let prefix = learner_prefix(&learner_id);
                respond(
                    reply,
                    store
                        .list_with_prefix::<LearnerChapterSession>(&prefix)
                        .map_err(backend),
                );
            }
            StateCommand::LoadTranscript { key, reply } => {
                debug!(%key, "actor_loop: LoadTranscript");
                respond(reply, store.get::<Transcript>(&key).map_err(backend));
            }
            StateCommand::SaveTranscript { transcript, reply } => {
                debug!(key = %transcript.id, "actor_loop: SaveTranscript");
                respond(reply, store.upsert(&transcript).map_err(backend));
            }
            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }
    debug!("actor_loop: stopped");
}
