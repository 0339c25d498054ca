use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use super::download_coordinator::DownloadEvent;
use super::session::DownloadSession;
use crate::domain::{AppError, DownloadStatus, ItemId};

/// Ticket for a started download: the attempt it belongs to and the token
/// its network task must observe.
#[derive(Debug, Clone)]
pub struct StartedDownload {
    pub attempt: u64,
    pub token: CancellationToken,
}

/// Sessions keyed by item, in insertion order.
///
/// Only one writer ever touches the registry (the UI update loop), so no
/// locking is involved. At most one active session exists per id.
///
/// Attempt numbers come from a registry-wide counter that survives `remove`
/// and `clear`, so a recreated session never reuses an attempt of the one it
/// replaced.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: IndexMap<ItemId, DownloadSession>,
    last_attempt: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, id: &ItemId) -> &mut DownloadSession {
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| DownloadSession::new(id.clone()))
    }

    pub fn get(&self, id: &ItemId) -> Option<&DownloadSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut DownloadSession> {
        self.sessions.get_mut(id)
    }

    /// Unknown ids read as `Idle`.
    pub fn status(&self, id: &ItemId) -> DownloadStatus {
        self.sessions
            .get(id)
            .map(|s| s.status().clone())
            .unwrap_or(DownloadStatus::Idle)
    }

    /// Starts a download for `id`, refusing if one is already running.
    pub fn start(&mut self, id: &ItemId) -> Result<StartedDownload, AppError> {
        let attempt = self.last_attempt + 1;
        match self.get_or_create(id).start(attempt) {
            Ok(token) => {
                self.last_attempt = attempt;
                Ok(StartedDownload { attempt, token })
            }
            Err(e) => {
                tracing::warn!(id = %id, "rejected duplicate download request");
                Err(e)
            }
        }
    }

    /// Routes a network event to its session. Events from a superseded
    /// attempt are dropped.
    pub fn dispatch(&mut self, id: &ItemId, attempt: u64, event: DownloadEvent) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.attempt() == attempt => {
                session.handle(event);
                true
            }
            _ => {
                tracing::debug!(id = %id, attempt, "dropping stale download event");
                false
            }
        }
    }

    pub fn cancel(&mut self, id: &ItemId) -> bool {
        self.sessions
            .get_mut(id)
            .map(DownloadSession::cancel)
            .unwrap_or(false)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.sessions
            .values_mut()
            .map(DownloadSession::cancel)
            .filter(|cancelled| *cancelled)
            .count()
    }

    /// Deletes a session that is not running. Active sessions stay put.
    pub fn remove(&mut self, id: &ItemId) -> Option<DownloadSession> {
        if self.sessions.get(id)?.is_active() {
            return None;
        }
        self.sessions.shift_remove(id)
    }

    /// Resets a finished session and drops it from the registry.
    pub fn acknowledge(&mut self, id: &ItemId, attempt: u64) -> bool {
        let acknowledged = match self.sessions.get_mut(id) {
            Some(session) if session.attempt() == attempt => session.acknowledge(),
            _ => false,
        };
        acknowledged && self.remove(id).is_some()
    }

    /// Cancels everything and forgets all sessions.
    pub fn clear(&mut self) {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "cancelled downloads from previous search");
        }
        self.sessions.clear();
    }

    pub fn snapshot(&self) -> Vec<(ItemId, DownloadStatus)> {
        self.sessions
            .iter()
            .map(|(id, session)| (id.clone(), session.status().clone()))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }
}
