use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::download_coordinator::DownloadEvent;
use super::stream_reader::ReadEvent;
use crate::domain::{AppError, ContentLength, DownloadStatus, ItemId};

pub const CANCELLED: &str = "cancelled";

/// Lifecycle of a single item's download.
///
/// ```text
/// Idle -> Requesting -> Processing -> InProgress -> Complete
///             |             |             |
///             +-------------+-------------+--> Failed
/// Complete | Failed --acknowledge--> Idle
/// ```
///
/// Transitions are driven only by network events; nothing here reads a clock.
#[derive(Debug)]
pub struct DownloadSession {
    id: ItemId,
    status: DownloadStatus,
    cancel: Option<CancellationToken>,
    payload: Option<Bytes>,
    attempt: u64,
}

impl DownloadSession {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            status: DownloadStatus::Idle,
            cancel: None,
            payload: None,
            attempt: 0,
        }
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    /// Attempt number handed in by the last successful `start`; events
    /// tagged with any other attempt belong to a superseded download.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Moves to `Requesting` and hands out the token the network task must observe.
    ///
    /// A terminal session that was never acknowledged is implicitly reset,
    /// which is how a retry works. `attempt` must never have been used before
    /// for this id, otherwise stale events would be routed here.
    pub fn start(&mut self, attempt: u64) -> Result<CancellationToken, AppError> {
        if self.status.is_active() {
            return Err(AppError::DuplicateRequest);
        }

        let token = CancellationToken::new();
        self.attempt = attempt;
        self.status = DownloadStatus::Requesting;
        self.cancel = Some(token.clone());
        self.payload = None;

        tracing::info!(id = %self.id, attempt = self.attempt, "download requested");
        Ok(token)
    }

    /// Applies one event from the network task.
    pub fn handle(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Accepted(total) => self.server_ack(total),
            DownloadEvent::Read(read) => self.on_read(read),
            DownloadEvent::Rejected(error) | DownloadEvent::Aborted(error) => self.fail(&error),
        }
    }

    pub fn server_ack(&mut self, total: ContentLength) {
        if self.status != DownloadStatus::Requesting {
            tracing::debug!(id = %self.id, status = ?self.status, "ignoring server ack");
            return;
        }
        tracing::info!(id = %self.id, total = ?total.bytes(), "server accepted download");
        self.status = DownloadStatus::Processing;
    }

    /// Only meaningful once the server has accepted the request.
    pub fn on_read(&mut self, event: ReadEvent) {
        if !matches!(
            self.status,
            DownloadStatus::Processing | DownloadStatus::InProgress { .. }
        ) {
            tracing::debug!(id = %self.id, status = ?self.status, "dropping read event");
            return;
        }

        match event {
            ReadEvent::Progress(progress) => {
                let previous = match self.status {
                    DownloadStatus::InProgress { percent, .. } => percent,
                    _ => None,
                };
                let percent = match (previous, progress.percent) {
                    (Some(prev), Some(next)) => Some(prev.max(next)),
                    (_, next) => next,
                };
                self.status = DownloadStatus::InProgress {
                    percent,
                    received: progress.received,
                };
            }
            ReadEvent::Done(payload) => {
                tracing::info!(id = %self.id, bytes = payload.len(), "download complete");
                self.status = DownloadStatus::Complete;
                self.payload = Some(payload);
                self.cancel = None;
            }
            ReadEvent::Error(reason) => self.fail(&AppError::StreamInterrupted(reason)),
        }
    }

    /// Moves an active session to `Failed`; terminal sessions are left alone.
    pub fn fail(&mut self, error: &AppError) {
        if !self.status.is_active() {
            return;
        }
        tracing::warn!(id = %self.id, error = %error, "download failed");
        self.status = DownloadStatus::Failed(error.to_string());
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    /// Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        tracing::info!(id = %self.id, "download cancelled");
        self.status = DownloadStatus::Failed(CANCELLED.to_string());
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        true
    }

    /// Hands the completed payload over, at most once per attempt.
    pub fn take_payload(&mut self) -> Option<Bytes> {
        self.payload.take()
    }

    /// Returns a terminal session to `Idle`.
    pub fn acknowledge(&mut self) -> bool {
        if !self.status.is_terminal() {
            return false;
        }
        self.status = DownloadStatus::Idle;
        self.payload = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stream_reader::Progress;

    fn progress(received: u64, percent: Option<u8>) -> ReadEvent {
        ReadEvent::Progress(Progress {
            received,
            total: ContentLength::Known(1000),
            percent,
        })
    }

    fn started() -> (DownloadSession, CancellationToken) {
        let mut session = DownloadSession::new(ItemId::new("22"));
        let token = session.start(1).unwrap();
        (session, token)
    }

    #[test]
    fn test_happy_path() {
        let (mut session, _token) = started();
        assert_eq!(session.status(), &DownloadStatus::Requesting);

        session.handle(DownloadEvent::Accepted(ContentLength::Known(1000)));
        assert_eq!(session.status(), &DownloadStatus::Processing);

        session.handle(DownloadEvent::Read(progress(100, Some(10))));
        assert_eq!(
            session.status(),
            &DownloadStatus::InProgress {
                percent: Some(10),
                received: 100
            }
        );

        session.handle(DownloadEvent::Read(ReadEvent::Done(Bytes::from_static(b"abc"))));
        assert_eq!(session.status(), &DownloadStatus::Complete);
        assert_eq!(session.take_payload(), Some(Bytes::from_static(b"abc")));
        assert_eq!(session.take_payload(), None);

        assert!(session.acknowledge());
        assert_eq!(session.status(), &DownloadStatus::Idle);
    }

    #[test]
    fn test_rejected_request_skips_processing() {
        let (mut session, token) = started();
        session.handle(DownloadEvent::Rejected(AppError::DownloadRejected {
            status: Some(500),
        }));

        assert_eq!(
            session.status(),
            &DownloadStatus::Failed("Download failed".to_string())
        );
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_duplicate_start_leaves_session_untouched() {
        let (mut session, token) = started();
        session.server_ack(ContentLength::Unknown);

        assert_eq!(session.start(2).unwrap_err(), AppError::DuplicateRequest);
        assert_eq!(session.status(), &DownloadStatus::Processing);
        assert_eq!(session.attempt(), 1);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_percent_never_regresses() {
        let (mut session, _token) = started();
        session.server_ack(ContentLength::Known(1000));
        session.on_read(progress(600, Some(60)));
        session.on_read(progress(610, Some(40)));

        assert_eq!(
            session.status(),
            &DownloadStatus::InProgress {
                percent: Some(60),
                received: 610
            }
        );
    }

    #[test]
    fn test_cancel_releases_token_and_drops_later_events() {
        let (mut session, token) = started();
        session.server_ack(ContentLength::Known(1000));
        session.on_read(progress(100, Some(10)));

        assert!(session.cancel());
        assert!(token.is_cancelled());
        assert_eq!(
            session.status(),
            &DownloadStatus::Failed(CANCELLED.to_string())
        );

        session.on_read(progress(900, Some(90)));
        session.on_read(ReadEvent::Done(Bytes::from_static(b"late")));
        assert_eq!(
            session.status(),
            &DownloadStatus::Failed(CANCELLED.to_string())
        );
        assert_eq!(session.take_payload(), None);
    }

    #[test]
    fn test_cancel_terminal_is_noop() {
        let (mut session, _token) = started();
        session.server_ack(ContentLength::Known(3));
        session.on_read(ReadEvent::Done(Bytes::from_static(b"abc")));

        assert!(!session.cancel());
        assert_eq!(session.status(), &DownloadStatus::Complete);

        let mut idle = DownloadSession::new(ItemId::new("18"));
        assert!(!idle.cancel());
        assert_eq!(idle.status(), &DownloadStatus::Idle);
    }

    #[test]
    fn test_stream_error_fails_session() {
        let (mut session, _token) = started();
        session.server_ack(ContentLength::Known(1000));
        session.on_read(progress(100, Some(10)));
        session.on_read(ReadEvent::Error("connection reset".into()));

        match session.status() {
            DownloadStatus::Failed(message) => assert!(message.contains("connection reset")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_processing_timeout_fails_session() {
        let (mut session, _token) = started();
        session.server_ack(ContentLength::Unknown);
        session.handle(DownloadEvent::Aborted(AppError::ProcessingTimedOut));

        assert!(matches!(session.status(), DownloadStatus::Failed(_)));
    }

    #[test]
    fn test_retry_after_failure() {
        let (mut session, first) = started();
        session.cancel();

        let second = session.start(7).unwrap();
        assert_eq!(session.attempt(), 7);
        assert_eq!(session.status(), &DownloadStatus::Requesting);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_reads_before_server_ack_are_ignored() {
        let (mut session, token) = started();

        session.on_read(progress(500, Some(50)));
        assert_eq!(session.status(), &DownloadStatus::Requesting);

        session.on_read(ReadEvent::Done(Bytes::from_static(b"early")));
        assert_eq!(session.status(), &DownloadStatus::Requesting);
        assert_eq!(session.take_payload(), None);
        assert!(!token.is_cancelled());

        session.server_ack(ContentLength::Known(1000));
        session.on_read(progress(500, Some(50)));
        assert_eq!(
            session.status(),
            &DownloadStatus::InProgress {
                percent: Some(50),
                received: 500
            }
        );
    }

    #[test]
    fn test_acknowledge_requires_terminal() {
        let (mut session, _token) = started();
        assert!(!session.acknowledge());
        assert_eq!(session.status(), &DownloadStatus::Requesting);
    }
}
