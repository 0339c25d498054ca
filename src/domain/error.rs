use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid video URL")]
    InvalidInput,

    #[error("Failed to fetch video info: {0}")]
    LookupFailed(String),

    #[error("Download failed")]
    DownloadRejected { status: Option<u16> },

    #[error("Download interrupted: {0}")]
    StreamInterrupted(String),

    #[error("A download for this stream is already running")]
    DuplicateRequest,

    #[error("Timed out waiting for the server to start streaming")]
    ProcessingTimedOut,

    #[error("I/O error: {0}")]
    Io(String),
}
