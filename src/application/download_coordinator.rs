use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::stream_reader::{ReadEvent, StreamReader};
use crate::{
    api::ApiClient,
    domain::{AppError, ContentLength, ItemId, SearchResult},
};

/// Everything a running download reports back to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Server answered 2xx; bytes may still be a while.
    Accepted(ContentLength),
    Read(ReadEvent),
    /// Non-2xx or transport failure before the body started.
    Rejected(AppError),
    /// Gave up locally, e.g. the processing window outlasted the configured timeout.
    Aborted(AppError),
}

/// A result set and the URL it was looked up for.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub video_url: String,
    pub results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub fn result_linger(&self) -> Duration {
        self.api_client.config().result_linger
    }

    /// Looks up the encodings for `video_url`. The normalized URL travels with
    /// the results so downloads use exactly the URL that was searched.
    pub async fn search(&self, video_url: String) -> Result<SearchOutcome, AppError> {
        let video_url = validate_video_url(&video_url)?;

        let streams = self
            .api_client
            .fetch_streams(&video_url)
            .await
            .map_err(|e| AppError::LookupFailed(e.to_string()))?;

        tracing::info!(url = %video_url, streams = streams.len(), "lookup succeeded");
        Ok(SearchOutcome {
            results: streams.into_iter().map(SearchResult::from).collect(),
            video_url,
        })
    }

    pub async fn choose_save_path(&self, suggested_filename: String) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_file_name(&suggested_filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Lazily drives one download attempt. The stream ends right after a
    /// terminal event, or silently as soon as `token` is cancelled.
    pub fn download_stream(
        &self,
        video_url: String,
        id: ItemId,
        token: CancellationToken,
    ) -> BoxStream<'static, DownloadEvent> {
        futures::stream::unfold(
            DownloadRuntimeState::Start {
                client: self.api_client.clone(),
                video_url,
                id,
                token,
            },
            |state| async move {
                match state {
                    DownloadRuntimeState::Start {
                        client,
                        video_url,
                        id,
                        token,
                    } => {
                        let opened = tokio::select! {
                            biased;
                            _ = token.cancelled() => return None,
                            opened = client.open_download(&video_url, &id) => opened,
                        };

                        match opened {
                            Ok((total, body)) => Some((
                                DownloadEvent::Accepted(total),
                                DownloadRuntimeState::Processing {
                                    reader: StreamReader::new(body, total),
                                    token,
                                    timeout: client.config().processing_timeout,
                                },
                            )),
                            Err(e) => {
                                tracing::warn!(id = %id, error = %e, "download request rejected");
                                Some((
                                    DownloadEvent::Rejected(AppError::DownloadRejected {
                                        status: e.status(),
                                    }),
                                    DownloadRuntimeState::Finished,
                                ))
                            }
                        }
                    }
                    DownloadRuntimeState::Processing {
                        mut reader,
                        token,
                        timeout,
                    } => {
                        let first = tokio::select! {
                            biased;
                            _ = token.cancelled() => return None,
                            first = first_read(&mut reader, timeout) => first,
                        };

                        match first {
                            Ok(Some(event)) => Some(advance(event, reader, token)),
                            Ok(None) => None,
                            Err(e) => Some((DownloadEvent::Aborted(e), DownloadRuntimeState::Finished)),
                        }
                    }
                    DownloadRuntimeState::Streaming { mut reader, token } => {
                        let next = tokio::select! {
                            biased;
                            _ = token.cancelled() => return None,
                            next = reader.next_event() => next,
                        };

                        next.map(|event| advance(event, reader, token))
                    }
                    DownloadRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

async fn first_read(
    reader: &mut StreamReader,
    timeout: Option<Duration>,
) -> Result<Option<ReadEvent>, AppError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, reader.next_event())
            .await
            .map_err(|_| AppError::ProcessingTimedOut),
        None => Ok(reader.next_event().await),
    }
}

fn advance(
    event: ReadEvent,
    reader: StreamReader,
    token: CancellationToken,
) -> (DownloadEvent, DownloadRuntimeState) {
    let next = if event.is_terminal() {
        DownloadRuntimeState::Finished
    } else {
        DownloadRuntimeState::Streaming { reader, token }
    };
    (DownloadEvent::Read(event), next)
}

/// Writes a completed payload to disk.
pub async fn write_payload(path: &Path, payload: Bytes) -> Result<(), AppError> {
    tokio::fs::write(path, &payload)
        .await
        .map_err(|e| AppError::Io(format!("Failed to save {}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), bytes = payload.len(), "payload saved");
    Ok(())
}

fn validate_video_url(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    let parsed = url::Url::parse(trimmed).map_err(|_| AppError::InvalidInput)?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(trimmed.to_string()),
        _ => Err(AppError::InvalidInput),
    }
}

enum DownloadRuntimeState {
    Start {
        client: ApiClient,
        video_url: String,
        id: ItemId,
        token: CancellationToken,
    },
    Processing {
        reader: StreamReader,
        token: CancellationToken,
        timeout: Option<Duration>,
    },
    Streaming {
        reader: StreamReader,
        token: CancellationToken,
    },
    Finished,
}
