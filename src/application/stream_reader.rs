use bytes::{Bytes, BytesMut};
use futures::{stream::BoxStream, StreamExt};

use crate::api::ByteStream;
use crate::domain::ContentLength;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub total: ContentLength,
    /// Absent when the total is unknown. Never exceeds 99.
    pub percent: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    Progress(Progress),
    /// Entire payload, reported only after the body ended cleanly.
    Done(Bytes),
    Error(String),
}

impl ReadEvent {
    pub fn percent(&self) -> Option<u8> {
        match self {
            ReadEvent::Progress(progress) => progress.percent,
            ReadEvent::Done(_) => Some(100),
            ReadEvent::Error(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadEvent::Progress(_))
    }
}

/// `floor(received / total * 100)` capped at 99; 100 is reserved for `Done`.
pub fn progress_percent(received: u64, total: ContentLength) -> Option<u8> {
    let total = total.bytes().filter(|t| *t > 0)?;
    let percent = (u128::from(received) * 100 / u128::from(total)).min(99);
    Some(percent as u8)
}

// A bogus Content-Length must not reserve gigabytes up front
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Drains a response body, turning each chunk into a progress event.
///
/// The sequence is finite and cannot be restarted: after `Done` or `Error`,
/// `next_event` keeps returning `None`. Bytes are held back until the body
/// ends, so a failed read never exposes a partial payload.
pub struct StreamReader {
    body: Option<ByteStream>,
    total: ContentLength,
    received: u64,
    buffer: BytesMut,
}

impl StreamReader {
    pub fn new(body: ByteStream, total: ContentLength) -> Self {
        let capacity = total
            .bytes()
            .map(|t| t.min(MAX_PREALLOCATION))
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or(0);

        Self {
            body: Some(body),
            total,
            received: 0,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub async fn next_event(&mut self) -> Option<ReadEvent> {
        let body = self.body.as_mut()?;

        loop {
            match body.next().await {
                // Empty reads carry no progress
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => {
                    self.received += chunk.len() as u64;
                    self.buffer.extend_from_slice(&chunk);

                    return Some(ReadEvent::Progress(Progress {
                        received: self.received,
                        total: self.total,
                        percent: progress_percent(self.received, self.total),
                    }));
                }
                Some(Err(e)) => {
                    self.body = None;
                    self.buffer = BytesMut::new();
                    return Some(ReadEvent::Error(e.to_string()));
                }
                None => {
                    self.body = None;
                    let payload = std::mem::take(&mut self.buffer).freeze();
                    return Some(ReadEvent::Done(payload));
                }
            }
        }
    }

    pub fn into_events(self) -> BoxStream<'static, ReadEvent> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_event().await.map(|event| (event, reader))
        })
        .boxed()
    }
}
