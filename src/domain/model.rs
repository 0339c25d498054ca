use std::fmt;

/// Identifies one selectable encoding within a result set (the backend's itag).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared size of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLength {
    Known(u64),
    Unknown,
}

impl From<Option<u64>> for ContentLength {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(bytes) => ContentLength::Known(bytes),
            None => ContentLength::Unknown,
        }
    }
}

impl ContentLength {
    pub fn bytes(self) -> Option<u64> {
        match self {
            ContentLength::Known(bytes) => Some(bytes),
            ContentLength::Unknown => None,
        }
    }
}

/// One encoding offered by the info lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: ItemId,
    /// Resolution for video streams, bitrate for audio-only ones.
    pub quality: String,
    pub mime_type: String,
    pub size: ContentLength,
    pub progressive: bool,
    pub fps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Idle,
    /// Request sent, response headers not received yet.
    Requesting,
    /// Server accepted the request but has not streamed a byte yet.
    Processing,
    /// `percent` is `None` when the total size is unknown.
    InProgress { percent: Option<u8>, received: u64 },
    Complete,
    Failed(String),
}

impl DownloadStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Requesting
                | DownloadStatus::Processing
                | DownloadStatus::InProgress { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Complete | DownloadStatus::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(!DownloadStatus::Idle.is_active());
        assert!(DownloadStatus::Requesting.is_active());
        assert!(DownloadStatus::Processing.is_active());
        assert!(DownloadStatus::InProgress {
            percent: None,
            received: 0
        }
        .is_active());
        assert!(DownloadStatus::Complete.is_terminal());
        assert!(DownloadStatus::Failed("x".into()).is_terminal());
        assert!(!DownloadStatus::Idle.is_terminal());
    }

    #[test]
    fn test_content_length_from_header() {
        assert_eq!(ContentLength::from(Some(42)), ContentLength::Known(42));
        assert_eq!(ContentLength::from(None), ContentLength::Unknown);
        assert_eq!(ContentLength::Unknown.bytes(), None);
    }
}
