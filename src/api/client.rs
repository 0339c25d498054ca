use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use thiserror::Error;

use super::models::{
    ApiConfig, DownloadRequest, ErrorResponse, Itag, StreamInfo, VideoInfoRequest,
    VideoInfoResponse,
};
use crate::domain::{ContentLength, ItemId};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Response body of a download, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<bytes::Bytes>>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Turns a non-2xx response into `ApiError::Status`, keeping the backend's
    /// `{"error": ...}` message when it sent one.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Look up the encodings available for a media URL.
    pub async fn fetch_streams(&self, video_url: &str) -> Result<Vec<StreamInfo>> {
        let response = self
            .http
            .post(self.endpoint("/api/video-info"))
            .json(&VideoInfoRequest { url: video_url })
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let info: VideoInfoResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        tracing::debug!(count = info.streams.len(), "received stream list");
        Ok(info.streams)
    }

    /// Request one encoding. Resolves once the response headers are in;
    /// the body is returned unread.
    pub async fn open_download(
        &self,
        video_url: &str,
        id: &ItemId,
    ) -> Result<(ContentLength, ByteStream)> {
        let response = self
            .http
            .post(self.endpoint("/api/download"))
            .json(&DownloadRequest {
                url: video_url,
                itag: Itag::from_item(id),
            })
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let total_size = ContentLength::from(response.content_length());
        let stream = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok((total_size, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(ApiConfig {
            base_url: server.url(),
            ..ApiConfig::default()
        })
    }

    #[tokio::test]
    async fn test_fetch_streams() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/video-info")
            .match_body(Matcher::Json(json!({"url": "https://youtu.be/abc"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"streams": [
                    {"itag": 18, "resolution": "360p", "mime_type": "video/mp4", "abr": "96kbps", "filesize": 1048576},
                    {"itag": 22, "resolution": "720p", "mime_type": "video/mp4", "abr": null, "filesize": "N/A"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let streams = client_for(&server)
            .fetch_streams("https://youtu.be/abc")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].itag, Itag::Number(18));
    }

    #[tokio::test]
    async fn test_fetch_streams_surfaces_backend_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/video-info")
            .with_status(400)
            .with_body(r#"{"error": "regex_search: could not find match"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch_streams("https://youtu.be/abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("could not find match"));
    }

    #[tokio::test]
    async fn test_open_download_reports_content_length() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/download")
            .match_body(Matcher::Json(json!({"url": "https://youtu.be/abc", "itag": 18})))
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let (total, stream) = client_for(&server)
            .open_download("https://youtu.be/abc", &ItemId::new("18"))
            .await
            .unwrap();

        assert_eq!(total, ContentLength::Known(4096));
        let body: Vec<bytes::Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(body.iter().map(|b| b.len()).sum::<usize>(), 4096);
    }

    #[tokio::test]
    async fn test_open_download_chunked_has_unknown_length() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/download")
            .with_status(200)
            .with_chunked_body(|w| w.write_all(b"partial payload"))
            .create_async()
            .await;

        let (total, _stream) = client_for(&server)
            .open_download("https://youtu.be/abc", &ItemId::new("18"))
            .await
            .unwrap();

        assert_eq!(total, ContentLength::Unknown);
    }

    #[tokio::test]
    async fn test_open_download_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/download")
            .with_status(500)
            .create_async()
            .await;

        let result = client_for(&server)
            .open_download("https://youtu.be/abc", &ItemId::new("18"))
            .await;

        match result {
            Err(e) => assert_eq!(e.status(), Some(500)),
            Ok(_) => panic!("expected a rejected download"),
        }
    }
}
