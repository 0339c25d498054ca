use crate::domain::{ContentLength, DownloadStatus, SearchResult};

pub const PROCESSING_MESSAGE: &str = "Please wait! We're processing your request...";

/// What a result row shows for its current download status.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub label: String,
    pub progress_visible: bool,
    /// 0-100. `None` while visible means the indicator is indeterminate.
    pub progress_percent: Option<f32>,
    pub action_enabled: bool,
}

pub fn present(status: &DownloadStatus) -> Presentation {
    match status {
        DownloadStatus::Idle => Presentation {
            label: "Download".to_string(),
            progress_visible: false,
            progress_percent: None,
            action_enabled: true,
        },
        DownloadStatus::Requesting => Presentation {
            label: "Requesting...".to_string(),
            progress_visible: false,
            progress_percent: None,
            action_enabled: false,
        },
        DownloadStatus::Processing => Presentation {
            label: PROCESSING_MESSAGE.to_string(),
            progress_visible: false,
            progress_percent: None,
            action_enabled: false,
        },
        DownloadStatus::InProgress { percent, received } => Presentation {
            label: match percent {
                Some(p) => format!("Downloading... {}%", p),
                None => format!("Downloading... {}", format_megabytes(*received)),
            },
            progress_visible: true,
            progress_percent: percent.map(f32::from),
            action_enabled: false,
        },
        DownloadStatus::Complete => Presentation {
            label: "Download complete".to_string(),
            progress_visible: true,
            progress_percent: Some(100.0),
            action_enabled: false,
        },
        DownloadStatus::Failed(message) => Presentation {
            label: message.clone(),
            progress_visible: false,
            progress_percent: None,
            action_enabled: true,
        },
    }
}

fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

pub fn size_label(size: ContentLength) -> String {
    match size {
        ContentLength::Known(bytes) => format_megabytes(bytes),
        ContentLength::Unknown => "Variable size".to_string(),
    }
}

/// e.g. `720p 60fps (video/mp4)` or `480p (video/webm) (video only)`
pub fn quality_label(result: &SearchResult) -> String {
    let mut label = result.quality.clone();
    if let Some(fps) = result.fps.filter(|fps| *fps > 30) {
        label.push_str(&format!(" {}fps", fps));
    }
    label.push_str(&format!(" ({})", result.mime_type));
    if !result.progressive {
        label.push_str(" (video only)");
    }
    label
}
