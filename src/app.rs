use std::path::PathBuf;

use bytes::Bytes;
use iced::Task;

use crate::api::{ApiClient, ApiConfig};
use crate::application::{
    download_coordinator::write_payload,
    presenter::{present, quality_label, size_label},
    DownloadCoordinator, DownloadEvent, SearchOutcome, SessionRegistry, StartedDownload,
};
use crate::domain::{AppError, DownloadStatus, ItemId, SearchResult};
use crate::ui::{DownloadMessage, DownloadView, ResultRow};
use crate::utils::suggested_filename;

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
    registry: SessionRegistry,
    results: Vec<SearchResult>,
    // URL the current result set was looked up for
    results_url: String,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(ApiConfig::from_env())
    }
}

impl DownloadApp {
    pub fn new(config: ApiConfig) -> Self {
        tracing::info!(base_url = %config.base_url, "starting downloader");
        let coordinator = DownloadCoordinator::new(ApiClient::new(config));

        Self {
            view: DownloadView::default(),
            coordinator,
            registry: SessionRegistry::new(),
            results: Vec::new(),
            results_url: String::new(),
        }
    }

    fn start_download(&mut self, id: ItemId) -> Task<Message> {
        let StartedDownload { attempt, token } = match self.registry.start(&id) {
            Ok(started) => started,
            Err(e) => {
                self.view.status_message = format!("{}: {}", id, e);
                return Task::none();
            }
        };

        tracing::debug!(id = %id, active = self.registry.active_count(), "starting download task");
        let stream = self
            .coordinator
            .download_stream(self.results_url.clone(), id.clone(), token);
        Task::stream(stream).map(move |event| Message::Download {
            id: id.clone(),
            attempt,
            event,
        })
    }

    /// Keeps a finished row on screen for the configured time, then resets it.
    fn linger(&self, id: ItemId, attempt: u64) -> Task<Message> {
        let delay = self.coordinator.result_linger();
        Task::perform(tokio::time::sleep(delay), move |_| Message::Acknowledge {
            id,
            attempt,
        })
    }

    fn save_payload(&self, id: ItemId, payload: Bytes) -> Task<Message> {
        let filename = self
            .results
            .iter()
            .find(|r| r.id == id)
            .map(suggested_filename)
            .unwrap_or_else(|| "video.mp4".to_string());
        let coordinator = self.coordinator.clone();

        Task::perform(
            async move {
                match coordinator.choose_save_path(filename).await {
                    Some(path) => write_payload(&path, payload).await.map(|_| Some(path)),
                    None => Ok(None),
                }
            },
            move |result| Message::SaveCompleted(id, result),
        )
    }

    fn run(&self, follow_up: FollowUp) -> Task<Message> {
        match follow_up {
            FollowUp::Nothing => Task::none(),
            FollowUp::Linger { id, attempt } => self.linger(id, attempt),
            FollowUp::Save {
                id,
                attempt,
                payload,
            } => Task::batch([
                self.save_payload(id.clone(), payload),
                self.linger(id, attempt),
            ]),
        }
    }

    /// Replaces the result set. Downloads always use the URL that was
    /// searched, whatever the input field holds by now.
    fn apply_search(&mut self, result: Result<SearchOutcome, AppError>) {
        self.view.is_searching = false;
        match result {
            Ok(SearchOutcome { video_url, results }) => {
                // A new result set replaces the old one along with its downloads
                self.registry.clear();
                self.view.status_message = format!("Found {} streams", results.len());
                self.results = results;
                self.results_url = video_url;
                self.view.results_open = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "lookup failed");
                self.view.status_message = e.to_string();
            }
        }
    }

    /// Feeds a network event to its session and decides what has to happen
    /// next. Only the transition into a terminal state schedules anything.
    fn apply_download_event(
        &mut self,
        id: ItemId,
        attempt: u64,
        event: DownloadEvent,
    ) -> FollowUp {
        let before = self.registry.status(&id);
        if !self.registry.dispatch(&id, attempt, event) {
            return FollowUp::Nothing;
        }

        let after = self.registry.status(&id);
        if after == before {
            return FollowUp::Nothing;
        }
        match after {
            DownloadStatus::Complete => match self
                .registry
                .get_mut(&id)
                .and_then(|session| session.take_payload())
            {
                Some(payload) => FollowUp::Save {
                    id,
                    attempt,
                    payload,
                },
                None => FollowUp::Linger { id, attempt },
            },
            DownloadStatus::Failed(_) => FollowUp::Linger { id, attempt },
            _ => FollowUp::Nothing,
        }
    }

    fn apply_cancel(&mut self, id: ItemId) -> FollowUp {
        if !self.registry.cancel(&id) {
            return FollowUp::Nothing;
        }
        match self.registry.get(&id).map(|s| s.attempt()) {
            Some(attempt) => FollowUp::Linger { id, attempt },
            None => FollowUp::Nothing,
        }
    }

    fn rows(&self) -> Vec<ResultRow> {
        self.results
            .iter()
            .map(|result| {
                let status = self.registry.status(&result.id);
                ResultRow {
                    id: result.id.clone(),
                    quality: quality_label(result),
                    size: size_label(result.size),
                    presentation: present(&status),
                    cancellable: status.is_active(),
                    show_status: status != DownloadStatus::Idle,
                }
            })
            .collect()
    }
}

/// Work scheduled in response to a session reaching a terminal state.
#[derive(Debug, Clone, PartialEq)]
enum FollowUp {
    Nothing,
    Linger {
        id: ItemId,
        attempt: u64,
    },
    /// Save dialog for the payload, plus the linger timer
    Save {
        id: ItemId,
        attempt: u64,
        payload: Bytes,
    },
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    SearchCompleted(Result<SearchOutcome, AppError>),
    Download {
        id: ItemId,
        attempt: u64,
        event: DownloadEvent,
    },
    /// Saved path, or `None` when the save dialog was dismissed
    SaveCompleted(ItemId, Result<Option<PathBuf>, AppError>),
    Acknowledge {
        id: ItemId,
        attempt: u64,
    },
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::SearchPressed => {
                    if app.view.is_searching || app.view.video_url.trim().is_empty() {
                        return Task::none();
                    }
                    app.view.is_searching = true;
                    app.view.status_message = "Searching...".to_string();

                    let coordinator = app.coordinator.clone();
                    let video_url = app.view.video_url.trim().to_string();
                    return Task::perform(
                        async move { coordinator.search(video_url).await },
                        Message::SearchCompleted,
                    );
                }
                DownloadMessage::DownloadPressed(id) => return app.start_download(id),
                DownloadMessage::CancelPressed(id) => {
                    let follow_up = app.apply_cancel(id);
                    return app.run(follow_up);
                }
                DownloadMessage::UrlChanged(_) | DownloadMessage::CloseResults => {}
            }
        }
        Message::SearchCompleted(result) => app.apply_search(result),
        Message::Download { id, attempt, event } => {
            let follow_up = app.apply_download_event(id, attempt, event);
            return app.run(follow_up);
        }
        Message::SaveCompleted(id, result) => match result {
            Ok(Some(path)) => {
                app.view.status_message = format!("Saved: {}", path.display());
            }
            Ok(None) => {
                app.view.status_message = format!("{}: save cancelled", id);
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "saving payload failed");
                app.view.status_message = format!("{}: {}", id, e);
            }
        },
        Message::Acknowledge { id, attempt } => {
            app.registry.acknowledge(&id, attempt);
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    let rows = app.rows();
    app.view.view(&rows).map(Message::UiMessage)
}
