use iced::{
    widget::{button, column, progress_bar, row, scrollable, text, text_input, Column, Space},
    Alignment, Element, Length,
};

use crate::application::Presentation;
use crate::domain::ItemId;

/// Main view state
pub struct DownloadView {
    pub video_url: String,
    pub status_message: String,
    pub is_searching: bool,
    pub results_open: bool,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            video_url: String::new(),
            status_message: "Paste a video URL and press Search".to_string(),
            is_searching: false,
            results_open: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    SearchPressed,
    DownloadPressed(ItemId),
    CancelPressed(ItemId),
    CloseResults,
}

/// One stream in the options list, already formatted.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub id: ItemId,
    pub quality: String,
    pub size: String,
    pub presentation: Presentation,
    /// A download is running, so the row offers Cancel instead of Download.
    pub cancellable: bool,
    /// Idle rows only show the button.
    pub show_status: bool,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.video_url = url;
            }
            DownloadMessage::CloseResults => {
                self.results_open = false;
            }
            DownloadMessage::SearchPressed
            | DownloadMessage::DownloadPressed(_)
            | DownloadMessage::CancelPressed(_) => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self, rows: &[ResultRow]) -> Element<'_, DownloadMessage> {
        let search_label = if self.is_searching {
            "Searching..."
        } else {
            "Search"
        };

        let mut content = column![
            text("Video Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            row![
                text_input("Paste video URL here", &self.video_url)
                    .on_input(DownloadMessage::UrlChanged)
                    .on_submit(DownloadMessage::SearchPressed)
                    .padding(10),
                button(search_label)
                    .on_press_maybe((!self.is_searching).then_some(DownloadMessage::SearchPressed))
                    .padding([10, 20]),
            ]
            .spacing(10),
            text(&self.status_message).size(14),
        ]
        .padding(20)
        .spacing(10);

        if self.results_open {
            content = content.push(Space::new().height(Length::Fixed(10.0)));
            content = content.push(text("Download Options").size(20));
            content = content.push(scrollable(
                Column::with_children(rows.iter().map(result_row)).spacing(12),
            ));
            content = content.push(
                button("Close")
                    .on_press(DownloadMessage::CloseResults)
                    .padding([8, 16]),
            );
        }

        content.into()
    }
}

fn result_row(row_data: &ResultRow) -> Element<'static, DownloadMessage> {
    let presentation = &row_data.presentation;

    let action: Element<'static, DownloadMessage> = if row_data.cancellable {
        button("Cancel")
            .on_press(DownloadMessage::CancelPressed(row_data.id.clone()))
            .padding([6, 12])
            .into()
    } else {
        button("Download")
            .on_press_maybe(
                presentation
                    .action_enabled
                    .then(|| DownloadMessage::DownloadPressed(row_data.id.clone())),
            )
            .padding([6, 12])
            .into()
    };

    let header = row![
        text(row_data.quality.clone()).width(Length::Fill),
        text(row_data.size.clone()),
        action,
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let mut cell = column![header].spacing(4);

    match presentation.progress_percent {
        Some(percent) if presentation.progress_visible => {
            cell = cell.push(progress_bar(0.0..=100.0, percent));
        }
        _ => {}
    }
    if row_data.show_status {
        cell = cell.push(text(presentation.label.clone()).size(12));
    }

    cell.into()
}
