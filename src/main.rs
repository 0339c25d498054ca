mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    // .env first so RUST_LOG and VIDEO_DL_* can live there
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    iced::application(app::DownloadApp::default, app::update, app::view)
        .title("Video Downloader")
        .run()
}
