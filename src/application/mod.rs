pub mod download_coordinator;
pub mod presenter;
pub mod registry;
pub mod session;
pub mod stream_reader;

pub use download_coordinator::{DownloadCoordinator, DownloadEvent, SearchOutcome};
pub use presenter::Presentation;
pub use registry::{SessionRegistry, StartedDownload};
