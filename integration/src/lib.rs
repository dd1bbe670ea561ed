//! Application wiring
//!
//! Composes the scanner, the live feed, and the usage gate into one
//! session object, and carries the pieces that sit between them:
//! logging bootstrap and download planning.

pub mod logger;
pub mod downloads;
pub mod application;

pub use logger::{Logger, LoggerConfig};
pub use downloads::{
    change_ext, filename_from_url, sanitize_filename, DownloadOutcome, DownloadPlanner, Downloader,
};
pub use application::MediaSession;
