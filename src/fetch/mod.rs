// src/fetch/mod.rs
// =============================================================================
// This module does the actual network and disk work for one page.
//
// Submodules:
// - html: finds image URLs and the page count in a page's HTML
// - http: the reqwest-based fetcher (blocking and async flavours)
//
// The worker pool only sees the PageFetcher trait, so tests can swap in fakes
// that never touch the network.
// =============================================================================

mod html;
mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::job::Assignment;

/// Fetch one page and save its images.
///
/// Both methods return the number of images written to `out_dir`.
/// Implementations are cloned once per worker, so each worker owns a private
/// copy (and its own HTTP clients).
#[async_trait]
pub trait PageFetcher: Clone + Send + Sync + 'static {
    /// Used by sync-mode workers; may block the calling thread.
    fn fetch_blocking(&self, assignment: &Assignment, out_dir: &Path)
        -> Result<usize, FetchError>;

    /// Used by concurrent-mode workers; must only suspend at I/O points.
    async fn fetch(&self, assignment: &Assignment, out_dir: &Path) -> Result<usize, FetchError>;
}

// Everything that can go wrong while fetching one page.
// None of these stop the run: the worker turns them into a failed outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{url} has no file name to save it under")]
    NoFileName { url: String },

    #[error("page count label not found on {url}")]
    NoPageCount { url: String },

    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("fetch panicked: {0}")]
    Panicked(String),
}
