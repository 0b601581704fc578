// src/fetch/http.rs
// =============================================================================
// The real fetcher: downloads a gallery page and the images on it.
//
// Two flavours of the same work:
// - fetch_blocking: reqwest's blocking client + std::fs, one request at a time
// - fetch: reqwest's async client + tokio::fs, a page's images in parallel
//
// Each worker gets its own HttpFetcher copy and builds its own client on first
// use. Clients are never shared between workers, because an async client's
// connections belong to the runtime that opened them.
//
// A page counts as a success only if the page and every matching image on it
// were downloaded and written. A page without matching images is a success.
// =============================================================================

use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::html::{extract_image_urls, image_file_name, parse_page_count};
use super::{FetchError, PageFetcher};
use crate::job::Assignment;
use crate::settings::Settings;

#[derive(Debug)]
pub struct HttpFetcher {
    base_url: Url,
    item: String,
    image_host: String,
    timeout: Duration,
    blocking: OnceLock<reqwest::blocking::Client>,
    client: OnceLock<reqwest::Client>,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            item: settings.item.clone(),
            image_host: settings.image_host.clone(),
            timeout: settings.request_timeout(),
            blocking: OnceLock::new(),
            client: OnceLock::new(),
        }
    }

    // Page N lives at {base_url}p{N}/{item}.html
    pub fn page_url(&self, page: u32) -> Result<Url, FetchError> {
        Ok(self.base_url.join(&format!("p{}/{}.html", page, self.item))?)
    }

    // Asks page 1 how many pages the site has
    //
    // Blocking; called once by the supervisor thread before any worker starts.
    pub fn probe_page_count(&self) -> Result<u32, FetchError> {
        let client = self.blocking_client()?;
        let url = self.page_url(1)?;
        let html = get_blocking(client, &url)?
            .text()
            .map_err(|e| categorize_error(&url, e))?;

        parse_page_count(&html).ok_or_else(|| FetchError::NoPageCount {
            url: url.to_string(),
        })
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, FetchError> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(self.blocking.get_or_init(|| client))
    }

    fn async_client(&self) -> Result<&reqwest::Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(self.client.get_or_init(|| client))
    }

    async fn save_image(
        &self,
        client: &reqwest::Client,
        image: &Url,
        out_dir: &Path,
    ) -> Result<(), FetchError> {
        let path = image_path(image, out_dir)?;
        let bytes = get_async(client, image)
            .await?
            .bytes()
            .await
            .map_err(|e| categorize_error(image, e))?;

        let written = tokio::fs::write(&path, &bytes).await;
        written.map_err(|source| FetchError::Io { path, source })?;
        debug!("saved {}", image);
        Ok(())
    }
}

// Copies carry the configuration only; each copy builds its own clients.
impl Clone for HttpFetcher {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            item: self.item.clone(),
            image_host: self.image_host.clone(),
            timeout: self.timeout,
            blocking: OnceLock::new(),
            client: OnceLock::new(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn fetch_blocking(
        &self,
        assignment: &Assignment,
        out_dir: &Path,
    ) -> Result<usize, FetchError> {
        let client = self.blocking_client()?;
        let page_url = self.page_url(assignment.page)?;
        let html = get_blocking(client, &page_url)?
            .text()
            .map_err(|e| categorize_error(&page_url, e))?;

        let images = extract_image_urls(&html, &page_url, &self.image_host);
        debug!("{}: {} image(s) found", assignment, images.len());

        for image in &images {
            let path = image_path(image, out_dir)?;
            let bytes = get_blocking(client, image)?
                .bytes()
                .map_err(|e| categorize_error(image, e))?;
            let written = std::fs::write(&path, &bytes);
            written.map_err(|source| FetchError::Io { path, source })?;
            debug!("saved {}", image);
        }

        Ok(images.len())
    }

    async fn fetch(&self, assignment: &Assignment, out_dir: &Path) -> Result<usize, FetchError> {
        let client = self.async_client()?;
        let page_url = self.page_url(assignment.page)?;
        let html = get_async(client, &page_url)
            .await?
            .text()
            .await
            .map_err(|e| categorize_error(&page_url, e))?;

        let images = extract_image_urls(&html, &page_url, &self.image_host);
        debug!("{}: {} image(s) found", assignment, images.len());

        try_join_all(
            images
                .iter()
                .map(|image| self.save_image(client, image, out_dir)),
        )
        .await?;

        Ok(images.len())
    }
}

fn image_path(image: &Url, out_dir: &Path) -> Result<PathBuf, FetchError> {
    let name = image_file_name(image).ok_or_else(|| FetchError::NoFileName {
        url: image.to_string(),
    })?;
    Ok(out_dir.join(name))
}

// GET that treats any non-2xx status as an error
fn get_blocking(
    client: &reqwest::blocking::Client,
    url: &Url,
) -> Result<reqwest::blocking::Response, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .map_err(|e| categorize_error(url, e))?;
    check_status(url, response.status())?;
    Ok(response)
}

async fn get_async(client: &reqwest::Client, url: &Url) -> Result<reqwest::Response, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| categorize_error(url, e))?;
    check_status(url, response.status())?;
    Ok(response)
}

fn check_status(url: &Url, status: reqwest::StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

// Sorts reqwest errors into the few kinds worth telling apart in the logs
fn categorize_error(url: &Url, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url,
            message: error.to_string(),
        }
    }
}
