//! HTTP primitives: fetch a body as text, follow a contents-API entry to its
//! `download_url`, and stream raw bytes into a file.

use std::path::Path;

use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid contents response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Contents response from {url} has no download_url")]
    MissingDownloadUrl { url: String },
}

/// One entry of a contents-API response.
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    download_url: Option<String>,
}

async fn get_ok(client: &Client, url: &str) -> Result<Response, DownloadError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }
    Ok(response)
}

/// GET `url` and return the body. Any non-success status is an error.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, DownloadError> {
    Ok(get_ok(client, url).await?.text().await?)
}

/// GET a contents-API `url` and return the `download_url` it points at.
pub async fn contents_download_url(client: &Client, url: &str) -> Result<String, DownloadError> {
    let body = fetch_text(client, url).await?;
    let entry: ContentsEntry = serde_json::from_str(&body)?;
    entry
        .download_url
        .ok_or_else(|| DownloadError::MissingDownloadUrl {
            url: url.to_string(),
        })
}

/// Stream the body of `url` into `dest`, returning the number of bytes written.
///
/// Nothing is created when the request fails; a body that fails mid-stream
/// removes the partial file.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let response = get_ok(client, url).await?;

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                tokio::fs::remove_file(dest).await.ok();
                return Err(e.into());
            }
        };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
