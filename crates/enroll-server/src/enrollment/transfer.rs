//! Fetching source files and naming their reports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enroll_common::{EnrollError, Result};
use futures::TryStreamExt;
use reqwest::{Client, Url};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{fs, io};
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Fallback file name when a URL has no usable last segment
const DEFAULT_FILE_NAME: &str = "enrollment-file";

#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Make the source available as a local file and return its path
    async fn download(&self, source: &str) -> Result<PathBuf>;
}

/// `-Processing-Report-<yyyyMMddHHmmssfff>` for the given instant
pub fn report_suffix(now: DateTime<Utc>) -> String {
    format!("-Processing-Report-{}", now.format("%Y%m%d%H%M%S%3f"))
}

/// Insert `suffix` between the file stem and its extension
///
/// `/tmp/acme.csv` with `-Report` becomes `/tmp/acme-Report.csv`.
pub fn report_path_for(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    path.with_file_name(file_name)
}

/// Downloads `http(s)://` sources and copies `file://` or plain-path sources
/// into a download directory.
///
/// Every download gets its own `<download_dir>/<uuid>/` directory and keeps
/// the source's file name, so jobs never share a local file even when two
/// employers upload files with the same name. The report is written next to
/// the local copy.
pub struct HttpFileTransfer {
    client: Client,
    download_dir: PathBuf,
}

impl HttpFileTransfer {
    pub fn new(download_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EnrollError::transient)?;

        Ok(Self {
            client,
            download_dir: download_dir.into(),
        })
    }

    async fn fetch_url(&self, url: Url, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(EnrollError::transient)?;

        let reader = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        tokio::pin!(reader);
        let mut file = fs::File::create(destination).await?;

        let bytes = io::copy(&mut reader, &mut file)
            .await
            .map_err(EnrollError::transient)?;

        tracing::debug!(bytes, path = %destination.display(), "Source file downloaded");
        Ok(())
    }

    async fn copy_local(&self, source: &Path, destination: &Path) -> Result<()> {
        let bytes = fs::copy(source, destination).await.map_err(|e| {
            EnrollError::transient(format!("failed to copy '{}': {}", source.display(), e))
        })?;

        tracing::debug!(bytes, path = %destination.display(), "Source file copied");
        Ok(())
    }

    /// Fresh directory for one download, holding `file_name`
    async fn destination_for(&self, file_name: &str) -> Result<PathBuf> {
        let job_dir = self.download_dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&job_dir).await?;
        Ok(job_dir.join(file_name))
    }

    async fn stage_local(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                EnrollError::transient(format!("'{}' does not name a file", source.display()))
            })?;
        let destination = self.destination_for(&file_name).await?;

        let copied = self.copy_local(source, &destination).await;
        discard_on_error(copied, &destination).await
    }
}

#[async_trait]
impl FileTransfer for HttpFileTransfer {
    #[tracing::instrument(skip(self))]
    async fn download(&self, source: &str) -> Result<PathBuf> {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let destination = self.destination_for(&url_file_name(&url)).await?;
                let fetched = self.fetch_url(url, &destination).await;
                discard_on_error(fetched, &destination).await
            },
            Ok(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|_| {
                    EnrollError::transient(format!("'{}' is not a valid file URL", source))
                })?;
                self.stage_local(&path).await
            },
            _ => self.stage_local(Path::new(source)).await,
        }
    }
}

/// Pass `destination` through, or remove its directory when the transfer failed
async fn discard_on_error(result: Result<()>, destination: &Path) -> Result<PathBuf> {
    if let Err(e) = result {
        if let Some(job_dir) = destination.parent() {
            if let Err(cleanup) = fs::remove_dir_all(job_dir).await {
                tracing::warn!(path = %job_dir.display(), error = %cleanup, "Failed to remove download directory");
            }
        }
        return Err(e);
    }
    Ok(destination.to_path_buf())
}

fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string()
}
