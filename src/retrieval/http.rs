use crate::retrieval::error::RetrievalError;
use crate::retrieval::ObjectRetriever;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;
use tokio::task;
use tokio_util::io::StreamReader;

const PARTIAL_PREFIX: &str = ".partial-";

/// Anonymous HTTPS access to a public object-store bucket, e.g.
/// `https://noaa-hrrr-bdp-pds.s3.amazonaws.com/<object>`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: String,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(RetrievalError::ClientBuild)?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn bucket_endpoint(bucket: &str) -> String {
        format!("https://{bucket}.s3.amazonaws.com")
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn object_url(&self, object_name: &str) -> String {
        format!("{}/{}", self.endpoint, object_name.trim_start_matches('/'))
    }
}

impl ObjectRetriever for HttpObjectStore {
    async fn retrieve(
        &self,
        object_name: &str,
        destination_dir: &Path,
        file_name: &str,
    ) -> Result<u64, RetrievalError> {
        let url = self.object_url(object_name);
        info!("Downloading data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RetrievalError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    RetrievalError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    RetrievalError::NetworkRequest(url, e)
                });
            }
        };

        let (mut file, temp_path) = partial_file(destination_dir).await?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);

        let download_io = |source: std::io::Error| RetrievalError::DownloadIo {
            url: url.clone(),
            source,
        };
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(download_io)?;
        file.flush().await.map_err(download_io)?;
        drop(file);

        let destination = destination_dir.join(file_name);
        let target = destination.clone();
        task::spawn_blocking(move || temp_path.persist(&target))
            .await?
            .map_err(|e| RetrievalError::Persist(destination.clone(), e.error))?;

        info!(
            "Successfully downloaded {} bytes to {}",
            written,
            destination.display()
        );
        Ok(written)
    }
}

/// Creates the temp file a download streams into, next to its destination. The file
/// is removed when the returned path is dropped, so partial downloads never linger.
async fn partial_file(dir: &Path) -> Result<(tokio::fs::File, TempPath), RetrievalError> {
    let dir = dir.to_path_buf();
    let (file, path) = task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&dir)
            .map(NamedTempFile::into_parts)
            .map_err(|e| RetrievalError::TempFile(dir, e))
    })
    .await??;
    Ok((tokio::fs::File::from_std(file), path))
}
