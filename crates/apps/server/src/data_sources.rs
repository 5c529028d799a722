//! Spatial data sources the fetch driver can query.
//!
//! - Overpass API over HTTP (the production source)
//! - A saved Overpass response on disk (offline replay)
//! - In-memory scripted responses
//!
//! New sources can be added by implementing [`SpatialSource`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use streaming::{BoxFuture, FetchError, OverpassResponse, SpatialSource};
use tracing::debug;

/// Overpass API interpreter endpoint. The query travels as the `data` form
/// field of a POST.
pub struct OverpassSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OverpassSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

impl SpatialSource for OverpassSource {
    fn name(&self) -> &str {
        "overpass"
    }

    fn fetch<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<OverpassResponse, FetchError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .form(&[("data", query)])
                .timeout(self.timeout)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            let bytes = resp.bytes().await.map_err(map_reqwest_error)?;
            debug!(url = %self.url, bytes = bytes.len(), "overpass response");
            OverpassResponse::from_slice(&bytes)
        })
    }
}

/// Replays a saved Overpass JSON document, whatever the query.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SpatialSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<OverpassResponse, FetchError>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                FetchError::Network(format!("failed to read {}: {e}", self.path.display()))
            })?;
            OverpassResponse::from_slice(&bytes)
        })
    }
}

struct Scripted {
    delay: Duration,
    result: Result<OverpassResponse, FetchError>,
}

/// In-memory source.
///
/// Scripted replies are consumed in fetch order, each after its delay; once
/// the script runs out every fetch gets the fallback response immediately.
/// Received queries are recorded.
pub struct MemorySource {
    fallback: OverpassResponse,
    script: Mutex<VecDeque<Scripted>>,
    queries: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new(fallback: OverpassResponse) -> Self {
        Self {
            fallback,
            script: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, delay: Duration, result: Result<OverpassResponse, FetchError>) {
        self.script.lock().push_back(Scripted { delay, result });
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl SpatialSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<OverpassResponse, FetchError>> {
        self.queries.lock().push(query.to_string());
        let next = self.script.lock().pop_front();
        Box::pin(async move {
            match next {
                Some(Scripted { delay, result }) => {
                    tokio::time::sleep(delay).await;
                    result
                }
                None => Ok(self.fallback.clone()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSource, MemorySource};
    use std::time::Duration;
    use streaming::{FetchError, OverpassResponse, SpatialSource};

    #[tokio::test]
    async fn memory_source_follows_script_then_fallback() {
        let src = MemorySource::new(OverpassResponse::default());
        src.push(Duration::ZERO, Err(FetchError::Timeout));

        assert_eq!(src.fetch("q1").await.unwrap_err(), FetchError::Timeout);
        assert!(src.fetch("q2").await.unwrap().elements.is_empty());
        assert_eq!(src.queries(), vec!["q1".to_string(), "q2".to_string()]);
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let src = FileSource::new("/nonexistent/overpass.json");
        assert!(matches!(src.fetch("").await, Err(FetchError::Network(_))));
    }
}
