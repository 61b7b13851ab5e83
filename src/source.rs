//! Where the raw CSV bytes come from: a local file or an HTTP(S) export URL.
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::DataLoadError;

pub trait DataSource: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Fetch the complete raw table.
    fn fetch(&self) -> Result<Vec<u8>, DataLoadError>;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, DataLoadError> {
        Ok(std::fs::read(&self.path)?)
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DataLoadError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| DataLoadError::Http {
                url: url.clone(),
                source,
            })?;
        Ok(Self { url, client })
    }
}

impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, DataLoadError> {
        debug!(url = %self.url, "fetching course table");
        let body = self
            .client
            .get(&self.url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())
            .map_err(|source| DataLoadError::Http {
                url: self.url.clone(),
                source,
            })?;
        Ok(body.to_vec())
    }
}

/// Pick the source implementation from a location string.
pub fn from_location(location: &str, timeout: Duration) -> Result<Box<dyn DataSource>, DataLoadError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}
