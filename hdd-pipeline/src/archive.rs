//! Where grid files come from.
//!
//! Files are named by run stamp, `YYYYMMDDHH.csv` or `YYYYMMDDHH.csv.gz`.
//! The directory archive reads a landing directory filled by an external
//! fetcher; the HTTP archive (feature `http`) pulls from a mirror exposing
//! `GET {base}/latest` and `GET {base}/{stamp}.csv.gz`.

use crate::source::Download;
use anyhow::Context;
use chrono::{DateTime, Utc};
use hdd_core::run::RunId;
use log::debug;
use std::path::{Path, PathBuf};

#[cfg(feature = "http")]
use log::info;
#[cfg(feature = "http")]
use std::time::Duration;

const GRID_EXTENSIONS: [&str; 2] = [".csv.gz", ".csv"];

/// Run stamp of an archive file name, if it is one.
fn stamp_of(file_name: &str) -> Option<RunId> {
    GRID_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .and_then(|stamp| RunId::from_stamp(stamp).ok())
}

pub enum GridArchive {
    Directory(PathBuf),
    #[cfg(feature = "http")]
    Http(HttpArchive),
}

impl GridArchive {
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        GridArchive::Directory(root.into())
    }

    pub fn latest(&self) -> anyhow::Result<Option<RunId>> {
        match self {
            GridArchive::Directory(root) => latest_in(root),
            #[cfg(feature = "http")]
            GridArchive::Http(http) => http.latest(),
        }
    }

    pub fn fetch(&self, run: &RunId) -> anyhow::Result<Download> {
        match self {
            GridArchive::Directory(root) => fetch_from(root, run),
            #[cfg(feature = "http")]
            GridArchive::Http(http) => http.fetch(run),
        }
    }
}

fn latest_in(root: &Path) -> anyhow::Result<Option<RunId>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("listing grid directory {}", root.display()))?;
    let mut latest: Option<RunId> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(run) = name.to_str().and_then(stamp_of) {
            latest = latest.max(Some(run));
        }
    }
    debug!(
        "latest grid in {}: {}",
        root.display(),
        latest.map_or_else(|| "none".to_string(), |run| run.to_string())
    );
    Ok(latest)
}

fn fetch_from(root: &Path, run: &RunId) -> anyhow::Result<Download> {
    let stamp = run.stamp();
    let path = GRID_EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{stamp}{ext}")))
        .find(|path| path.is_file())
        .with_context(|| format!("no grid file for run {run} in {}", root.display()))?;
    let modified = std::fs::metadata(&path)?.modified()?;
    Ok(Download {
        path,
        downloaded_at: DateTime::<Utc>::from(modified),
    })
}

/// Blocking client for a grid mirror. No retries: a failed request fails the
/// pass and the next poll tries again.
#[cfg(feature = "http")]
pub struct HttpArchive {
    base_url: String,
    download_dir: PathBuf,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpArchive {
    pub fn new(
        base_url: impl Into<String>,
        download_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(HttpArchive {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            download_dir: download_dir.into(),
            client,
        })
    }

    fn latest(&self) -> anyhow::Result<Option<RunId>> {
        let url = format!("{}/latest", self.base_url);
        let response = self.client.get(&url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.error_for_status()?.text()?;
        let run = RunId::from_stamp(body.trim())
            .with_context(|| format!("unexpected answer from {url}"))?;
        Ok(Some(run))
    }

    fn fetch(&self, run: &RunId) -> anyhow::Result<Download> {
        let file_name = format!("{}.csv.gz", run.stamp());
        let url = format!("{}/{file_name}", self.base_url);
        info!("downloading {url}");
        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(file_name);
        std::fs::write(&path, &bytes)
            .with_context(|| format!("saving {}", path.display()))?;
        info!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(Download {
            path,
            downloaded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_from_file_names() {
        assert_eq!(
            stamp_of("2025011212.csv.gz").map(|r| r.stamp()),
            Some("2025011212".to_string())
        );
        assert!(stamp_of("2025011200.csv").is_some());
        assert!(stamp_of("2025011200.nc").is_none());
        assert!(stamp_of("population.csv").is_none());
    }

    #[test]
    fn directory_latest_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2025011200.csv", "2025011212.csv.gz", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let archive = GridArchive::directory(dir.path());
        let latest = archive.latest().unwrap().unwrap();
        assert_eq!(latest.stamp(), "2025011212");

        let download = archive.fetch(&latest).unwrap();
        assert_eq!(download.path, dir.path().join("2025011212.csv.gz"));

        let missing = RunId::from_stamp("2025011300").unwrap();
        assert!(archive.fetch(&missing).is_err());
    }

    #[test]
    fn empty_directory_has_no_run() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(GridArchive::directory(dir.path()).latest().unwrap(), None);
    }
}
