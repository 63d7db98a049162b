//! Directory clients: where church records actually come from
//!
//! Two implementations of the core crate's [`ChurchDirectory`] seam: an HTTP
//! client against a remote directory service, and a JSON file reader for
//! offline seeds and demos. Both block; the application runs them on a
//! background task and marshals results back to the UI thread.

use church_map_lib::utils::lat_lon;
use church_map_lib::{Church, ChurchDirectory, Confession, DirectoryQuery, MapError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Wire format of one church record
#[derive(Debug, Deserialize)]
struct ChurchRecord {
    id: i64,
    latitude: f64,
    longitude: f64,
    confession: String,
    name: String,
    #[serde(default)]
    address: Option<String>,
}

impl ChurchRecord {
    fn into_church(self) -> Result<Church> {
        let confession = match self.confession.to_ascii_lowercase().as_str() {
            "orthodox" => Confession::Orthodox,
            "catholic" => Confession::Catholic,
            "protestant" => Confession::Protestant,
            other => {
                return Err(MapError::InvalidRecord(format!(
                    "unknown confession {:?} for church {}",
                    other, self.id
                )));
            }
        };
        Ok(Church {
            id: self.id,
            position: lat_lon(self.latitude, self.longitude),
            confession,
            name: self.name,
            address: self.address,
        })
    }
}

fn parse_records(records: Vec<ChurchRecord>) -> Result<Vec<Church>> {
    records.into_iter().map(ChurchRecord::into_church).collect()
}

/// HTTP client for a remote church-directory service
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("church-map-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MapError::Fetch(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl ChurchDirectory for HttpDirectory {
    fn fetch(&self, query: &DirectoryQuery) -> Result<Vec<Church>> {
        let confessions: Vec<&str> = Confession::ALL
            .iter()
            .filter(|c| query.filter.contains(**c))
            .map(|c| c.name())
            .collect();

        let url = format!(
            "{}/churches?lat={}&lon={}&confessions={}",
            self.base_url,
            query.near.y(),
            query.near.x(),
            confessions.join(",").to_ascii_lowercase()
        );
        tracing::debug!(url, "fetching churches");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| MapError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MapError::Fetch(format!(
                "directory returned HTTP {}",
                response.status()
            )));
        }

        let records: Vec<ChurchRecord> = response
            .json()
            .map_err(|e| MapError::Fetch(format!("malformed directory response: {}", e)))?;
        parse_records(records)
    }
}

/// Directory backed by a local JSON file (offline seed)
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ChurchDirectory for FileDirectory {
    fn fetch(&self, _query: &DirectoryQuery) -> Result<Vec<Church>> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            MapError::Fetch(format!("failed to open {}: {}", self.path.display(), e))
        })?;
        let reader = std::io::BufReader::new(file);
        let records: Vec<ChurchRecord> = serde_json::from_reader(reader)
            .map_err(|e| MapError::Fetch(format!("malformed {}: {}", self.path.display(), e)))?;
        parse_records(records)
    }
}

/// Placeholder used when no directory was configured on the command line
///
/// Every fetch fails with a hint; locally cached data keeps being served.
pub struct UnconfiguredDirectory;

impl ChurchDirectory for UnconfiguredDirectory {
    fn fetch(&self, _query: &DirectoryQuery) -> Result<Vec<Church>> {
        Err(MapError::Fetch(
            "no church directory configured; pass --churches-file or --directory-url".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use church_map_lib::ConfessionFilter;

    fn record(confession: &str) -> ChurchRecord {
        ChurchRecord {
            id: 1,
            latitude: 55.75,
            longitude: 37.62,
            confession: confession.to_string(),
            name: "test".to_string(),
            address: None,
        }
    }

    #[test]
    fn test_record_parses_known_confessions() {
        for (input, expected) in [
            ("orthodox", Confession::Orthodox),
            ("Catholic", Confession::Catholic),
            ("PROTESTANT", Confession::Protestant),
        ] {
            let church = record(input).into_church().unwrap();
            assert_eq!(church.confession, expected);
        }
    }

    #[test]
    fn test_record_rejects_unknown_confession() {
        let result = record("druid").into_church();
        assert!(matches!(result, Err(MapError::InvalidRecord(_))));
    }

    #[test]
    fn test_file_directory_reads_seed() {
        let path = std::env::temp_dir().join("church-map-viewer-test-seed.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "latitude": 55.75, "longitude": 37.62,
                 "confession": "orthodox", "name": "St. Basil"},
                {"id": 2, "latitude": 55.76, "longitude": 37.63,
                 "confession": "catholic", "name": "Immaculate Conception",
                 "address": "Malaya Gruzinskaya 27"}
            ]"#,
        )
        .unwrap();

        let directory = FileDirectory::new(path.clone());
        let query = DirectoryQuery {
            near: lat_lon(55.75, 37.62),
            filter: ConfessionFilter::all(),
        };
        let churches = directory.fetch(&query).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(churches.len(), 2);
        assert_eq!(churches[1].address.as_deref(), Some("Malaya Gruzinskaya 27"));
    }

    #[test]
    fn test_file_directory_missing_file_is_fetch_error() {
        let directory = FileDirectory::new(PathBuf::from("/nonexistent/churches.json"));
        let query = DirectoryQuery {
            near: lat_lon(0.0, 0.0),
            filter: ConfessionFilter::all(),
        };
        assert!(matches!(
            directory.fetch(&query),
            Err(MapError::Fetch(_))
        ));
    }

    #[test]
    fn test_unconfigured_directory_always_fails() {
        let query = DirectoryQuery {
            near: lat_lon(0.0, 0.0),
            filter: ConfessionFilter::all(),
        };
        let result = UnconfiguredDirectory.fetch(&query);
        assert!(matches!(result, Err(MapError::Fetch(_))));
    }
}
