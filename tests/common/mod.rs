#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use kira_resolver::domain::ObjectType;
use kira_resolver::error::KiraError;
use kira_resolver::names::{NamesClient, NamesQuery, RemoteFile, RemoteLocation, RemoteRecord};
use kira_resolver::path::VirtualPath;

pub const ACC: &str = "SRR850901";

/// Names service double: knows a fixed set of accessions, records every batch.
#[derive(Default)]
pub struct MockNames {
    known: HashSet<String>,
    unavailable: bool,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockNames {
    pub fn knowing(ids: &[&str]) -> Self {
        Self {
            known: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl NamesClient for MockNames {
    fn resolve_batch(&self, query: &NamesQuery) -> Result<Vec<RemoteRecord>, KiraError> {
        self.calls.lock().unwrap().push(
            query
                .accessions
                .iter()
                .map(|acc| acc.to_string())
                .collect(),
        );
        if self.unavailable {
            return Err(KiraError::TransportUnavailable("connection refused".to_string()));
        }
        Ok(query
            .accessions
            .iter()
            .map(|acc| {
                if self.known.contains(acc.as_str()) {
                    RemoteRecord::found(acc.clone(), vec![sra_file(acc.as_str())])
                } else {
                    RemoteRecord::failed(acc.clone(), 404, "No data at given location")
                }
            })
            .collect())
    }
}

pub fn sra_file(acc: &str) -> RemoteFile {
    RemoteFile {
        name: acc.to_string(),
        object_type: ObjectType::Sra,
        size: Some(323_741_972),
        md5: Some("5e213b2319bd1af17c47120ee8b16dbc".to_string()),
        modified: None,
        locations: vec![RemoteLocation {
            link: VirtualPath::remote(&format!(
                "https://sra-pub-run-odp.s3.amazonaws.com/sra/{acc}/{acc}"
            ))
            .unwrap(),
            service: Some("s3".to_string()),
            region: Some("us-east-1".to_string()),
        }],
    }
}

pub fn workdir() -> (TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, dir)
}

pub fn touch(path: &Utf8Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path()).unwrap();
    }
    std::fs::write(path.as_std_path(), b"data").unwrap();
}
