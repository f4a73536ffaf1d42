use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::Url;
use serde::{Serialize, Serializer};

use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VirtualPath {
    Local(Utf8PathBuf),
    Remote(Url),
}

impl VirtualPath {
    pub fn local(path: impl Into<Utf8PathBuf>) -> Result<Self, KiraError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(KiraError::InvalidPath(format!(
                "local path must be absolute: {path}"
            )));
        }
        Ok(VirtualPath::Local(path))
    }

    pub fn remote(link: &str) -> Result<Self, KiraError> {
        let url = Url::parse(link).map_err(|err| KiraError::InvalidPath(err.to_string()))?;
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| KiraError::InvalidPath(link.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|_| KiraError::InvalidPath(link.to_string()))?;
            return Self::local(path);
        }
        Ok(VirtualPath::Remote(url))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, VirtualPath::Local(_))
    }

    pub fn read_path(&self) -> Result<&Utf8Path, KiraError> {
        match self {
            VirtualPath::Local(path) => Ok(path),
            VirtualPath::Remote(url) => Err(KiraError::InvalidPath(format!(
                "not a local path: {url}"
            ))),
        }
    }

    pub fn scheme(&self) -> &str {
        match self {
            VirtualPath::Local(_) => "file",
            VirtualPath::Remote(url) => url.scheme(),
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualPath::Local(path) => write!(f, "{path}"),
            VirtualPath::Remote(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for VirtualPath {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KiraError::InvalidPath("empty path".to_string()));
        }
        if trimmed.contains("://") {
            Self::remote(trimmed)
        } else {
            Self::local(Utf8PathBuf::from(trimmed))
        }
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
