use camino::{Utf8Path, Utf8PathBuf};

use crate::error::KiraError;

pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Utf8Path) -> bool;

    fn join(&self, root: &Utf8Path, relative: &str) -> Utf8PathBuf {
        let mut path = root.to_path_buf();
        for part in relative.split('/').filter(|part| !part.is_empty()) {
            path.push(part);
        }
        path
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl Filesystem for NativeFs {
    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }
}

pub fn current_dir() -> Result<Utf8PathBuf, KiraError> {
    let cwd = std::env::current_dir().map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| KiraError::Filesystem("invalid working directory path".to_string()))
}

pub fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
