use std::collections::BTreeMap;
use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde_json::Value;
use tracing::debug;

use crate::error::KiraError;

pub const USER_ROOT_KEY: &str = "/repository/user/main/public/root";
pub const USER_CACHE_DISABLED_KEY: &str = "/repository/user/cache-disabled";
pub const AD_CACHING_KEY: &str = "/repository/user/ad-caching";
pub const REMOTE_DISABLED_KEY: &str = "/repository/remote/disabled";
pub const RESOLVER_CGI_KEY: &str = "/repository/remote/main/SDL.2/resolver-cgi";
pub const CONFIG_ENV: &str = "KIRA_RESOLVER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    pub fn read_bool(&self, key: &str) -> Option<bool> {
        self.read(key).and_then(|value| match value.trim() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    }

    pub fn write(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    pub fn children(&self, prefix: &str) -> Vec<String> {
        let mut prefix = normalize_key(prefix);
        prefix.push('/');
        let mut names: Vec<String> = Vec::new();
        for key in self.values.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let name = rest.split('/').next().unwrap_or(rest);
                if !name.is_empty() && !names.iter().any(|existing| existing == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn from_json(value: &Value) -> Result<Self, KiraError> {
        let mut store = Self::new();
        match value {
            Value::Object(_) => flatten_into(&mut store, String::new(), value),
            _ => {
                return Err(KiraError::ConfigParse(
                    "config root must be a JSON object".to_string(),
                ));
            }
        }
        Ok(store)
    }
}

fn flatten_into(store: &mut ConfigStore, prefix: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = format!("{prefix}/{}", key.trim_matches('/'));
                flatten_into(store, path, child);
            }
        }
        Value::String(text) => store.write(&prefix, text.clone()),
        Value::Null => {}
        other => store.write(&prefix, other.to_string()),
    }
}

fn normalize_key(key: &str) -> String {
    let parts = key.split('/').filter(|part| !part.is_empty());
    let mut normalized = String::new();
    for part in parts {
        normalized.push('/');
        normalized.push_str(part);
    }
    normalized
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ConfigStore, KiraError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(ConfigStore::new()),
            },
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            debug!(path = %config_path, "no user settings file");
            return Ok(ConfigStore::new());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let store = Self::parse(&content)?;
        debug!(path = %config_path, keys = store.len(), "settings loaded");
        Ok(store)
    }

    pub fn parse(content: &str) -> Result<ConfigStore, KiraError> {
        let value: Value =
            serde_json::from_str(content).map_err(|err| KiraError::ConfigParse(err.to_string()))?;
        ConfigStore::from_json(&value)
    }

    pub fn default_path() -> Option<Utf8PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(Utf8PathBuf::from(path.trim()));
            }
        }
        BaseDirs::new().and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.home_dir()
                    .join(".kira-resolver")
                    .join("user-settings.json"),
            )
            .ok()
        })
    }
}
