use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::debug;

use crate::config::{AD_CACHING_KEY, ConfigStore, USER_CACHE_DISABLED_KEY, USER_ROOT_KEY};
use crate::domain::{Accession, App, ObjectType};
use crate::error::LocationError;
use crate::fs::{Filesystem, NativeFs, absolutize};
use crate::path::VirtualPath;

const USER_PREFIX: &str = "/repository/user/main/public";
const SITE_PREFIX: &str = "/repository/site/main";
const APPS: [App; 3] = [App::Sra, App::Refseq, App::Wgs];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    AccessionDirectory,
    User,
    Site,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::AccessionDirectory => write!(f, "accession-directory"),
            Tier::User => write!(f, "user"),
            Tier::Site => write!(f, "site"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    tier: Tier,
    name: String,
    root: Utf8PathBuf,
    volumes: Vec<(App, Vec<String>)>,
    cache_enabled: bool,
}

impl Repository {
    pub fn user(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            tier: Tier::User,
            name: "public".to_string(),
            root: root.into(),
            volumes: Vec::new(),
            cache_enabled: true,
        }
    }

    pub fn site(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            tier: Tier::Site,
            name: name.into(),
            root: root.into(),
            volumes: Vec::new(),
            cache_enabled: false,
        }
    }

    pub fn with_volume(mut self, app: App, volume: impl Into<String>) -> Self {
        let volume = volume.into();
        match self.volumes.iter_mut().find(|(existing, _)| *existing == app) {
            Some((_, list)) => list.push(volume),
            None => self.volumes.push((app, vec![volume])),
        }
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled && self.tier == Tier::User;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn volumes(&self, app: App) -> &[String] {
        self.volumes
            .iter()
            .find(|(existing, _)| *existing == app)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }

    fn candidate_paths(
        &self,
        fs: &dyn Filesystem,
        app: App,
        file_name: &str,
    ) -> Vec<Utf8PathBuf> {
        self.volumes(app)
            .iter()
            .map(|volume| fs.join(&fs.join(&self.root, volume), file_name))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHit {
    pub path: VirtualPath,
    pub tier: Tier,
}

#[derive(Clone)]
pub struct RepositoryHierarchy {
    repositories: Vec<Repository>,
    working_dir: Utf8PathBuf,
    ad_caching: bool,
    fs: Arc<dyn Filesystem>,
}

impl fmt::Debug for RepositoryHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryHierarchy")
            .field("repositories", &self.repositories)
            .field("working_dir", &self.working_dir)
            .field("ad_caching", &self.ad_caching)
            .finish()
    }
}

impl RepositoryHierarchy {
    pub fn new(working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repositories: Vec::new(),
            working_dir: working_dir.into(),
            ad_caching: false,
            fs: Arc::new(NativeFs),
        }
    }

    pub fn from_config(config: &ConfigStore, working_dir: impl Into<Utf8PathBuf>) -> Self {
        let mut hierarchy = Self::new(working_dir);

        if let Some(root) = config.read(USER_ROOT_KEY) {
            let root = absolutize(&hierarchy.working_dir, Utf8Path::new(root.trim()));
            let mut user = read_volumes(config, USER_PREFIX, Repository::user(root));
            let cache_enabled = config
                .read_bool(&format!("{USER_PREFIX}/cache-enabled"))
                .unwrap_or(true)
                && !config.read_bool(USER_CACHE_DISABLED_KEY).unwrap_or(false);
            user = user.with_cache_enabled(cache_enabled);
            hierarchy = hierarchy.with_repository(user);
        }

        for name in config.children(SITE_PREFIX) {
            let prefix = format!("{SITE_PREFIX}/{name}");
            let Some(root) = config.read(&format!("{prefix}/root")) else {
                continue;
            };
            let root = absolutize(&hierarchy.working_dir, Utf8Path::new(root.trim()));
            let site = read_volumes(config, &prefix, Repository::site(name, root));
            hierarchy = hierarchy.with_repository(site);
        }

        hierarchy.with_ad_caching(config.read_bool(AD_CACHING_KEY).unwrap_or(false))
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        let position = match repository.tier {
            Tier::Site => self.repositories.len(),
            _ => self
                .repositories
                .iter()
                .position(|existing| existing.tier == Tier::Site)
                .unwrap_or(self.repositories.len()),
        };
        self.repositories.insert(position, repository);
        self
    }

    pub fn with_ad_caching(mut self, enabled: bool) -> Self {
        self.ad_caching = enabled;
        self
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    pub fn ad_caching(&self) -> bool {
        self.ad_caching
    }

    pub fn accession_dir(&self, accession: &Accession) -> Utf8PathBuf {
        self.fs.join(&self.working_dir, accession.as_str())
    }

    fn ad_path(&self, accession: &Accession, file_name: &str) -> Utf8PathBuf {
        self.fs.join(&self.accession_dir(accession), file_name)
    }

    pub fn find_local(
        &self,
        accession: &Accession,
        object_type: &ObjectType,
    ) -> Result<LocalHit, LocationError> {
        let (Some(app), Some(file_name)) = (object_type.app(), object_type.file_name(accession))
        else {
            return Err(LocationError::NotFound);
        };

        let ad = self.ad_path(accession, &file_name);
        if self.fs.exists(&ad) {
            debug!(%accession, path = %ad, "found in accession directory");
            return Ok(LocalHit {
                path: VirtualPath::Local(ad),
                tier: Tier::AccessionDirectory,
            });
        }

        for repository in &self.repositories {
            for candidate in repository.candidate_paths(self.fs.as_ref(), app, &file_name) {
                if self.fs.exists(&candidate) {
                    debug!(%accession, path = %candidate, tier = %repository.tier, "found in repository");
                    return Ok(LocalHit {
                        path: VirtualPath::Local(candidate),
                        tier: repository.tier,
                    });
                }
            }
        }

        Err(LocationError::NotFound)
    }

    pub fn resolve_local(
        &self,
        accession: &Accession,
        object_type: &ObjectType,
    ) -> Result<VirtualPath, LocationError> {
        self.find_local(accession, object_type).map(|hit| hit.path)
    }

    pub fn resolve_cache_target(
        &self,
        accession: &Accession,
        object_type: &ObjectType,
    ) -> Result<VirtualPath, LocationError> {
        let (Some(app), Some(file_name)) = (object_type.app(), object_type.file_name(accession))
        else {
            return Err(LocationError::NotFound);
        };

        if self.ad_caching {
            return Ok(VirtualPath::Local(self.ad_path(accession, &file_name)));
        }

        self.repositories
            .iter()
            .filter(|repository| repository.cache_enabled)
            .find_map(|repository| {
                repository
                    .candidate_paths(self.fs.as_ref(), app, &file_name)
                    .into_iter()
                    .next()
            })
            .map(VirtualPath::Local)
            .ok_or(LocationError::NoCacheRoot)
    }
}

fn read_volumes(config: &ConfigStore, prefix: &str, mut repository: Repository) -> Repository {
    for app in APPS {
        let key = format!(
            "{prefix}/apps/{}/volumes/{}",
            app.as_str(),
            app.flat_volume_key()
        );
        if let Some(value) = config.read(&key) {
            for volume in value.split(':').map(str::trim).filter(|v| !v.is_empty()) {
                repository = repository.with_volume(app, volume);
            }
        }
    }
    repository
}
