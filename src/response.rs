use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Accession, ObjectType};
use crate::error::{KiraError, LocationError};
use crate::names::{RemoteFailure, RemoteLocation};
use crate::path::VirtualPath;
use crate::repository::Tier;

pub type LocationOutcome = Result<VirtualPath, LocationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub local: LocationOutcome,
    pub cache: LocationOutcome,
    pub remote: Vec<RemoteLocation>,
}

impl Location {
    fn failed(error: LocationError) -> Self {
        Self {
            local: Err(error),
            cache: Err(error),
            remote: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub object_type: ObjectType,
    pub tier: Option<Tier>,
    pub local: LocationOutcome,
    pub cache: LocationOutcome,
    pub remote: Vec<RemoteLocation>,
    pub size: Option<u64>,
    pub md5: Option<String>,
}

impl ObjectEntry {
    pub fn location(&self) -> Location {
        Location {
            local: self.local.clone(),
            cache: self.cache.clone(),
            remote: self.remote.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    NotQueried,
    Resolved,
    Failed(RemoteFailure),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    pub accession: Accession,
    pub objects: Vec<ObjectEntry>,
    pub remote: RemoteStatus,
}

#[derive(Debug)]
struct ResponseInner {
    format: String,
    order: Vec<Accession>,
    entries: HashMap<Accession, ResponseEntry>,
}

#[derive(Debug, Clone)]
pub struct LocationResponse {
    inner: Arc<ResponseInner>,
}

impl LocationResponse {
    // Unknown accession or name: NotFound. Known name with another type: TypeMismatch.
    pub fn get_location(
        &self,
        id: &str,
        name: &str,
        object_type: &str,
    ) -> Result<Location, KiraError> {
        if name.trim().is_empty() {
            return Err(KiraError::InvalidArgument("empty display name".to_string()));
        }
        let accession: Accession = id.parse()?;
        let object_type: ObjectType = object_type.parse()?;

        let Some(entry) = self.inner.entries.get(&accession) else {
            return Ok(Location::failed(LocationError::NotFound));
        };

        let mut named = entry
            .objects
            .iter()
            .filter(|object| object.name == name.trim())
            .peekable();
        if named.peek().is_none() {
            return Ok(Location::failed(LocationError::NotFound));
        }

        Ok(named
            .find(|object| object.object_type == object_type)
            .map(ObjectEntry::location)
            .unwrap_or_else(|| Location::failed(LocationError::TypeMismatch)))
    }

    pub fn local_path(
        &self,
        id: &str,
        name: &str,
        object_type: &str,
    ) -> Result<VirtualPath, KiraError> {
        let location = self.get_location(id, name, object_type)?;
        location.local.map_err(|err| match err {
            LocationError::TypeMismatch => KiraError::TypeMismatch {
                accession: id.trim().to_string(),
                requested: object_type.trim().to_string(),
            },
            LocationError::NotFound | LocationError::NoCacheRoot => {
                KiraError::NotFound(format!("{}/{}", id.trim(), name.trim()))
            }
        })
    }

    pub fn entry(&self, id: &Accession) -> Option<&ResponseEntry> {
        self.inner.entries.get(id)
    }

    pub fn remote_status(&self, id: &Accession) -> Option<&RemoteStatus> {
        self.entry(id).map(|entry| &entry.remote)
    }

    pub fn ids(&self) -> &[Accession] {
        &self.inner.order
    }

    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }

    pub fn format(&self) -> &str {
        &self.inner.format
    }

    pub fn summary(&self) -> ResponseSummary {
        let items = self
            .inner
            .order
            .iter()
            .filter_map(|id| self.inner.entries.get(id))
            .map(AccessionReport::from)
            .collect();
        ResponseSummary {
            format: self.inner.format.clone(),
            items,
        }
    }

    pub fn release(self) {}
}

#[derive(Debug)]
pub(crate) struct ResponseBuilder {
    format: String,
    order: Vec<Accession>,
    entries: HashMap<Accession, ResponseEntry>,
}

impl ResponseBuilder {
    pub(crate) fn new(format: &str, capacity: usize) -> Self {
        Self {
            format: format.to_string(),
            order: Vec::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, entry: ResponseEntry) {
        if !self.entries.contains_key(&entry.accession) {
            self.order.push(entry.accession.clone());
        }
        self.entries.insert(entry.accession.clone(), entry);
    }

    pub(crate) fn build(self) -> LocationResponse {
        LocationResponse {
            inner: Arc::new(ResponseInner {
                format: self.format,
                order: self.order,
                entries: self.entries,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseSummary {
    pub format: String,
    pub items: Vec<AccessionReport>,
}

impl ResponseSummary {
    pub fn retain_type(&mut self, object_type: &ObjectType) {
        let wanted = object_type.as_str();
        for item in &mut self.items {
            item.objects.retain(|object| object.object_type == wanted);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessionReport {
    pub accession: String,
    pub remote: String,
    pub remote_error: Option<String>,
    pub objects: Vec<ObjectReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectReport {
    pub name: String,
    pub object_type: String,
    pub tier: Option<Tier>,
    pub local_path: Option<String>,
    pub local_error: Option<String>,
    pub cache_path: Option<String>,
    pub cache_error: Option<String>,
    pub remote_links: Vec<String>,
    pub size: Option<u64>,
}

impl From<&ResponseEntry> for AccessionReport {
    fn from(entry: &ResponseEntry) -> Self {
        let (remote, remote_error) = match &entry.remote {
            RemoteStatus::NotQueried => ("not-queried", None),
            RemoteStatus::Resolved => ("resolved", None),
            RemoteStatus::Failed(failure) => (
                "failed",
                Some(format!("{}: {}", failure.status, failure.message)),
            ),
            RemoteStatus::Unavailable(message) => ("unavailable", Some(message.clone())),
        };
        Self {
            accession: entry.accession.to_string(),
            remote: remote.to_string(),
            remote_error,
            objects: entry.objects.iter().map(ObjectReport::from).collect(),
        }
    }
}

impl From<&ObjectEntry> for ObjectReport {
    fn from(object: &ObjectEntry) -> Self {
        Self {
            name: object.name.clone(),
            object_type: object.object_type.to_string(),
            tier: object.tier,
            local_path: object.local.as_ref().ok().map(ToString::to_string),
            local_error: object.local.as_ref().err().map(ToString::to_string),
            cache_path: object.cache.as_ref().ok().map(ToString::to_string),
            cache_error: object.cache.as_ref().err().map(ToString::to_string),
            remote_links: object
                .remote
                .iter()
                .map(|location| location.link.to_string())
                .collect(),
            size: object.size,
        }
    }
}
