use std::collections::HashSet;

use crate::domain::{Accession, ObjectType, probe_types};
use crate::error::KiraError;
use crate::names::NamesClient;
use crate::resolver::Resolver;
use crate::response::LocationResponse;

pub const BATCH_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionMode {
    pub prefer_local: bool,
    pub allow_remote: bool,
}

impl Default for ResolutionMode {
    fn default() -> Self {
        Self {
            prefer_local: false,
            allow_remote: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRequest {
    ids: Vec<Accession>,
    mode: ResolutionMode,
    format: String,
}

impl Default for ServiceRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRequest {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            mode: ResolutionMode::default(),
            format: "all".to_string(),
        }
    }

    pub fn add_id(&mut self, id: &str) -> Result<(), KiraError> {
        let accession = id.parse::<Accession>()?;
        self.ids.push(accession);
        Ok(())
    }

    pub fn set_resolution_mode(&mut self, prefer_local: bool, allow_remote: bool) {
        self.mode = ResolutionMode {
            prefer_local,
            allow_remote,
        };
    }

    pub fn set_format(&mut self, hint: &str) {
        self.format = hint.trim().to_string();
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn object_types(&self) -> Vec<ObjectType> {
        probe_types(&self.format)
    }

    pub fn ids(&self) -> &[Accession] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn unique_ids(&self) -> Vec<Accession> {
        let mut seen = HashSet::with_capacity(self.ids.len());
        self.ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    pub fn batches(&self) -> Vec<Vec<Accession>> {
        self.unique_ids()
            .chunks(BATCH_SIZE)
            .map(<[Accession]>::to_vec)
            .collect()
    }

    pub fn execute<N: NamesClient>(
        &self,
        resolver: &Resolver<N>,
    ) -> Result<LocationResponse, KiraError> {
        resolver.execute(self)
    }
}
