use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::domain::{Accession, ObjectType};
use crate::error::{KiraError, LocationError};
use crate::names::{NamesClient, NamesQuery, RemoteFailure, RemoteFile};
use crate::repository::{LocalHit, RepositoryHierarchy};
use crate::response::{
    LocationResponse, ObjectEntry, RemoteStatus, ResponseBuilder, ResponseEntry,
};
use crate::service::{BATCH_SIZE, ServiceRequest};

#[derive(Debug)]
struct LocalProbe {
    accession: Accession,
    results: Vec<(ObjectType, Result<LocalHit, LocationError>)>,
}

impl LocalProbe {
    // Satisfied when the primary (first) requested type is local.
    fn satisfied(&self) -> bool {
        self.results
            .first()
            .map(|(_, result)| result.is_ok())
            .unwrap_or(false)
    }

    fn cached(&self, object_type: &ObjectType) -> Option<&Result<LocalHit, LocationError>> {
        self.results
            .iter()
            .find(|(probed, _)| probed == object_type)
            .map(|(_, result)| result)
    }
}

#[derive(Debug)]
enum RemoteAnswer {
    Files(Vec<RemoteFile>),
    Failed(RemoteFailure),
    Unavailable(String),
}

#[derive(Clone)]
pub struct Resolver<N: NamesClient> {
    hierarchy: RepositoryHierarchy,
    names: N,
}

impl<N: NamesClient> Resolver<N> {
    pub fn new(hierarchy: RepositoryHierarchy, names: N) -> Self {
        Self { hierarchy, names }
    }

    pub fn hierarchy(&self) -> &RepositoryHierarchy {
        &self.hierarchy
    }

    pub fn names(&self) -> &N {
        &self.names
    }

    pub fn execute(&self, request: &ServiceRequest) -> Result<LocationResponse, KiraError> {
        if request.is_empty() {
            return Err(KiraError::InvalidArgument(
                "request has no accessions".to_string(),
            ));
        }
        let mode = request.mode();
        if !mode.prefer_local && !mode.allow_remote {
            return Err(KiraError::InvalidConfiguration(
                "neither local nor remote resolution is allowed".to_string(),
            ));
        }

        let types = request.object_types();
        let ids = request.unique_ids();
        info!(
            accessions = ids.len(),
            format = request.format(),
            prefer_local = mode.prefer_local,
            allow_remote = mode.allow_remote,
            "resolve.start"
        );

        let probes: Vec<LocalProbe> = ids
            .par_iter()
            .map(|accession| self.probe_local(accession, &types))
            .collect();

        let remote_ids: Vec<Accession> = probes
            .iter()
            .filter(|probe| mode.allow_remote && !(mode.prefer_local && probe.satisfied()))
            .map(|probe| probe.accession.clone())
            .collect();
        let mut answers = self.query_remote(&remote_ids, request.format());

        let mut builder = ResponseBuilder::new(request.format(), probes.len());
        for probe in probes {
            let answer = answers.remove(&probe.accession);
            builder.push(self.assemble(probe, answer));
        }
        let response = builder.build();
        info!(
            accessions = response.len(),
            remote = remote_ids.len(),
            "resolve.done"
        );
        Ok(response)
    }

    fn probe_local(&self, accession: &Accession, types: &[ObjectType]) -> LocalProbe {
        let results = types
            .iter()
            .map(|object_type| {
                (
                    object_type.clone(),
                    self.hierarchy.find_local(accession, object_type),
                )
            })
            .collect();
        LocalProbe {
            accession: accession.clone(),
            results,
        }
    }

    fn query_remote(&self, ids: &[Accession], format: &str) -> HashMap<Accession, RemoteAnswer> {
        let batches: Vec<&[Accession]> = ids.chunks(BATCH_SIZE).collect();
        let replies: Vec<_> = batches
            .par_iter()
            .map(|batch| {
                let query = NamesQuery {
                    accessions: batch.to_vec(),
                    format: format.to_string(),
                    ad_caching: self.hierarchy.ad_caching(),
                };
                debug!(accessions = batch.len(), "names batch dispatched");
                (*batch, self.names.resolve_batch(&query))
            })
            .collect();

        let mut answers = HashMap::with_capacity(ids.len());
        for (batch, reply) in replies {
            match reply {
                Ok(records) => {
                    let mut by_accession: HashMap<_, _> = records
                        .into_iter()
                        .map(|record| (record.accession, record.result))
                        .collect();
                    for accession in batch {
                        let answer = match by_accession.remove(accession) {
                            Some(Ok(files)) => RemoteAnswer::Files(files),
                            Some(Err(failure)) => RemoteAnswer::Failed(failure),
                            None => RemoteAnswer::Failed(RemoteFailure {
                                status: 404,
                                message: "no record returned".to_string(),
                            }),
                        };
                        answers.insert(accession.clone(), answer);
                    }
                    if !by_accession.is_empty() {
                        debug!(extra = by_accession.len(), "ignoring records outside the batch");
                    }
                }
                Err(err) if err.is_transport() => {
                    warn!(
                        %err,
                        accessions = batch.len(),
                        "names service unavailable, keeping local results"
                    );
                    for accession in batch {
                        answers.insert(
                            accession.clone(),
                            RemoteAnswer::Unavailable(err.to_string()),
                        );
                    }
                }
                Err(err) => {
                    error!(%err, accessions = batch.len(), "names client rejected batch");
                    for accession in batch {
                        answers.insert(
                            accession.clone(),
                            RemoteAnswer::Failed(RemoteFailure {
                                status: 500,
                                message: err.to_string(),
                            }),
                        );
                    }
                }
            }
        }
        answers
    }

    fn assemble(&self, probe: LocalProbe, answer: Option<RemoteAnswer>) -> ResponseEntry {
        let accession = probe.accession.clone();
        let mut objects: Vec<ObjectEntry> = probe
            .results
            .iter()
            .filter_map(|(object_type, result)| {
                let hit = result.as_ref().ok()?;
                Some(ObjectEntry {
                    name: accession.to_string(),
                    object_type: object_type.clone(),
                    tier: Some(hit.tier),
                    local: Ok(hit.path.clone()),
                    cache: self.hierarchy.resolve_cache_target(&accession, object_type),
                    remote: Vec::new(),
                    size: None,
                    md5: None,
                })
            })
            .collect();

        let remote = match answer {
            None => {
                self.add_cache_targets(&probe, &mut objects);
                RemoteStatus::NotQueried
            }
            Some(RemoteAnswer::Failed(failure)) => {
                debug!(%accession, status = failure.status, "names service has no record");
                RemoteStatus::Failed(failure)
            }
            Some(RemoteAnswer::Unavailable(message)) => {
                self.add_cache_targets(&probe, &mut objects);
                RemoteStatus::Unavailable(message)
            }
            Some(RemoteAnswer::Files(files)) => {
                for file in files {
                    self.merge_remote_file(&probe, &mut objects, file);
                }
                RemoteStatus::Resolved
            }
        };

        ResponseEntry {
            accession,
            objects,
            remote,
        }
    }

    // Local misses still get a cache target when nothing remote replaced them.
    fn add_cache_targets(&self, probe: &LocalProbe, objects: &mut Vec<ObjectEntry>) {
        for (object_type, result) in &probe.results {
            if result.is_ok() || objects.iter().any(|object| &object.object_type == object_type) {
                continue;
            }
            objects.push(ObjectEntry {
                name: probe.accession.to_string(),
                object_type: object_type.clone(),
                tier: None,
                local: Err(LocationError::NotFound),
                cache: self
                    .hierarchy
                    .resolve_cache_target(&probe.accession, object_type),
                remote: Vec::new(),
                size: None,
                md5: None,
            });
        }
    }

    fn merge_remote_file(
        &self,
        probe: &LocalProbe,
        objects: &mut Vec<ObjectEntry>,
        file: RemoteFile,
    ) {
        if let Some(existing) = objects
            .iter_mut()
            .find(|object| object.name == file.name && object.object_type == file.object_type)
        {
            existing.remote = file.locations;
            existing.size = file.size;
            existing.md5 = file.md5;
            return;
        }

        let accession = &probe.accession;
        let local = match probe.cached(&file.object_type) {
            Some(result) => result.clone(),
            None => self.hierarchy.find_local(accession, &file.object_type),
        };
        objects.push(ObjectEntry {
            name: file.name,
            tier: local.as_ref().ok().map(|hit| hit.tier),
            local: local.map(|hit| hit.path),
            cache: self
                .hierarchy
                .resolve_cache_target(accession, &file.object_type),
            object_type: file.object_type,
            remote: file.locations,
            size: file.size,
            md5: file.md5,
        });
    }
}
