use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ConfigStore, REMOTE_DISABLED_KEY, RESOLVER_CGI_KEY};
use crate::domain::{Accession, ObjectType};
use crate::error::KiraError;
use crate::path::VirtualPath;

pub const DEFAULT_ENDPOINT: &str = "https://locate.ncbi.nlm.nih.gov/sdl/2/retrieve";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamesQuery {
    pub accessions: Vec<Accession>,
    pub format: String,
    pub ad_caching: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    pub link: VirtualPath,
    pub service: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub name: String,
    pub object_type: ObjectType,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub locations: Vec<RemoteLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFailure {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub accession: Accession,
    pub result: Result<Vec<RemoteFile>, RemoteFailure>,
}

impl RemoteRecord {
    pub fn found(accession: Accession, files: Vec<RemoteFile>) -> Self {
        Self {
            accession,
            result: Ok(files),
        }
    }

    pub fn failed(accession: Accession, status: u16, message: impl Into<String>) -> Self {
        Self {
            accession,
            result: Err(RemoteFailure {
                status,
                message: message.into(),
            }),
        }
    }
}

pub trait NamesClient: Send + Sync {
    // Err means the whole batch went unanswered; unknown accessions are failed records.
    fn resolve_batch(&self, query: &NamesQuery) -> Result<Vec<RemoteRecord>, KiraError>;
}

impl<T: NamesClient + ?Sized> NamesClient for &T {
    fn resolve_batch(&self, query: &NamesQuery) -> Result<Vec<RemoteRecord>, KiraError> {
        (**self).resolve_batch(query)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNamesClient;

impl NamesClient for OfflineNamesClient {
    fn resolve_batch(&self, _query: &NamesQuery) -> Result<Vec<RemoteRecord>, KiraError> {
        Err(KiraError::TransportUnavailable(
            "remote repository disabled".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct NamesHttpClient {
    client: Client,
    endpoint: String,
}

impl NamesHttpClient {
    pub fn new(endpoint: &str) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-resolver/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::NamesHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| KiraError::NamesHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &ConfigStore) -> Result<Option<Self>, KiraError> {
        if config.read_bool(REMOTE_DISABLED_KEY).unwrap_or(false) {
            return Ok(None);
        }
        let endpoint = config
            .read(RESOLVER_CGI_KEY)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT);
        Self::new(endpoint).map(Some)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, KiraError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    if is_retryable_error(&err) {
                        return Err(KiraError::TransportUnavailable(err.to_string()));
                    }
                    return Err(KiraError::NamesHttp(err.to_string()));
                }
            }
        }
    }
}

impl NamesClient for NamesHttpClient {
    fn resolve_batch(&self, query: &NamesQuery) -> Result<Vec<RemoteRecord>, KiraError> {
        let form = query_form(query);
        debug!(
            endpoint = %self.endpoint,
            accessions = query.accessions.len(),
            "names.request"
        );
        let start = std::time::Instant::now();
        let response = self.send_with_retries(|| self.client.post(&self.endpoint).form(&form))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "names request failed".to_string());
            return Err(KiraError::NamesStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| KiraError::NamesHttp(err.to_string()))?;
        debug!(latency_ms = start.elapsed().as_millis() as u64, "names.response");
        parse_response(&body)
    }
}

pub fn query_form(query: &NamesQuery) -> Vec<(&'static str, String)> {
    let mut form: Vec<(&'static str, String)> = query
        .accessions
        .iter()
        .map(|acc| ("acc", acc.as_str().to_string()))
        .collect();
    form.push(("version", "2".to_string()));
    form.push(("accept-proto", "https".to_string()));
    let format = query.format.trim();
    if !format.is_empty() && !format.eq_ignore_ascii_case("all") {
        form.push(("filetype", format.to_string()));
    }
    if query.ad_caching {
        form.push(("ad-caching", "true".to_string()));
    }
    form
}

#[derive(Debug, Deserialize)]
struct NamesResponse {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Vec<NamesBundle>,
}

#[derive(Debug, Deserialize)]
struct NamesBundle {
    bundle: String,
    status: u16,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    files: Vec<NamesFile>,
}

#[derive(Debug, Deserialize)]
struct NamesFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    file_type: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default, rename = "modificationDate")]
    modification_date: Option<String>,
    #[serde(default)]
    locations: Vec<NamesLocation>,
}

#[derive(Debug, Deserialize)]
struct NamesLocation {
    link: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

pub fn parse_response(body: &str) -> Result<Vec<RemoteRecord>, KiraError> {
    let response: NamesResponse =
        serde_json::from_str(body).map_err(|err| KiraError::NamesParse(err.to_string()))?;

    if response.result.is_empty() {
        if let Some(status) = response.status.filter(|status| *status != 200) {
            return Err(KiraError::NamesStatus {
                status,
                message: response
                    .message
                    .unwrap_or_else(|| "names service error".to_string()),
            });
        }
    }

    let mut records = Vec::with_capacity(response.result.len());
    for bundle in response.result {
        let accession = match bundle.bundle.parse::<Accession>() {
            Ok(accession) => accession,
            Err(_) => {
                warn!(bundle = %bundle.bundle, "skipping malformed bundle accession");
                continue;
            }
        };
        if bundle.status != 200 {
            let message = bundle.msg.unwrap_or_else(|| "no data".to_string());
            records.push(RemoteRecord::failed(accession, bundle.status, message));
            continue;
        }
        let files = bundle
            .files
            .into_iter()
            .filter_map(|file| convert_file(&accession, file))
            .collect();
        records.push(RemoteRecord::found(accession, files));
    }
    Ok(records)
}

fn convert_file(accession: &Accession, file: NamesFile) -> Option<RemoteFile> {
    let object_type = file.file_type.parse::<ObjectType>().ok()?;
    let locations = file
        .locations
        .into_iter()
        .filter_map(|location| match VirtualPath::remote(&location.link) {
            Ok(link) => Some(RemoteLocation {
                link,
                service: location.service,
                region: location.region,
            }),
            Err(err) => {
                warn!(link = %location.link, %err, "skipping unusable location");
                None
            }
        })
        .collect();
    let modified = file
        .modification_date
        .as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc));

    Some(RemoteFile {
        name: file
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| accession.as_str().to_string()),
        object_type,
        size: file.size,
        md5: file.md5,
        modified,
        locations,
    })
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
