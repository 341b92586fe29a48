//! Helselagre.
//!
//! Et [`HealthStore`] tar imot én batch med [`Record`]er per importert fil.
//! Alle implementasjoner avviser batchen med mindre alle
//! [`REQUIRED_PERMISSIONS`] er gitt.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use ureq::Agent;

use crate::error::StoreError;
use crate::records::{missing_permissions, Permission, Record, REQUIRED_PERMISSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    UpdateRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReceipt {
    pub inserted: usize,
    #[serde(default)]
    pub location: Option<String>,
}

pub trait HealthStore {
    fn availability(&self) -> Availability;
    fn granted_permissions(&self) -> Result<BTreeSet<Permission>, StoreError>;
    fn request_permissions(
        &mut self,
        wanted: &BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, StoreError>;
    fn insert_records(&mut self, records: &[Record]) -> Result<InsertReceipt, StoreError>;
}

impl<T: HealthStore + ?Sized> HealthStore for Box<T> {
    fn availability(&self) -> Availability {
        (**self).availability()
    }

    fn granted_permissions(&self) -> Result<BTreeSet<Permission>, StoreError> {
        (**self).granted_permissions()
    }

    fn request_permissions(
        &mut self,
        wanted: &BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, StoreError> {
        (**self).request_permissions(wanted)
    }

    fn insert_records(&mut self, records: &[Record]) -> Result<InsertReceipt, StoreError> {
        (**self).insert_records(records)
    }
}

pub fn ensure_permissions(granted: &BTreeSet<Permission>) -> Result<(), StoreError> {
    let missing = missing_permissions(granted);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::PermissionDenied { missing })
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// I minnet
// ──────────────────────────────────────────────────────────────────────────────

/// Holder batcher i minnet. Brukes til tørrkjøring og tester.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    availability: Availability,
    granted: BTreeSet<Permission>,
    grant_on_request: bool,
    batches: Vec<Vec<Record>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            availability: Availability::Available,
            granted: BTreeSet::new(),
            grant_on_request: true,
            batches: Vec::new(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tilgjengelig, med alle påkrevde tillatelser allerede gitt.
    pub fn permissive() -> Self {
        Self::default().with_granted(REQUIRED_PERMISSIONS.clone())
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_granted(mut self, granted: BTreeSet<Permission>) -> Self {
        self.granted = granted;
        self
    }

    /// Forespørsler besvares, men utvider aldri de gitte tillatelsene.
    pub fn denying_requests(mut self) -> Self {
        self.grant_on_request = false;
        self
    }

    pub fn set_availability(&mut self, availability: Availability) {
        self.availability = availability;
    }

    pub fn revoke(&mut self, permission: Permission) {
        self.granted.remove(&permission);
    }

    pub fn batches(&self) -> &[Vec<Record>] {
        &self.batches
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        match self.availability {
            Availability::Available => Ok(()),
            other => Err(StoreError::Unavailable(format!("{other:?}"))),
        }
    }
}

impl HealthStore for MemoryStore {
    fn availability(&self) -> Availability {
        self.availability
    }

    fn granted_permissions(&self) -> Result<BTreeSet<Permission>, StoreError> {
        self.ensure_available()?;
        Ok(self.granted.clone())
    }

    fn request_permissions(
        &mut self,
        wanted: &BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, StoreError> {
        self.ensure_available()?;
        if self.grant_on_request {
            self.granted.extend(wanted.iter().copied());
        }
        Ok(self.granted.clone())
    }

    fn insert_records(&mut self, records: &[Record]) -> Result<InsertReceipt, StoreError> {
        self.ensure_available()?;
        ensure_permissions(&self.granted)?;
        self.batches.push(records.to_vec());
        Ok(InsertReceipt {
            inserted: records.len(),
            location: None,
        })
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// JSON-katalog
// ──────────────────────────────────────────────────────────────────────────────

const PERMISSIONS_FILE: &str = "permissions.json";

/// Skriver hver batch som en pen JSON-fil i en katalog.
/// Gitte tillatelser lagres ved siden av batchene.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Batch {
    records: Vec<Record>,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Leser tilbake en batch skrevet av [`HealthStore::insert_records`].
    pub fn load_batch(path: impl AsRef<Path>) -> Result<Vec<Record>, StoreError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| io_err(path, source))?;
        let batch: Batch = serde_json::from_str(&contents)?;
        Ok(batch.records)
    }

    fn permissions_path(&self) -> PathBuf {
        self.dir.join(PERMISSIONS_FILE)
    }

    fn batch_path(&self, records: &[Record]) -> PathBuf {
        let stem = match records.first() {
            Some(first) => {
                let kind = match first {
                    Record::ExerciseSession(s) => format!("{:?}", s.exercise_type).to_lowercase(),
                    _ => "records".to_string(),
                };
                format!("{}-{}", first.start().format("%Y%m%dT%H%M%SZ"), kind)
            }
            None => "empty".to_string(),
        };

        // Aldri overskriv en tidligere import av samme økt
        let mut path = self.dir.join(format!("{stem}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}-{n}.json"));
            n += 1;
        }
        path
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| io_err(&self.dir, source))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl HealthStore for JsonDirStore {
    fn availability(&self) -> Availability {
        if self.dir.exists() && !self.dir.is_dir() {
            Availability::Unavailable
        } else {
            Availability::Available
        }
    }

    fn granted_permissions(&self) -> Result<BTreeSet<Permission>, StoreError> {
        let path = self.permissions_path();
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        let contents = fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn request_permissions(
        &mut self,
        wanted: &BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, StoreError> {
        self.ensure_dir()?;
        let mut granted = self.granted_permissions()?;
        granted.extend(wanted.iter().copied());

        let path = self.permissions_path();
        let json = serde_json::to_string_pretty(&granted)?;
        fs::write(&path, json).map_err(|source| io_err(&path, source))?;
        log::info!("granted {} permissions in {}", granted.len(), self.dir.display());
        Ok(granted)
    }

    fn insert_records(&mut self, records: &[Record]) -> Result<InsertReceipt, StoreError> {
        if self.availability() != Availability::Available {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        ensure_permissions(&self.granted_permissions()?)?;
        self.ensure_dir()?;

        let path = self.batch_path(records);
        let json = serde_json::to_string_pretty(&json!({ "records": records }))?;
        fs::write(&path, json).map_err(|source| io_err(&path, source))?;
        log::info!("wrote {} records to {}", records.len(), path.display());

        Ok(InsertReceipt {
            inserted: records.len(),
            location: Some(path.display().to_string()),
        })
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// HTTP
// ──────────────────────────────────────────────────────────────────────────────

/// Blokkerende HTTP-klient mot et eksternt helselager.
///
/// Endepunkter, relativt til `base_url`:
/// - `GET  /health`: 200 når tilgjengelig, 426 når klienten må oppdateres
/// - `GET  /permissions`: JSON-liste med navn på gitte tillatelser
/// - `POST /permissions`: ber om tillatelser, svarer med de gitte
/// - `POST /records`: `{"records": [...]}`
pub struct HttpStore {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let req = self.agent.request(method, &url);
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }
}

fn map_ureq_error(e: ureq::Error) -> StoreError {
    match e {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            status_error(status, body)
        }
        ureq::Error::Transport(t) => StoreError::Unavailable(t.to_string()),
    }
}

/// Klassifiserer et svar fra lageret som ikke er 2xx.
pub fn status_error(status: u16, body: String) -> StoreError {
    match status {
        401 | 403 => StoreError::Forbidden(status),
        s if s >= 500 => StoreError::Unavailable(format!("HTTP {s}: {body}")),
        _ => StoreError::Rejected { status, body },
    }
}

fn read_json<T: serde::de::DeserializeOwned>(resp: ureq::Response) -> Result<T, StoreError> {
    resp.into_json()
        .map_err(|e| StoreError::Unavailable(format!("invalid response body: {e}")))
}

impl HealthStore for HttpStore {
    fn availability(&self) -> Availability {
        match self.request("GET", "/health").call() {
            Ok(_) => Availability::Available,
            Err(ureq::Error::Status(426, _)) => Availability::UpdateRequired,
            // Lageret svarer, men krever tilgang; tillatelsesflyten rapporterer resten
            Err(ureq::Error::Status(401 | 403, _)) => Availability::Available,
            Err(e) => {
                log::warn!("health store at {} not reachable: {}", self.base_url, e);
                Availability::Unavailable
            }
        }
    }

    fn granted_permissions(&self) -> Result<BTreeSet<Permission>, StoreError> {
        let resp = self
            .request("GET", "/permissions")
            .call()
            .map_err(map_ureq_error)?;
        read_json(resp)
    }

    fn request_permissions(
        &mut self,
        wanted: &BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, StoreError> {
        let resp = self
            .request("POST", "/permissions")
            .send_json(wanted)
            .map_err(map_ureq_error)?;
        read_json(resp)
    }

    fn insert_records(&mut self, records: &[Record]) -> Result<InsertReceipt, StoreError> {
        ensure_permissions(&self.granted_permissions()?)?;

        let url = format!("{}/records", self.base_url);
        self.request("POST", "/records")
            .send_json(json!({ "records": records }))
            .map_err(map_ureq_error)?;

        log::info!("posted {} records to {}", records.len(), url);
        Ok(InsertReceipt {
            inserted: records.len(),
            location: Some(url),
        })
    }
}
