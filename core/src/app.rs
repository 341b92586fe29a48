//! Importflyten som tilstandsmaskin.
//!
//! [`App`] bestemmer bare neste tilstand ut fra nåværende tilstand og en hendelse.
//! [`Importer`] lager hendelsene ved å snakke med dekoderen og et
//! [`HealthStore`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::decoder;
use crate::error::{DecodeError, ImportError};
use crate::mapper::SessionMapper;
use crate::preview::Preview;
use crate::records::{missing_permissions, Permission, RecordSet, REQUIRED_PERMISSIONS};
use crate::store::{Availability, HealthStore, InsertReceipt};
use crate::telemetry;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub records: RecordSet,
    pub preview: Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    /// Ingen brukbart helselager.
    Missing,
    Checking,
    RequiresPermission,
    AllPermissions,
    FileSelected(PathBuf),
    FileLoaded(Box<LoadedFile>),
}

#[derive(Debug)]
pub enum Event {
    StoreChecked {
        availability: Availability,
        granted: BTreeSet<Permission>,
    },
    PermissionResult(BTreeSet<Permission>),
    FilePicked(PathBuf),
    DecodeComplete(Result<RecordSet, ImportError>),
    Back,
    SendComplete(Result<InsertReceipt, ImportError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Melding til brukeren etter en overgang (snackbaren i et GUI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub const IMPORTED_MESSAGE: &str = "✅ .fit file imported in the health store";

#[derive(Debug)]
pub struct App {
    state: AppState,
    /// Fil gitt ved oppstart; åpnes så snart tillatelsene er på plass.
    shared_file: Option<PathBuf>,
}

impl App {
    pub fn new(shared_file: Option<PathBuf>) -> Self {
        Self {
            state: AppState::Checking,
            shared_file,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn handle(&mut self, event: Event) -> Option<Notice> {
        let current = std::mem::replace(&mut self.state, AppState::Checking);
        let (next, notice) = self.transition(current, event);
        self.state = next;
        notice
    }

    fn ready_state(&self) -> AppState {
        match &self.shared_file {
            Some(path) => AppState::FileSelected(path.clone()),
            None => AppState::AllPermissions,
        }
    }

    fn transition(&self, state: AppState, event: Event) -> (AppState, Option<Notice>) {
        match (state, event) {
            (AppState::Checking, Event::StoreChecked { availability, granted }) => {
                if availability != Availability::Available {
                    (AppState::Missing, None)
                } else if missing_permissions(&granted).is_empty() {
                    (self.ready_state(), None)
                } else {
                    (AppState::RequiresPermission, None)
                }
            }
            (AppState::RequiresPermission, Event::PermissionResult(granted)) => {
                if missing_permissions(&granted).is_empty() {
                    (self.ready_state(), None)
                } else {
                    (AppState::RequiresPermission, None)
                }
            }
            (AppState::AllPermissions, Event::FilePicked(path)) => {
                (AppState::FileSelected(path), None)
            }
            (AppState::FileSelected(path), Event::DecodeComplete(result)) => match result {
                Ok(records) => {
                    let preview = Preview::from_records(&records);
                    let loaded = LoadedFile {
                        path,
                        records,
                        preview,
                    };
                    (AppState::FileLoaded(Box::new(loaded)), None)
                }
                Err(e) => {
                    log::error!("failed to load {}: {}", path.display(), e);
                    (AppState::AllPermissions, Some(Notice::error(e.user_message())))
                }
            },
            (AppState::FileLoaded(_), Event::Back) => (AppState::AllPermissions, None),
            (AppState::FileLoaded(loaded), Event::SendComplete(result)) => match result {
                Ok(receipt) => {
                    log::info!("{} records sent from {}", receipt.inserted, loaded.path.display());
                    (AppState::AllPermissions, Some(Notice::info(IMPORTED_MESSAGE)))
                }
                Err(e) => {
                    log::error!("failed to submit to the health store: {e}");
                    let notice = Some(Notice::error(e.user_message()));
                    if e.is_retryable() {
                        // Postene blir liggende slik at sendingen kan prøves igjen
                        (AppState::FileLoaded(loaded), notice)
                    } else {
                        (AppState::AllPermissions, notice)
                    }
                }
            },
            (state, event) => {
                log::debug!("ignoring {event:?} in state {state:?}");
                (state, None)
            }
        }
    }
}

/// Dekoder og mapper én fil.
pub fn load_records(path: &Path, mapper: &SessionMapper) -> Result<RecordSet, ImportError> {
    let result = decoder::decode_file(path)
        .map_err(ImportError::from)
        .and_then(|activity| mapper.map_activity(&activity).map_err(ImportError::from));

    match &result {
        Ok(records) => {
            telemetry::files_decoded_total().inc();
            for (series, n) in records.sample_counts() {
                telemetry::samples_mapped_total(series).inc_by(n as u64);
            }
        }
        Err(e) => telemetry::import_failures_total(e.kind()).inc(),
    }
    result
}

/// Kjører en [`App`] mot et konkret lager.
pub struct Importer<S> {
    store: S,
    mapper: SessionMapper,
    app: App,
}

impl<S: HealthStore> Importer<S> {
    pub fn new(store: S, mapper: SessionMapper, shared_file: Option<PathBuf>) -> Self {
        Self {
            store,
            mapper,
            app: App::new(shared_file),
        }
    }

    pub fn state(&self) -> &AppState {
        self.app.state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn loaded(&self) -> Option<&LoadedFile> {
        match self.app.state() {
            AppState::FileLoaded(loaded) => Some(loaded.as_ref()),
            _ => None,
        }
    }

    pub fn check(&mut self) -> Option<Notice> {
        let availability = self.store.availability();
        let granted = if availability == Availability::Available {
            self.store.granted_permissions().unwrap_or_else(|e| {
                log::warn!("could not read granted permissions: {e}");
                BTreeSet::new()
            })
        } else {
            BTreeSet::new()
        };
        self.app.handle(Event::StoreChecked {
            availability,
            granted,
        })
    }

    pub fn request_permissions(&mut self) -> Option<Notice> {
        let granted = self
            .store
            .request_permissions(&REQUIRED_PERMISSIONS)
            .unwrap_or_else(|e| {
                log::warn!("permission request failed: {e}");
                BTreeSet::new()
            });
        self.app.handle(Event::PermissionResult(granted))
    }

    pub fn pick_file(&mut self, path: impl Into<PathBuf>) -> Option<Notice> {
        self.app.handle(Event::FilePicked(path.into()))
    }

    /// Dekoder valgt fil i en egen tråd og venter på den.
    pub fn load(&mut self) -> Option<Notice> {
        let path = match self.app.state() {
            AppState::FileSelected(path) => path.clone(),
            _ => return None,
        };

        let mapper = &self.mapper;
        let result = std::thread::scope(|s| {
            s.spawn(|| load_records(&path, mapper))
                .join()
                .unwrap_or_else(|_| {
                    Err(ImportError::DecodeFailure(DecodeError::Parse(
                        "decoder thread panicked".into(),
                    )))
                })
        });
        self.app.handle(Event::DecodeComplete(result))
    }

    pub fn back(&mut self) -> Option<Notice> {
        self.app.handle(Event::Back)
    }

    /// Sender de lastede postene. Ved midlertidige feil blir de liggende for nytt forsøk.
    pub fn send(&mut self) -> Option<Notice> {
        let batch = match self.app.state() {
            AppState::FileLoaded(loaded) => loaded.records.records(),
            _ => return None,
        };

        let result = self.store.insert_records(&batch).map_err(ImportError::from);
        match &result {
            Ok(receipt) => telemetry::records_written_total().inc_by(receipt.inserted as u64),
            Err(e) => telemetry::import_failures_total(e.kind()).inc(),
        }
        self.app.handle(Event::SendComplete(result))
    }
}
