//! fitbridge core: dekoder en `.fit`-aktivitetsfil og mapper den ene
//! økten til postene et helselager tar imot.
//!
//! bytes → [`decoder`] → [`mapper`] → [`records::RecordSet`] → [`store::HealthStore`]

pub mod app;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mapper;
pub mod preview;
pub mod records;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod units;

#[cfg(feature = "python")]
mod py;

pub use app::{App, AppState, Event, Importer, LoadedFile, Notice, NoticeLevel};
pub use config::{load_config, save_config, Config, StoreConfig};
pub use decoder::{decode, decode_file};
pub use error::{ConfigError, DecodeError, ImportError, MappingError, StoreError};
pub use mapper::{map, SessionMapper};
pub use preview::Preview;
pub use records::{
    Metadata, Permission, Record, RecordSet, METADATA, REQUIRED_PERMISSIONS,
};
pub use store::{Availability, HealthStore, HttpStore, InsertReceipt, JsonDirStore, MemoryStore};
pub use types::{DecodedActivity, Reading, SessionHeader, Sport};

/// Dekoder FIT-bytes og mapper dem med standard metadata.
pub fn records_from_bytes(bytes: &[u8]) -> Result<RecordSet, ImportError> {
    let activity = decode(bytes)?;
    Ok(SessionMapper::default().map_activity(&activity)?)
}
