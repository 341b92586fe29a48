//! FIT-bytes → [`DecodedActivity`].
//!
//! Selve binærformatet håndteres av `fitparser`; her plukkes bare
//! `session`- og `record`-meldingene og feltene mapperen trenger.

use std::path::Path;

use chrono::{DateTime, Utc};
use fitparser::de::from_bytes;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value as FitValue};

use crate::error::DecodeError;
use crate::types::{DecodedActivity, Reading, SessionHeader, Sport};

pub fn decode(bytes: &[u8]) -> Result<DecodedActivity, DecodeError> {
    let messages = from_bytes(bytes).map_err(|e| DecodeError::Parse(e.to_string()))?;

    let mut activity = DecodedActivity::default();
    let mut skipped = 0usize;

    for message in &messages {
        match message.kind() {
            MesgNum::Session => activity.sessions.push(session_header(message)?),
            MesgNum::Record => match reading(message) {
                Some(r) => activity.readings.push(r),
                None => skipped += 1,
            },
            _ => {}
        }
    }

    if skipped > 0 {
        log::debug!("decode: skipped {skipped} record messages without timestamp");
    }
    log::debug!(
        "decode: {} messages, {} sessions, {} readings",
        messages.len(),
        activity.sessions.len(),
        activity.readings.len()
    );
    Ok(activity)
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedActivity, DecodeError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode(&bytes)
}

fn session_header(message: &FitDataRecord) -> Result<SessionHeader, DecodeError> {
    let start = field(message, "start_time")
        .and_then(fit_value_to_utc)
        .ok_or(DecodeError::MissingField("start_time"))?;
    let end = field(message, "timestamp")
        .and_then(fit_value_to_utc)
        .ok_or(DecodeError::MissingField("timestamp"))?;

    let sport = field(message, "sport").map(fit_value_to_sport).unwrap_or_default();

    let total_distance = field(message, "total_distance")
        .and_then(fit_value_to_f64)
        .unwrap_or_else(|| {
            log::warn!("session without total_distance, using 0 m");
            0.0
        });
    let total_calories = field(message, "total_calories")
        .and_then(fit_value_to_f64)
        .unwrap_or_else(|| {
            log::warn!("session without total_calories, using 0 kcal");
            0.0
        });

    Ok(SessionHeader {
        sport,
        start,
        end,
        total_distance,
        total_calories,
    })
}

fn reading(message: &FitDataRecord) -> Option<Reading> {
    let timestamp = field(message, "timestamp").and_then(fit_value_to_utc)?;

    Some(Reading {
        timestamp,
        latitude: field(message, "position_lat").and_then(fit_value_to_i32),
        longitude: field(message, "position_long").and_then(fit_value_to_i32),
        // enhanced_* har samme størrelse med større verdiområde
        altitude: first_f64(message, &["enhanced_altitude", "altitude"]),
        heart_rate: field(message, "heart_rate").and_then(fit_value_to_u8),
        cadence: field(message, "cadence").and_then(fit_value_to_u8),
        power: field(message, "power")
            .and_then(fit_value_to_f64)
            .filter(|w| (0.0..=u16::MAX as f64).contains(w))
            .map(|w| w.round() as u16),
        speed: first_f64(message, &["enhanced_speed", "speed"]),
    })
}

fn field<'a>(message: &'a FitDataRecord, name: &str) -> Option<&'a FitValue> {
    message
        .fields()
        .iter()
        .find(|f| f.name() == name)
        .map(|f| f.value())
}

fn first_f64(message: &FitDataRecord, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .find_map(|name| field(message, name).and_then(fit_value_to_f64))
}

fn fit_value_to_utc(value: &FitValue) -> Option<DateTime<Utc>> {
    match value {
        FitValue::Timestamp(ts) => Some(ts.with_timezone(&Utc)),
        _ => None,
    }
}

fn fit_value_to_f64(value: &FitValue) -> Option<f64> {
    let v = match value {
        FitValue::Float32(v) => *v as f64,
        FitValue::Float64(v) => *v,
        FitValue::SInt8(v) => *v as f64,
        FitValue::SInt16(v) => *v as f64,
        FitValue::SInt32(v) => *v as f64,
        FitValue::SInt64(v) => *v as f64,
        FitValue::UInt8(v) => *v as f64,
        FitValue::UInt16(v) => *v as f64,
        FitValue::UInt32(v) => *v as f64,
        FitValue::UInt64(v) => *v as f64,
        FitValue::Array(values) => return values.iter().find_map(fit_value_to_f64),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn fit_value_to_i32(value: &FitValue) -> Option<i32> {
    match value {
        FitValue::SInt32(v) => Some(*v),
        other => fit_value_to_f64(other)
            .filter(|v| (i32::MIN as f64..=i32::MAX as f64).contains(v))
            .map(|v| v.round() as i32),
    }
}

fn fit_value_to_u8(value: &FitValue) -> Option<u8> {
    match value {
        FitValue::UInt8(v) => Some(*v),
        other => fit_value_to_f64(other)
            .filter(|v| (0.0..=u8::MAX as f64).contains(v))
            .map(|v| v.round() as u8),
    }
}

fn fit_value_to_sport(value: &FitValue) -> Sport {
    match value {
        FitValue::String(name) => Sport::from_fit_name(name),
        FitValue::Enum(n) | FitValue::UInt8(n) => Sport::from_fit_enum(*n),
        _ => Sport::default(),
    }
}
