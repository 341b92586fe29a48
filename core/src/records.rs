//! Postskjemaet for helselageret.
//!
//! Dette er de typede postene som gis til et [`crate::store::HealthStore`] i én
//! batch. Hver post dekker øktintervallet og har samme [`Metadata`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::Sport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMethod {
    ActivelyRecorded,
    AutomaticallyRecorded,
    ManualEntry,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub data_origin: String,
    pub recording_method: RecordingMethod,
}

impl Metadata {
    pub fn actively_recorded(data_origin: impl Into<String>) -> Self {
        Self {
            data_origin: data_origin.into(),
            recording_method: RecordingMethod::ActivelyRecorded,
        }
    }
}

pub const DEFAULT_DATA_ORIGIN: &str = "fitbridge";

/// Metadata på hver post med mindre mapperen får egen.
pub static METADATA: Lazy<Metadata> = Lazy::new(|| Metadata::actively_recorded(DEFAULT_DATA_ORIGIN));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Biking,
    OtherWorkout,
}

impl From<&Sport> for ExerciseType {
    fn from(sport: &Sport) -> Self {
        match sport {
            Sport::Cycling => ExerciseType::Biking,
            _ => ExerciseType::OtherWorkout,
        }
    }
}

/// Rutepunkt, allerede i grader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>, // meter
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRoute {
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSessionRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exercise_type: ExerciseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<ExerciseRoute>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub distance_m: f64,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalCaloriesRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub energy_kcal: f64,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub time: DateTime<Utc>,
    pub beats_per_minute: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceSample {
    pub time: DateTime<Utc>,
    pub revolutions_per_minute: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub time: DateTime<Utc>,
    pub watts: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub time: DateTime<Utc>,
    pub meters_per_second: f64,
}

/// Tidsstempel, felles for alle måletypene i seriene.
pub trait Timed {
    fn time(&self) -> DateTime<Utc>;
}

macro_rules! impl_timed {
    ($($t:ty),*) => {
        $(impl Timed for $t {
            fn time(&self) -> DateTime<Utc> {
                self.time
            }
        })*
    };
}

impl_timed!(HeartRateSample, CadenceSample, PowerSample, SpeedSample, Location);

/// En post med en tidsserie av målinger over øktintervallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord<S> {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub samples: Vec<S>,
    pub metadata: Metadata,
}

pub type HeartRateRecord = SeriesRecord<HeartRateSample>;
pub type CadenceRecord = SeriesRecord<CadenceSample>;
pub type PowerRecord = SeriesRecord<PowerSample>;
pub type SpeedRecord = SeriesRecord<SpeedSample>;

/// Ett element i en lagerbatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    ExerciseSession(ExerciseSessionRecord),
    Distance(DistanceRecord),
    TotalCalories(TotalCaloriesRecord),
    HeartRate(HeartRateRecord),
    Speed(SpeedRecord),
    Power(PowerRecord),
    Cadence(CadenceRecord),
}

impl Record {
    pub fn permission(&self) -> Permission {
        match self {
            Record::ExerciseSession(_) => Permission::WriteExerciseSession,
            Record::Distance(_) => Permission::WriteDistance,
            Record::TotalCalories(_) => Permission::WriteTotalCalories,
            Record::HeartRate(_) => Permission::WriteHeartRate,
            Record::Speed(_) => Permission::WriteSpeed,
            Record::Power(_) => Permission::WritePower,
            Record::Cadence(_) => Permission::WriteCadence,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Record::ExerciseSession(r) => r.start,
            Record::Distance(r) => r.start,
            Record::TotalCalories(r) => r.start,
            Record::HeartRate(r) => r.start,
            Record::Speed(r) => r.start,
            Record::Power(r) => r.start,
            Record::Cadence(r) => r.start,
        }
    }
}

/// Hele resultatet av én mappet fil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub session: ExerciseSessionRecord,
    pub distance: DistanceRecord,
    pub calories: TotalCaloriesRecord,
    pub heart_rate: Option<HeartRateRecord>,
    pub power: Option<PowerRecord>,
    pub speed: Option<SpeedRecord>,
    pub cadence: Option<CadenceRecord>,
}

impl RecordSet {
    /// Flater ut settet til en innsettingsbatch: økt, distanse, kalorier,
    /// deretter puls, fart, effekt og kadens når de finnes.
    pub fn records(&self) -> Vec<Record> {
        let mut out = vec![
            Record::ExerciseSession(self.session.clone()),
            Record::Distance(self.distance.clone()),
            Record::TotalCalories(self.calories.clone()),
        ];
        out.extend(self.heart_rate.clone().map(Record::HeartRate));
        out.extend(self.speed.clone().map(Record::Speed));
        out.extend(self.power.clone().map(Record::Power));
        out.extend(self.cadence.clone().map(Record::Cadence));
        out
    }

    pub fn route_len(&self) -> usize {
        self.session.route.as_ref().map_or(0, |r| r.locations.len())
    }

    /// Antall målinger per serie, med serienavn som nøkkel.
    pub fn sample_counts(&self) -> [(&'static str, usize); 5] {
        [
            ("route", self.route_len()),
            ("heart_rate", self.heart_rate.as_ref().map_or(0, |r| r.samples.len())),
            ("speed", self.speed.as_ref().map_or(0, |r| r.samples.len())),
            ("power", self.power.as_ref().map_or(0, |r| r.samples.len())),
            ("cadence", self.cadence.as_ref().map_or(0, |r| r.samples.len())),
        ]
    }
}

/// Skrivetillatelser lageret må gi før en batch kan settes inn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    WriteExerciseSession,
    WriteExerciseRoute,
    WriteHeartRate,
    WriteSpeed,
    WriteDistance,
    WriteCadence,
    WriteTotalCalories,
    WritePower,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::WriteExerciseSession => "write_exercise_session",
            Permission::WriteExerciseRoute => "write_exercise_route",
            Permission::WriteHeartRate => "write_heart_rate",
            Permission::WriteSpeed => "write_speed",
            Permission::WriteDistance => "write_distance",
            Permission::WriteCadence => "write_cadence",
            Permission::WriteTotalCalories => "write_total_calories",
            Permission::WritePower => "write_power",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static REQUIRED_PERMISSIONS: Lazy<BTreeSet<Permission>> = Lazy::new(|| {
    [
        Permission::WriteExerciseSession,
        Permission::WriteHeartRate,
        Permission::WriteSpeed,
        Permission::WriteDistance,
        Permission::WriteCadence,
        Permission::WriteTotalCalories,
        Permission::WritePower,
        Permission::WriteExerciseRoute,
    ]
    .into_iter()
    .collect()
});

/// Påkrevde tillatelser som mangler i `granted`.
pub fn missing_permissions(granted: &BTreeSet<Permission>) -> BTreeSet<Permission> {
    REQUIRED_PERMISSIONS.difference(granted).copied().collect()
}

pub fn format_permissions(set: &BTreeSet<Permission>) -> String {
    set.iter().map(Permission::as_str).collect::<Vec<_>>().join(", ")
}
