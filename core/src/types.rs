use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sport slik FIT-feltet `session.sport` rapporterer den.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Cycling,
    Running,
    Walking,
    Swimming,
    Other(String),
}

impl Sport {
    /// Fra profilnavnet fitparser gir (`"cycling"`, `"running"`, ...).
    pub fn from_fit_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cycling" => Sport::Cycling,
            "running" => Sport::Running,
            "walking" => Sport::Walking,
            "swimming" => Sport::Swimming,
            other => Sport::Other(other.to_string()),
        }
    }

    /// Fra det rå FIT-enumtallet, når dekoderen ikke har konvertert det.
    pub fn from_fit_enum(value: u8) -> Self {
        match value {
            1 => Sport::Running,
            2 => Sport::Cycling,
            5 => Sport::Swimming,
            11 => Sport::Walking,
            0 => Sport::Other("generic".to_string()),
            n => Sport::Other(format!("sport_{n}")),
        }
    }
}

impl Default for Sport {
    fn default() -> Self {
        Sport::Other("generic".to_string())
    }
}

/// Én `record`-melding: en sensormåling ved et tidspunkt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub latitude: Option<i32>,   // semicircles
    #[serde(default)]
    pub longitude: Option<i32>,  // semicircles
    #[serde(default)]
    pub altitude: Option<f64>,   // meter
    #[serde(default)]
    pub heart_rate: Option<u8>,  // bpm
    #[serde(default)]
    pub cadence: Option<u8>,     // rpm
    #[serde(default)]
    pub power: Option<u16>,      // watt
    #[serde(default)]
    pub speed: Option<f64>,      // m/s
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            latitude: None,
            longitude: None,
            altitude: None,
            heart_rate: None,
            cadence: None,
            power: None,
            speed: None,
        }
    }

    pub fn with_position(mut self, latitude: i32, longitude: i32) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_heart_rate(mut self, bpm: u8) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub fn with_cadence(mut self, rpm: u8) -> Self {
        self.cadence = Some(rpm);
        self
    }

    pub fn with_power(mut self, watts: u16) -> Self {
        self.power = Some(watts);
        self
    }

    pub fn with_speed(mut self, meters_per_second: f64) -> Self {
        self.speed = Some(meters_per_second);
        self
    }
}

/// Én `session`-melding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub sport: Sport,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_distance: f64, // meter
    pub total_calories: f64, // kcal
}

impl SessionHeader {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Alt mapperen trenger fra én dekodet fil.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedActivity {
    pub sessions: Vec<SessionHeader>,
    pub readings: Vec<Reading>,
}
