use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::records::{ExerciseType, RecordSet, SeriesRecord};
use crate::units::mps_to_kmh;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub average: f64,
}

/// Oppsummering som vises før brukeren bekrefter skrivingen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_min: i64,
    pub sport: &'static str,
    pub gps_points: usize,
    pub distance_km: f64,
    pub calories_kcal: f64,
    pub heart_rate: Option<SeriesSummary>,
    pub speed_kmh: Option<SeriesSummary>,
    pub power_w: Option<SeriesSummary>,
    pub cadence_rpm: Option<SeriesSummary>,
}

impl Preview {
    pub fn from_records(records: &RecordSet) -> Self {
        let session = &records.session;
        Self {
            start: session.start,
            end: session.end,
            duration_min: (session.end - session.start).num_minutes(),
            sport: sport_label(session.exercise_type),
            gps_points: records.route_len(),
            distance_km: records.distance.distance_m / 1000.0,
            calories_kcal: records.calories.energy_kcal,
            heart_rate: summarize(records.heart_rate.as_ref(), |s| s.beats_per_minute as f64),
            speed_kmh: summarize(records.speed.as_ref(), |s| mps_to_kmh(s.meters_per_second)),
            power_w: summarize(records.power.as_ref(), |s| s.watts),
            cadence_rpm: summarize(records.cadence.as_ref(), |s| s.revolutions_per_minute),
        }
    }
}

pub fn sport_label(exercise_type: ExerciseType) -> &'static str {
    match exercise_type {
        ExerciseType::Biking => "🚲",
        ExerciseType::OtherWorkout => "Other",
    }
}

/// Aritmetisk snitt, `None` for tom input.
pub fn average(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0f64;
    let mut cnt = 0usize;
    for v in values {
        sum += v;
        cnt += 1;
    }
    if cnt == 0 { None } else { Some(sum / cnt as f64) }
}

fn summarize<S>(record: Option<&SeriesRecord<S>>, value: impl Fn(&S) -> f64) -> Option<SeriesSummary> {
    let record = record?;
    let avg = average(record.samples.iter().map(value))?;
    Some(SeriesSummary {
        samples: record.samples.len(),
        average: avg,
    })
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Exercise session ---")?;
        writeln!(f, "Duration: {} minutes", self.duration_min)?;
        writeln!(f, "Start time: {}", self.start.to_rfc3339())?;
        writeln!(f, "End time: {}", self.end.to_rfc3339())?;
        writeln!(f, "Sport: {}", self.sport)?;
        if self.gps_points > 0 {
            writeln!(f, "GPS datapoints: {} records", self.gps_points)?;
        }
        writeln!(f, "Distance: {:.2} km", self.distance_km)?;
        writeln!(f, "Calories: {:.0} Cal", self.calories_kcal)?;

        let series = [
            ("Heart rate", "bpm", &self.heart_rate),
            ("Speed", "km/h", &self.speed_kmh),
            ("Power", "W", &self.power_w),
            ("Cadence", "rpm", &self.cadence_rpm),
        ];
        for (title, unit, summary) in series {
            if let Some(s) = summary {
                writeln!(f, "--- {title} ---")?;
                writeln!(f, "Recorded datapoints: {} datapoints", s.samples)?;
                writeln!(f, "Average {}: {:.1} {unit}", title.to_lowercase(), s.average)?;
            }
        }
        Ok(())
    }
}
