//! FIT-økt → poster til helselageret.
//!
//! Ren og synkron: ingen I/O og ingen delt tilstand. Enten lages hele
//! [`RecordSet`] eller så returneres en feil.

use chrono::{DateTime, Utc};

use crate::error::MappingError;
use crate::records::{
    CadenceSample, DistanceRecord, ExerciseRoute, ExerciseSessionRecord, ExerciseType,
    HeartRateSample, Location, Metadata, PowerSample, RecordSet, SeriesRecord, SpeedSample,
    Timed, TotalCaloriesRecord, METADATA,
};
use crate::types::{DecodedActivity, Reading, SessionHeader};
use crate::units::semicircles_to_degrees;

#[derive(Debug, Clone)]
pub struct SessionMapper {
    metadata: Metadata,
}

impl Default for SessionMapper {
    fn default() -> Self {
        Self {
            metadata: METADATA.clone(),
        }
    }
}

impl SessionMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn map_activity(&self, activity: &DecodedActivity) -> Result<RecordSet, MappingError> {
        self.map(&activity.sessions, &activity.readings)
    }

    pub fn map(
        &self,
        headers: &[SessionHeader],
        readings: &[Reading],
    ) -> Result<RecordSet, MappingError> {
        // Bare filer med én sport
        let header = match headers {
            [one] => one,
            _ => return Err(MappingError::NoSingleSession { found: headers.len() }),
        };
        let (start, end) = (header.start, header.end);
        if end <= start {
            return Err(MappingError::InvalidSessionWindow { start, end });
        }

        let points = window_readings(readings, start, end);

        let mut route = Vec::with_capacity(points.len());
        let mut heart_rate = Vec::with_capacity(points.len());
        let mut cadence = Vec::with_capacity(points.len());
        let mut power = Vec::with_capacity(points.len());
        let mut speed = Vec::with_capacity(points.len());

        for p in points {
            let time = p.timestamp;
            if let (Some(lat), Some(lon)) = (p.latitude, p.longitude) {
                route.push(Location {
                    time,
                    latitude: semicircles_to_degrees(lat),
                    longitude: semicircles_to_degrees(lon),
                    altitude: p.altitude,
                });
            }
            if let Some(bpm) = p.heart_rate {
                heart_rate.push(HeartRateSample {
                    time,
                    beats_per_minute: i64::from(bpm),
                });
            }
            if let Some(rpm) = p.cadence {
                cadence.push(CadenceSample {
                    time,
                    revolutions_per_minute: f64::from(rpm),
                });
            }
            if let Some(watts) = p.power {
                power.push(PowerSample {
                    time,
                    watts: f64::from(watts),
                });
            }
            if let Some(v) = p.speed {
                speed.push(SpeedSample {
                    time,
                    meters_per_second: v,
                });
            }
        }

        let session = ExerciseSessionRecord {
            start,
            end,
            exercise_type: ExerciseType::from(&header.sport),
            route: (!route.is_empty()).then(|| ExerciseRoute { locations: route }),
            metadata: self.metadata.clone(),
        };

        Ok(RecordSet {
            session,
            distance: DistanceRecord {
                start,
                end,
                distance_m: header.total_distance,
                metadata: self.metadata.clone(),
            },
            calories: TotalCaloriesRecord {
                start,
                end,
                energy_kcal: header.total_calories,
                metadata: self.metadata.clone(),
            },
            heart_rate: self.series(start, end, heart_rate),
            power: self.series(start, end, power),
            speed: self.series(start, end, speed),
            cadence: self.series(start, end, cadence),
        })
    }

    fn series<S>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        samples: Vec<S>,
    ) -> Option<SeriesRecord<S>> {
        if samples.is_empty() {
            return None;
        }
        Some(SeriesRecord {
            start,
            end,
            samples,
            metadata: self.metadata.clone(),
        })
    }
}

/// Mapper med standard metadata.
pub fn map(headers: &[SessionHeader], readings: &[Reading]) -> Result<RecordSet, MappingError> {
    SessionMapper::default().map(headers, readings)
}

/// Sorterer på tidsstempel, beholder første måling per tidsstempel og fjerner
/// alt utenfor det åpne intervallet `(start, end)`.
///
/// Lageret avviser målinger på øktgrensene og gjentatte tidsstempler
/// innenfor én serie.
pub fn window_readings(
    readings: &[Reading],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&Reading> {
    let mut sorted: Vec<&Reading> = readings.iter().collect();
    sorted.sort_by_key(|r| r.timestamp); // stabil: første forekomst blir først
    let before = sorted.len();
    sorted.dedup_by_key(|r| r.timestamp);
    let duplicates = before - sorted.len();

    let kept: Vec<&Reading> = sorted
        .into_iter()
        .filter(|r| r.timestamp > start && r.timestamp < end)
        .collect();

    log::debug!(
        "window_readings: {} in, {} duplicate timestamps, {} outside session, {} kept",
        before,
        duplicates,
        before - duplicates - kept.len(),
        kept.len()
    );
    kept
}

/// Sann hvis hver måling er strengt senere enn den før.
pub fn is_strictly_ordered<T: Timed>(samples: &[T]) -> bool {
    samples.windows(2).all(|w| w[0].time() < w[1].time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn dedup_keeps_first_reading_of_a_timestamp() {
        let t = t0() + Duration::seconds(5);
        let readings = vec![
            Reading::new(t).with_heart_rate(100),
            Reading::new(t).with_heart_rate(200),
        ];
        let kept = window_readings(&readings, t0(), t0() + Duration::seconds(10));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].heart_rate, Some(100));
    }

    #[test]
    fn dedup_survives_unsorted_input() {
        let readings = vec![
            Reading::new(t0() + Duration::seconds(3)).with_power(3),
            Reading::new(t0() + Duration::seconds(1)).with_power(1),
            Reading::new(t0() + Duration::seconds(3)).with_power(33),
            Reading::new(t0() + Duration::seconds(2)).with_power(2),
        ];
        let kept = window_readings(&readings, t0(), t0() + Duration::seconds(10));
        let watts: Vec<_> = kept.iter().map(|r| r.power.unwrap()).collect();
        assert_eq!(watts, vec![1, 2, 3]);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let header = SessionHeader {
            sport: crate::types::Sport::Cycling,
            start: t0(),
            end: t0(),
            total_distance: 0.0,
            total_calories: 0.0,
        };
        let err = map(&[header], &[]).unwrap_err();
        assert!(matches!(err, MappingError::InvalidSessionWindow { .. }));
    }
}
