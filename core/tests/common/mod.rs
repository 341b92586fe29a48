// Testhjelpere: bygger ekte FIT-bytes (header, definisjons-/datameldinger, CRC).
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Sekunder mellom Unix-epoken og FIT-epoken (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

pub const MESG_FILE_ID: u16 = 0;
pub const MESG_SESSION: u16 = 18;
pub const MESG_RECORD: u16 = 20;

pub const SPORT_RUNNING: u8 = 1;
pub const SPORT_CYCLING: u8 = 2;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

fn crc_byte(mut crc: u16, byte: u8) -> u16 {
    let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];
    tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
}

pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, b| crc_byte(crc, *b))
}

#[derive(Debug, Clone, Copy)]
pub enum Base {
    Enum,
    UInt8,
    UInt16,
    SInt32,
    UInt32,
}

impl Base {
    fn code(self) -> u8 {
        match self {
            Base::Enum => 0x00,
            Base::UInt8 => 0x02,
            Base::UInt16 => 0x84,
            Base::SInt32 => 0x85,
            Base::UInt32 => 0x86,
        }
    }

    fn size(self) -> u8 {
        match self {
            Base::Enum | Base::UInt8 => 1,
            Base::UInt16 => 2,
            Base::SInt32 | Base::UInt32 => 4,
        }
    }

    fn write(self, out: &mut Vec<u8>, value: i64) {
        match self {
            Base::Enum | Base::UInt8 => out.push(value as u8),
            Base::UInt16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
            Base::SInt32 => out.extend_from_slice(&(value as i32).to_le_bytes()),
            Base::UInt32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        }
    }
}

/// Hver melding får sin egen definisjon på lokal type 0, så meldinger
/// med ulike felter kan blandes fritt.
#[derive(Default)]
pub struct FitWriter {
    data: Vec<u8>,
}

impl FitWriter {
    pub fn new() -> Self {
        let mut w = Self::default();
        w.message(MESG_FILE_ID, &[(0, Base::Enum, 4)]); // type = activity
        w
    }

    pub fn message(&mut self, global: u16, fields: &[(u8, Base, i64)]) -> &mut Self {
        // definisjon
        self.data.push(0x40);
        self.data.push(0); // reservert
        self.data.push(0); // little endian
        self.data.extend_from_slice(&global.to_le_bytes());
        self.data.push(fields.len() as u8);
        for (num, base, _) in fields {
            self.data.extend_from_slice(&[*num, base.size(), base.code()]);
        }
        // data
        self.data.push(0x00);
        for (_, base, value) in fields {
            base.write(&mut self.data, *value);
        }
        self
    }

    pub fn session(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sport: u8,
        distance_m: f64,
        kcal: u16,
    ) -> &mut Self {
        self.message(
            MESG_SESSION,
            &[
                (253, Base::UInt32, fit_ts(end)),
                (2, Base::UInt32, fit_ts(start)),
                (5, Base::Enum, sport as i64),
                (9, Base::UInt32, (distance_m * 100.0).round() as i64),
                (11, Base::UInt16, kcal as i64),
            ],
        )
    }

    pub fn record(&mut self, time: DateTime<Utc>, r: &Rec) -> &mut Self {
        let mut fields = vec![(253u8, Base::UInt32, fit_ts(time))];
        if let Some((lat, lon)) = r.position {
            fields.push((0, Base::SInt32, lat as i64));
            fields.push((1, Base::SInt32, lon as i64));
        }
        if let Some(alt) = r.altitude {
            // skala 5, offset 500
            fields.push((2, Base::UInt16, ((alt + 500.0) * 5.0).round() as i64));
        }
        if let Some(hr) = r.heart_rate {
            fields.push((3, Base::UInt8, hr as i64));
        }
        if let Some(cad) = r.cadence {
            fields.push((4, Base::UInt8, cad as i64));
        }
        if let Some(speed) = r.speed {
            // skala 1000
            fields.push((6, Base::UInt16, (speed * 1000.0).round() as i64));
        }
        if let Some(power) = r.power {
            fields.push((7, Base::UInt16, power as i64));
        }
        self.message(MESG_RECORD, &fields)
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(14 + self.data.len() + 2);
        out.push(14);
        out.push(0x20); // protocol 2.0
        out.extend_from_slice(&2132u16.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(b".FIT");
        let header_crc = crc16(&out);
        out.extend_from_slice(&header_crc.to_le_bytes());

        out.extend_from_slice(&self.data);
        let file_crc = crc16(&out);
        out.extend_from_slice(&file_crc.to_le_bytes());
        out
    }
}

pub fn fit_ts(t: DateTime<Utc>) -> i64 {
    t.timestamp() - FIT_EPOCH_OFFSET
}

/// Valgfrie felter i én `record`-melding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rec {
    pub position: Option<(i32, i32)>,
    pub altitude: Option<f64>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,
    pub speed: Option<f64>,
    pub power: Option<u16>,
}

impl Rec {
    pub fn hr(bpm: u8) -> Self {
        Self {
            heart_rate: Some(bpm),
            ..Self::default()
        }
    }

    pub fn full(i: i64) -> Self {
        Self {
            position: Some((714_206_015 + i as i32 * 1_000, 128_110_390 + i as i32 * 1_000)),
            altitude: Some(100.0 + i as f64),
            heart_rate: Some(120 + i as u8),
            cadence: Some(80),
            speed: Some(5.5),
            power: Some(200 + i as u16),
        }
    }
}

/// En sykkeltur på 60 s: målinger ved 0, 10, ..., 60 s, alle felter med.
pub fn sample_ride() -> Vec<u8> {
    let mut w = FitWriter::new();
    for i in 0..=6 {
        w.record(at(i * 10), &Rec::full(i));
    }
    w.session(t0(), at(60), SPORT_CYCLING, 1234.56, 321);
    w.finish()
}

/// Skriver `bytes` til en tempkatalog og returnerer (katalogvakt, sti).
pub fn write_temp_fit(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("activity.fit");
    std::fs::write(&path, bytes).expect("write fit");
    (dir, path)
}
