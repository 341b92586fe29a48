//! Loggoppsett og importtellere for hele prosessen.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn register<C: prometheus::core::Collector + Clone + 'static>(collector: C) -> C {
    if let Err(e) = REGISTRY.register(Box::new(collector.clone())) {
        log::warn!("metric registration failed: {e}");
    }
    collector
}

static FILES_DECODED: Lazy<IntCounter> = Lazy::new(|| {
    register(
        IntCounter::new("fitbridge_files_decoded_total", "FIT files decoded and mapped")
            .expect("metric definition"),
    )
});

static IMPORT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register(
        IntCounterVec::new(
            Opts::new("fitbridge_import_failures_total", "Failed imports by error kind"),
            &["kind"],
        )
        .expect("metric definition"),
    )
});

static SAMPLES_MAPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    register(
        IntCounterVec::new(
            Opts::new("fitbridge_samples_mapped_total", "Samples mapped per series"),
            &["series"],
        )
        .expect("metric definition"),
    )
});

static RECORDS_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    register(
        IntCounter::new("fitbridge_records_written_total", "Records accepted by the health store")
            .expect("metric definition"),
    )
});

pub fn files_decoded_total() -> &'static IntCounter {
    &FILES_DECODED
}

pub fn import_failures_total(kind: &str) -> IntCounter {
    IMPORT_FAILURES.with_label_values(&[kind])
}

pub fn samples_mapped_total(series: &str) -> IntCounter {
    SAMPLES_MAPPED.with_label_values(&[series])
}

pub fn records_written_total() -> &'static IntCounter {
    &RECORDS_WRITTEN
}

/// Skriver alle tellere i Prometheus-tekstformat.
pub fn gather_text() -> String {
    // Rør de late verdiene så tellerne vises også på null
    Lazy::force(&FILES_DECODED);
    Lazy::force(&IMPORT_FAILURES);
    Lazy::force(&SAMPLES_MAPPED);
    Lazy::force(&RECORDS_WRITTEN);

    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buf) {
        log::warn!("metrics encoding failed: {e}");
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Installerer `env_logger`. `RUST_LOG` vinner over `level`; gjentatte kall gjør ingenting.
pub fn init_logging(level: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level.unwrap_or("info"));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.format_timestamp_secs().try_init();
}
