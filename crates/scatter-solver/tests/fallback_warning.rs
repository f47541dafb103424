//! Log output when the accelerated backend cannot be built.
//!
//! Kept in its own test binary with a single test: the `log` facade accepts
//! one logger per process.

use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use scatter_solver::{BackendRegistry, DEFAULT_BACKEND, DependencyUnavailable};

struct Capture {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    records: Mutex::new(Vec::new()),
};

#[test]
fn missing_dependency_warns_once_and_falls_back() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let registry = BackendRegistry::with_accelerated(Err(DependencyUnavailable::new(
        "lapack",
        "not installed",
    )));
    assert_eq!(registry.get(DEFAULT_BACKEND).unwrap().name(), "filipsson_gunnar");
    assert_eq!(registry.fallback().unwrap().reason, "not installed");

    let records = CAPTURE.records.lock().unwrap();
    let warnings: Vec<&String> = records
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, message)| message)
        .collect();
    assert_eq!(warnings.len(), 1, "{records:?}");
    assert!(warnings[0].contains("lapack"), "{}", warnings[0]);
    assert!(warnings[0].contains("not installed"), "{}", warnings[0]);
    assert!(warnings[0].contains("filipsson_gunnar"), "{}", warnings[0]);
}
