//! Common test utilities: scripted geocoding providers and graph backends.
//!
//! # Usage
//!
//! ```no_run
//! use common::{FakeGeocoder, FakeOutcome};
//! use city_locator::geocoding::{Geocoder, ProviderId};
//!
//! let nominatim = FakeGeocoder::new(ProviderId::Nominatim, FakeOutcome::found(35.68, 139.69));
//! let calls = nominatim.calls();
//! let geocoder = Geocoder::new(vec![Box::new(nominatim)], "nominatim");
//! ```

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use city_locator::geocoding::{
    ForwardGeocoder, GeocodeResult, Geocoder, Lookup, Place, ProviderId,
};
use city_locator::graph::{GraphQuery, Row};

/// What a fake provider answers on every call
#[derive(Clone)]
pub enum FakeOutcome {
    Found {
        latitude: f64,
        longitude: f64,
        country: String,
    },
    NotFound,
    Unavailable,
    Panic,
}

impl FakeOutcome {
    pub fn found(latitude: f64, longitude: f64) -> Self {
        FakeOutcome::Found {
            latitude,
            longitude,
            country: "Testland".to_string(),
        }
    }
}

/// Provider stub that counts how often it was called
pub struct FakeGeocoder {
    id: ProviderId,
    outcome: FakeOutcome,
    calls: Arc<AtomicUsize>,
}

impl FakeGeocoder {
    pub fn new(id: ProviderId, outcome: FakeOutcome) -> Self {
        Self {
            id,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ForwardGeocoder for FakeGeocoder {
    fn provider(&self) -> ProviderId {
        self.id
    }

    async fn geocode(&self, query: &str) -> Lookup {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            FakeOutcome::Found {
                latitude,
                longitude,
                country,
            } => {
                let place = Place::new(
                    *latitude,
                    *longitude,
                    format!("{}, {}", query, country),
                    Some(country.clone()),
                    Some("tl".to_string()),
                    None,
                )
                .expect("fake coordinates must be in range");
                Lookup::Found(GeocodeResult::matched(query, place, self.id, None))
            }
            FakeOutcome::NotFound => {
                Lookup::NotFound(GeocodeResult::no_match(query, self.id, "No results found"))
            }
            FakeOutcome::Unavailable => Lookup::Unavailable("connection refused".to_string()),
            FakeOutcome::Panic => panic!("provider exploded"),
        }
    }
}

/// Three fake providers plus their call counters, in fallback order
pub struct FakeProviders {
    pub geocoder: Geocoder,
    pub opencage_calls: Arc<AtomicUsize>,
    pub google_calls: Arc<AtomicUsize>,
    pub nominatim_calls: Arc<AtomicUsize>,
}

impl FakeProviders {
    pub fn total_calls(&self) -> usize {
        self.opencage_calls.load(Ordering::SeqCst)
            + self.google_calls.load(Ordering::SeqCst)
            + self.nominatim_calls.load(Ordering::SeqCst)
    }
}

pub fn fake_providers(
    opencage: FakeOutcome,
    google: FakeOutcome,
    nominatim: FakeOutcome,
    preferred: &str,
) -> FakeProviders {
    let opencage = FakeGeocoder::new(ProviderId::OpenCage, opencage);
    let google = FakeGeocoder::new(ProviderId::Google, google);
    let nominatim = FakeGeocoder::new(ProviderId::Nominatim, nominatim);

    let opencage_calls = opencage.calls();
    let google_calls = google.calls();
    let nominatim_calls = nominatim.calls();

    // Deliberately out of order; the geocoder sorts them
    let geocoder = Geocoder::new(
        vec![Box::new(nominatim), Box::new(opencage), Box::new(google)],
        preferred,
    );

    FakeProviders {
        geocoder,
        opencage_calls,
        google_calls,
        nominatim_calls,
    }
}

/// Graph stub answering every query with the same rows (or the same error)
pub struct FakeGraph {
    rows: Vec<Row>,
    fail: bool,
    queries: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeGraph {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
            fail: false,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            fail: true,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queries received so far, with their parameters
    pub fn queries(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        self.queries.clone()
    }
}

#[async_trait]
impl GraphQuery for FakeGraph {
    async fn execute_query(&self, query: &str, parameters: Value) -> Result<Vec<Row>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), parameters));
        if self.fail {
            return Err(anyhow!("Graph query failed with status: 503 Service Unavailable"));
        }
        Ok(self.rows.clone())
    }

    fn endpoint(&self) -> String {
        "https://graph.test:8182".to_string()
    }
}
