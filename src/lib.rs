//! City locator - geocoding with provider fallback, great-circle distance and
//! a small action dispatcher in front of an OpenCypher graph.
//!
//! Geocoding requests are resolved against OpenCage, Google Maps and
//! Nominatim in a fixed fallback order, with a configurable preferred
//! provider tried first.

pub mod actions;
pub mod config;
pub mod distance;
pub mod geocoding;
pub mod graph;
pub mod log_format;
pub mod scaling;
pub mod web;

pub use actions::{ActionRequest, ActionResponse, Dispatcher};
pub use config::Config;
pub use geocoding::{GeocodeResult, Geocoder};
