//! Action dispatcher.
//!
//! An inbound event names an action path and carries string parameters. The
//! [`Dispatcher`] routes it to one of the handlers in this module and wraps
//! whatever comes back in the standard [`ActionResponse`] envelope. Handled
//! outcomes, including "not found" and missing parameters, are HTTP 200 with
//! `success: false` in the body; only unexpected failures are 500.

pub mod envelope;
pub mod error;
pub mod geocoding;
pub mod graph;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::geocoding::Geocoder;
use crate::graph::{GraphQuery, NeptuneClient};

pub use envelope::{ActionRequest, ActionResponse, EchoFields, Parameter};
pub use error::DispatchError;
pub use geocoding::{ScaledCoordinateResult, TravelContext, TwoCityResult, locate_two_cities};

/// Request parameters by name
pub type Params = HashMap<String, String>;

pub mod paths {
    pub const CITY_COORDINATES: &str = "/getCityCoordinates";
    pub const TWO_CITIES_COORDINATES: &str = "/getTwoCitiesCoordinates";
    pub const SCALED_COORDINATES: &str = "/getScaledCoordinates";
    pub const GRAPH_NEAREST_VERTICES: &str = "/graph/nearestVertices";
    pub const GRAPH_VERTEX: &str = "/graph/vertex";
    pub const GRAPH_PATH: &str = "/graph/path";
    pub const GRAPH_NEIGHBORS: &str = "/graph/neighbors";
    pub const GRAPH_STATUS: &str = "/graph/status";

    pub const SUPPORTED: [&str; 8] = [
        CITY_COORDINATES,
        TWO_CITIES_COORDINATES,
        SCALED_COORDINATES,
        GRAPH_NEAREST_VERTICES,
        GRAPH_VERTEX,
        GRAPH_PATH,
        GRAPH_NEIGHBORS,
        GRAPH_STATUS,
    ];
}

const GRAPH_NOT_CONFIGURED: &str = "Graph database is not configured";

/// Value of a parameter that is present and non-empty
pub(crate) fn required<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

pub(crate) fn failure(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    Ok(serde_json::to_value(value)?)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct Dispatcher {
    geocoder: Geocoder,
    graph: Option<Box<dyn GraphQuery>>,
}

impl Dispatcher {
    pub fn new(geocoder: Geocoder, graph: Option<Box<dyn GraphQuery>>) -> Self {
        Self { geocoder, graph }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geocoder = Geocoder::from_config(config)?;
        let graph: Option<Box<dyn GraphQuery>> = match &config.neptune {
            Some(neptune) => Some(Box::new(NeptuneClient::new(neptune)?)),
            None => {
                info!("NEPTUNE_ENDPOINT not set, graph actions disabled");
                None
            }
        };
        Ok(Self::new(geocoder, graph))
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Parse a raw event and handle it; malformed events get a 400 envelope
    pub async fn handle_event(&self, event: Value) -> ActionResponse {
        let echo = EchoFields::from_raw(&event);
        match serde_json::from_value::<ActionRequest>(event) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("Rejecting malformed action event: {}", e);
                ActionResponse::from_error(echo, &DispatchError::InvalidRequest(e.to_string()))
            }
        }
    }

    pub async fn handle(&self, request: ActionRequest) -> ActionResponse {
        let echo = EchoFields::from(&request);
        let params = request.parameter_map();

        info!(
            api_path = %request.api_path,
            http_method = %request.http_method,
            action_group = %request.action_group,
            "Received action request"
        );

        let outcome = AssertUnwindSafe(self.dispatch(&request.api_path, &params))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(DispatchError::Panic(panic_message(payload))));

        match outcome {
            Ok(body) => {
                let success = body
                    .get("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                info!(api_path = %request.api_path, success, "Request completed");
                ActionResponse::new(echo, 200, &body)
            }
            Err(e) => {
                error!(
                    api_path = %request.api_path,
                    error_type = e.kind(),
                    "Unhandled error while dispatching: {}",
                    e
                );
                ActionResponse::from_error(echo, &e)
            }
        }
    }

    async fn dispatch(&self, api_path: &str, params: &Params) -> Result<Value, DispatchError> {
        match api_path {
            paths::CITY_COORDINATES => geocoding::city_coordinates(&self.geocoder, params).await,
            paths::TWO_CITIES_COORDINATES => {
                geocoding::two_cities_coordinates(&self.geocoder, params).await
            }
            paths::SCALED_COORDINATES => {
                geocoding::scaled_coordinates(&self.geocoder, params).await
            }
            paths::GRAPH_NEAREST_VERTICES
            | paths::GRAPH_VERTEX
            | paths::GRAPH_PATH
            | paths::GRAPH_NEIGHBORS
            | paths::GRAPH_STATUS => {
                let Some(graph) = self.graph.as_deref() else {
                    return Ok(failure(GRAPH_NOT_CONFIGURED));
                };
                match api_path {
                    paths::GRAPH_NEAREST_VERTICES => {
                        graph::nearest_vertices(&self.geocoder, graph, params).await
                    }
                    paths::GRAPH_VERTEX => graph::vertex(graph, params).await,
                    paths::GRAPH_PATH => graph::path(graph, params).await,
                    paths::GRAPH_NEIGHBORS => graph::neighbors(graph, params).await,
                    _ => graph::status(graph).await,
                }
            }
            other => Ok(json!({
                "success": false,
                "error": format!("Unknown API path: {}", other),
                "supported_paths": paths::SUPPORTED,
            })),
        }
    }
}
