use serde_json::{Value, json};
use tracing::info;

use super::{DispatchError, Params, failure, required, to_body};
use crate::geocoding::Geocoder;
use crate::graph::{self, EdgeDirection, GraphQuery, is_valid_relationship_type};
use crate::scaling::scale;

const DEFAULT_NEAREST_LIMIT: u32 = 2;
const DEFAULT_MAX_HOPS: u32 = 5;
const DEFAULT_NEIGHBOR_LIMIT: u32 = 10;

/// Optional positive integer parameter
fn positive_integer(params: &Params, name: &str, default: u32) -> Result<u32, String> {
    match required(params, name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("{} must be a positive integer (got '{}')", name, raw)),
        },
    }
}

fn graph_error(e: anyhow::Error) -> DispatchError {
    DispatchError::Graph(e)
}

/// Handler for /graph/nearestVertices
pub async fn nearest_vertices(
    geocoder: &Geocoder,
    graph: &dyn GraphQuery,
    params: &Params,
) -> Result<Value, DispatchError> {
    let Some(city) = required(params, "cityName") else {
        return Ok(failure("cityName parameter is required"));
    };
    let limit = match positive_integer(params, "limit", DEFAULT_NEAREST_LIMIT) {
        Ok(limit) => limit,
        Err(message) => return Ok(failure(&message)),
    };

    let geocode = geocoder.resolve_with_fallback(city).await;
    let Some(place) = &geocode.place else {
        return Ok(json!({
            "success": false,
            "error": format!("Could not geocode city: {}", city),
            "geocoding": to_body(&geocode)?,
        }));
    };

    let target = scale(place.latitude, place.longitude);
    let vertices = graph::find_nearest_vertices(graph, target, limit)
        .await
        .map_err(graph_error)?;

    info!(city = %city, count = vertices.len(), "Nearest vertex lookup complete");

    Ok(json!({
        "success": true,
        "city": city,
        "coordinates": {
            "latitude": place.latitude,
            "longitude": place.longitude,
            "scaled_latitude": target.scaled_latitude,
            "scaled_longitude": target.scaled_longitude,
        },
        "source": geocode.source,
        "count": vertices.len(),
        "nearest_vertices": to_body(&vertices)?,
    }))
}

/// Handler for /graph/vertex
pub async fn vertex(graph: &dyn GraphQuery, params: &Params) -> Result<Value, DispatchError> {
    let Some(vertex_id) = required(params, "vertexId") else {
        return Ok(failure("vertexId parameter is required"));
    };

    match graph::get_vertex_by_id(graph, vertex_id)
        .await
        .map_err(graph_error)?
    {
        Some(vertex) => Ok(json!({ "success": true, "vertex": to_body(&vertex)? })),
        None => Ok(failure(&format!("Vertex not found: {}", vertex_id))),
    }
}

/// Handler for /graph/path
pub async fn path(graph: &dyn GraphQuery, params: &Params) -> Result<Value, DispatchError> {
    let (Some(start_id), Some(end_id)) = (required(params, "startId"), required(params, "endId"))
    else {
        return Ok(failure("Both startId and endId parameters are required"));
    };
    let max_hops = match positive_integer(params, "maxHops", DEFAULT_MAX_HOPS) {
        Ok(hops) => hops,
        Err(message) => return Ok(failure(&message)),
    };

    match graph::find_path_between_vertices(graph, start_id, end_id, max_hops)
        .await
        .map_err(graph_error)?
    {
        Some(path) => Ok(json!({ "success": true, "path": to_body(&path)? })),
        None => Ok(failure(&format!(
            "No path found between {} and {} within {} hops",
            start_id, end_id, max_hops
        ))),
    }
}

/// Handler for /graph/neighbors
pub async fn neighbors(graph: &dyn GraphQuery, params: &Params) -> Result<Value, DispatchError> {
    let Some(vertex_id) = required(params, "vertexId") else {
        return Ok(failure("vertexId parameter is required"));
    };

    let relationship_type = required(params, "relationshipType");
    if let Some(t) = relationship_type
        && !is_valid_relationship_type(t)
    {
        return Ok(failure(&format!("Invalid relationship type: {}", t)));
    }

    let direction_name = required(params, "direction").unwrap_or("both");
    let direction = match direction_name.parse::<EdgeDirection>() {
        Ok(direction) => direction,
        Err(e) => return Ok(failure(&e.to_string())),
    };

    let limit = match positive_integer(params, "limit", DEFAULT_NEIGHBOR_LIMIT) {
        Ok(limit) => limit,
        Err(message) => return Ok(failure(&message)),
    };

    let neighbors = graph::get_vertex_neighbors(graph, vertex_id, relationship_type, direction, limit)
        .await
        .map_err(graph_error)?;

    Ok(json!({
        "success": true,
        "vertex_id": vertex_id,
        "direction": direction_name,
        "relationship_type": relationship_type,
        "count": neighbors.len(),
        "neighbors": to_body(&neighbors)?,
    }))
}

/// Handler for /graph/status
pub async fn status(graph: &dyn GraphQuery) -> Result<Value, DispatchError> {
    let stats = graph::connection_stats(graph).await.map_err(graph_error)?;
    let mut body = to_body(&stats)?;
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_positive_integer_defaults_and_validation() {
        assert_eq!(positive_integer(&params(&[]), "limit", 2), Ok(2));
        assert_eq!(positive_integer(&params(&[("limit", " 7 ")]), "limit", 2), Ok(7));
        assert!(positive_integer(&params(&[("limit", "0")]), "limit", 2).is_err());
        assert!(positive_integer(&params(&[("limit", "-3")]), "limit", 2).is_err());
        assert!(positive_integer(&params(&[("maxHops", "lots")]), "maxHops", 5).is_err());
    }
}
