//! Graph database collaborator.
//!
//! The dispatcher talks to the graph only through [`GraphQuery`], which accepts
//! an OpenCypher query string plus parameters and returns rows as JSON
//! objects. The helper functions below wrap the handful of queries the
//! `/graph/*` actions need.

mod neptune;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::info;

use crate::scaling::{ScaledCoordinate, unscale};

pub use neptune::NeptuneClient;

/// One result row
pub type Row = Map<String, Value>;

#[async_trait]
pub trait GraphQuery: Send + Sync {
    async fn execute_query(&self, query: &str, parameters: Value) -> Result<Vec<Row>>;

    /// Endpoint description used in status reports
    fn endpoint(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub vertex_id: Value,
    pub vertex_labels: Vec<String>,
    pub vertex_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_latitude: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_longitude: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manhattan_distance: Option<i64>,
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub vertex_id: Value,
    pub vertex_labels: Vec<String>,
    pub vertex_label: String,
    pub properties: Value,
    pub relationship_type: Option<String>,
    pub relationship_properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphPath {
    pub nodes: Value,
    pub relationships: Value,
    pub path_length: i64,
    pub start_id: String,
    pub end_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub status: &'static str,
    pub endpoint: String,
    pub query_language: &'static str,
    pub vertex_count: i64,
    pub edge_count: i64,
    pub vertex_labels: Vec<String>,
    pub relationship_types: Vec<String>,
}

/// Which way edges are followed when listing neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
    Both,
}

impl EdgeDirection {
    fn pattern(&self, relationship_type: Option<&str>) -> String {
        let edge = match relationship_type {
            Some(t) => format!("[r:{}]", t),
            None => "[r]".to_string(),
        };
        match self {
            EdgeDirection::Outgoing => format!("-{}->", edge),
            EdgeDirection::Incoming => format!("<-{}-", edge),
            EdgeDirection::Both => format!("-{}-", edge),
        }
    }
}

impl FromStr for EdgeDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "outgoing" => Ok(EdgeDirection::Outgoing),
            "incoming" => Ok(EdgeDirection::Incoming),
            "both" => Ok(EdgeDirection::Both),
            other => Err(anyhow!(
                "direction must be one of outgoing, incoming, both (got '{}')",
                other
            )),
        }
    }
}

/// Relationship types are spliced into the query text, so only identifier characters are allowed
pub fn is_valid_relationship_type(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn labels(row: &Row, key: &str) -> Vec<String> {
    row.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn field(row: &Row, key: &str) -> Value {
    row.get(key).cloned().unwrap_or(Value::Null)
}

fn object_field(row: &Row, key: &str) -> Value {
    row.get(key)
        .cloned()
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn vertex_from_row(row: &Row) -> Vertex {
    let vertex_labels = labels(row, "vertex_labels");
    let scaled_latitude = row.get("scaled_latitude").and_then(Value::as_i64);
    let scaled_longitude = row.get("scaled_longitude").and_then(Value::as_i64);
    let (latitude, longitude) = match (scaled_latitude, scaled_longitude) {
        (Some(lat), Some(lon)) => (Some(unscale(lat)), Some(unscale(lon))),
        _ => (None, None),
    };

    Vertex {
        vertex_id: field(row, "vertex_id"),
        vertex_label: vertex_labels.first().cloned().unwrap_or_default(),
        vertex_labels,
        scaled_latitude,
        scaled_longitude,
        latitude,
        longitude,
        manhattan_distance: row.get("distance").and_then(Value::as_i64),
        properties: object_field(row, "properties"),
    }
}

/// Vertices closest to a scaled coordinate by Manhattan distance on the scaled values
pub async fn find_nearest_vertices(
    graph: &dyn GraphQuery,
    target: ScaledCoordinate,
    limit: u32,
) -> Result<Vec<Vertex>> {
    let query = "
        MATCH (n)
        WHERE n.scaled_latitude IS NOT NULL
          AND n.scaled_longitude IS NOT NULL
        WITH n,
             abs(n.scaled_latitude - $target_lat) + abs(n.scaled_longitude - $target_lon) AS distance
        ORDER BY distance ASC
        LIMIT $limit
        RETURN
            id(n) AS vertex_id,
            labels(n) AS vertex_labels,
            n.scaled_latitude AS scaled_latitude,
            n.scaled_longitude AS scaled_longitude,
            distance,
            properties(n) AS properties
    ";

    let parameters = json!({
        "target_lat": target.scaled_latitude,
        "target_lon": target.scaled_longitude,
        "limit": limit,
    });

    let rows = graph.execute_query(query, parameters).await?;
    let vertices: Vec<Vertex> = rows.iter().map(vertex_from_row).collect();
    info!("Found {} nearest vertices", vertices.len());
    Ok(vertices)
}

pub async fn get_vertex_by_id(graph: &dyn GraphQuery, vertex_id: &str) -> Result<Option<Vertex>> {
    let query = "
        MATCH (n)
        WHERE id(n) = $vertex_id
        RETURN
            id(n) AS vertex_id,
            labels(n) AS vertex_labels,
            properties(n) AS properties
    ";

    let rows = graph
        .execute_query(query, json!({ "vertex_id": vertex_id }))
        .await?;
    Ok(rows.first().map(vertex_from_row))
}

/// Shortest path of at most `max_hops` edges, ignoring edge direction
pub async fn find_path_between_vertices(
    graph: &dyn GraphQuery,
    start_id: &str,
    end_id: &str,
    max_hops: u32,
) -> Result<Option<GraphPath>> {
    let query = format!(
        "
        MATCH path = shortestPath((start)-[*..{max_hops}]-(end))
        WHERE id(start) = $start_id AND id(end) = $end_id
        RETURN
            [node IN nodes(path) | {{id: id(node), labels: labels(node), properties: properties(node)}}] AS nodes,
            [rel IN relationships(path) | {{id: id(rel), type: type(rel), properties: properties(rel)}}] AS relationships,
            length(path) AS path_length
        LIMIT 1
    "
    );

    let rows = graph
        .execute_query(&query, json!({ "start_id": start_id, "end_id": end_id }))
        .await?;

    Ok(rows.first().map(|row| GraphPath {
        nodes: row.get("nodes").cloned().unwrap_or_else(|| json!([])),
        relationships: row.get("relationships").cloned().unwrap_or_else(|| json!([])),
        path_length: row.get("path_length").and_then(Value::as_i64).unwrap_or(0),
        start_id: start_id.to_string(),
        end_id: end_id.to_string(),
    }))
}

pub async fn get_vertex_neighbors(
    graph: &dyn GraphQuery,
    vertex_id: &str,
    relationship_type: Option<&str>,
    direction: EdgeDirection,
    limit: u32,
) -> Result<Vec<Neighbor>> {
    if let Some(t) = relationship_type
        && !is_valid_relationship_type(t)
    {
        return Err(anyhow!("Invalid relationship type: {}", t));
    }

    let query = format!(
        "
        MATCH (start){pattern}(neighbor)
        WHERE id(start) = $vertex_id
        RETURN
            id(neighbor) AS neighbor_id,
            labels(neighbor) AS neighbor_labels,
            properties(neighbor) AS neighbor_properties,
            type(r) AS relationship_type,
            properties(r) AS relationship_properties
        LIMIT $limit
    ",
        pattern = direction.pattern(relationship_type)
    );

    let rows = graph
        .execute_query(&query, json!({ "vertex_id": vertex_id, "limit": limit }))
        .await?;

    let neighbors: Vec<Neighbor> = rows
        .iter()
        .map(|row| {
            let vertex_labels = labels(row, "neighbor_labels");
            Neighbor {
                vertex_id: field(row, "neighbor_id"),
                vertex_label: vertex_labels.first().cloned().unwrap_or_default(),
                vertex_labels,
                properties: object_field(row, "neighbor_properties"),
                relationship_type: row
                    .get("relationship_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                relationship_properties: object_field(row, "relationship_properties"),
            }
        })
        .collect();

    info!("Found {} neighbors", neighbors.len());
    Ok(neighbors)
}

async fn count(graph: &dyn GraphQuery, query: &str) -> Result<i64> {
    let rows = graph.execute_query(query, json!({})).await?;
    Ok(rows
        .first()
        .and_then(|r| r.get("count"))
        .and_then(Value::as_i64)
        .unwrap_or(0))
}

/// Vertex/edge counts plus a sample of labels and relationship types
pub async fn connection_stats(graph: &dyn GraphQuery) -> Result<GraphStats> {
    let vertex_count = count(graph, "MATCH (n) RETURN count(n) AS count").await?;
    let edge_count = count(graph, "MATCH ()-[r]->() RETURN count(r) AS count").await?;

    let label_rows = graph
        .execute_query("MATCH (n) RETURN DISTINCT labels(n) AS labels LIMIT 10", json!({}))
        .await?;
    let vertex_labels: BTreeSet<String> = label_rows
        .iter()
        .flat_map(|row| labels(row, "labels"))
        .collect();

    let type_rows = graph
        .execute_query(
            "MATCH ()-[r]->() RETURN DISTINCT type(r) AS type LIMIT 10",
            json!({}),
        )
        .await?;
    let relationship_types = type_rows
        .iter()
        .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
        .collect();

    Ok(GraphStats {
        status: "connected",
        endpoint: graph.endpoint(),
        query_language: "OpenCypher",
        vertex_count,
        edge_count,
        vertex_labels: vertex_labels.into_iter().collect(),
        relationship_types,
    })
}
