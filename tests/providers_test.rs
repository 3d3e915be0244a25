//! Provider adapters and the graph client against recorded HTTP responses.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use city_locator::actions::{Dispatcher, paths};
use city_locator::config::Config;
use city_locator::geocoding::{
    ForwardGeocoder, Geocoder, Lookup, NominatimClient, OpenCageClient, ProviderExtras,
};
use city_locator::graph::{GraphQuery, NeptuneClient};
use city_locator::{ActionRequest, web};

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

fn opencage(server: &MockServer) -> OpenCageClient {
    OpenCageClient::new(
        http_client(Duration::from_secs(5)),
        server.uri(),
        Some("test-key".to_string()),
    )
}

fn nominatim(server: &MockServer, timeout: Duration) -> NominatimClient {
    NominatimClient::new(http_client(timeout), server.uri(), "CityLocator/1.0".to_string())
}

fn tokyo_from_opencage() -> serde_json::Value {
    json!({
        "results": [{
            "annotations": {"timezone": {"name": "Asia/Tokyo", "offset_sec": 32400}},
            "bounds": {
                "northeast": {"lat": 35.8986, "lng": 139.9183},
                "southwest": {"lat": 35.5014, "lng": 139.5629}
            },
            "components": {
                "country": "Japan",
                "country_code": "jp",
                "state": "Tokyo",
                "_type": "city"
            },
            "confidence": 4,
            "formatted": "Tokyo, Japan",
            "geometry": {"lat": 35.6828387, "lng": 139.7594549}
        }],
        "status": {"code": 200, "message": "OK"},
        "total_results": 1
    })
}

fn tokyo_from_nominatim() -> serde_json::Value {
    json!([{
        "place_id": 331412232,
        "osm_type": "relation",
        "osm_id": 1543125,
        "lat": "35.6768601",
        "lon": "139.7638947",
        "place_rank": 8,
        "importance": 0.8243,
        "display_name": "Tokyo, Japan",
        "address": {"state": "Tokyo", "country": "Japan", "country_code": "jp"},
        "boundingbox": ["20.2145811", "35.8984245", "135.8536855", "154.2055410"]
    }])
}

/// An OpenCage match is normalized, with its extras attached
#[tokio::test]
async fn test_opencage_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/v1/json"))
        .and(query_param("q", "Tokyo"))
        .and(query_param("key", "test-key"))
        .and(query_param("limit", "1"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_from_opencage()))
        .expect(1)
        .mount(&server)
        .await;

    let Lookup::Found(result) = opencage(&server).geocode("Tokyo").await else {
        panic!("Expected a match from OpenCage");
    };

    let place = result.place.as_ref().unwrap();
    assert_eq!(place.latitude, 35.6828387);
    assert_eq!(place.longitude, 139.7594549);
    assert_eq!(place.formatted_address, "Tokyo, Japan");
    assert_eq!(place.country_code, "JP");
    assert_eq!(place.state, "Tokyo");
    assert_eq!(result.source.as_deref(), Some("OpenCage Geocoding API"));

    match result.extras {
        Some(ProviderExtras::OpenCage {
            confidence,
            timezone,
            bounds,
        }) => {
            assert_eq!(confidence, 4);
            assert_eq!(timezone.as_deref(), Some("Asia/Tokyo"));
            assert_eq!(bounds.unwrap().north, 35.8986);
        }
        other => panic!("Unexpected extras: {:?}", other),
    }
}

#[tokio::test]
async fn test_opencage_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/v1/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [],
            "status": {"code": 200, "message": "OK"},
            "total_results": 0
        })))
        .mount(&server)
        .await;

    let Lookup::NotFound(result) = opencage(&server).geocode("Xyzzyville").await else {
        panic!("Expected no match");
    };
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("No results found"));
    assert_eq!(result.source.as_deref(), Some("OpenCage Geocoding API"));
}

/// Server errors are folded into Unavailable rather than propagated
#[tokio::test]
async fn test_opencage_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let lookup = opencage(&server).geocode("Tokyo").await;
    assert!(
        matches!(lookup, Lookup::Unavailable(ref reason) if reason.contains("500")),
        "Unexpected lookup: {:?}",
        lookup
    );
}

#[tokio::test]
async fn test_opencage_garbage_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        opencage(&server).geocode("Tokyo").await,
        Lookup::Unavailable(_)
    ));
}

/// Nominatim gets the configured User-Agent and its string coordinates are parsed
#[tokio::test]
async fn test_nominatim_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Tokyo"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .and(header("User-Agent", "CityLocator/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_from_nominatim()))
        .expect(1)
        .mount(&server)
        .await;

    let Lookup::Found(result) = nominatim(&server, Duration::from_secs(5)).geocode("Tokyo").await
    else {
        panic!("Expected a match from Nominatim");
    };

    assert_eq!(result.latitude(), Some(35.6768601));
    assert_eq!(result.longitude(), Some(139.7638947));
    assert_eq!(result.source.as_deref(), Some("Nominatim (OpenStreetMap)"));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["country"], "Japan");
    assert_eq!(json["country_code"], "JP");
    assert_eq!(json["extras"]["provider"], "nominatim");
    assert_eq!(json["extras"]["osm_type"], "relation");
    assert_eq!(json["extras"]["place_rank"], 8);
    assert_eq!(json["extras"]["bounds"]["south"], json!(20.2145811));
}

#[tokio::test]
async fn test_nominatim_empty_list_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let lookup = nominatim(&server, Duration::from_secs(5)).geocode("Xyzzyville").await;
    assert!(matches!(lookup, Lookup::NotFound(_)), "Unexpected lookup: {:?}", lookup);
}

/// 403 from Nominatim (usage policy) is Unavailable
#[tokio::test]
async fn test_nominatim_forbidden_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let lookup = nominatim(&server, Duration::from_secs(5)).geocode("Tokyo").await;
    assert!(
        matches!(lookup, Lookup::Unavailable(ref reason) if reason.contains("403")),
        "Unexpected lookup: {:?}",
        lookup
    );
}

/// Out-of-range coordinates are never reported as a match
#[tokio::test]
async fn test_nominatim_out_of_range_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "lat": "95.0",
            "lon": "10.0",
            "display_name": "Beyond the pole"
        }])))
        .mount(&server)
        .await;

    let lookup = nominatim(&server, Duration::from_secs(5)).geocode("Pole").await;
    assert!(matches!(lookup, Lookup::Unavailable(_)), "Unexpected lookup: {:?}", lookup);
}

/// A slow provider times out and the failure is an ordinary Unavailable
#[tokio::test]
async fn test_timeout_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tokyo_from_nominatim())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let lookup = nominatim(&server, Duration::from_millis(200)).geocode("Tokyo").await;
    assert!(matches!(lookup, Lookup::Unavailable(_)), "Unexpected lookup: {:?}", lookup);
}

/// The production wiring falls through keyless providers to Nominatim
#[tokio::test]
async fn test_geocoder_from_config_without_keys() {
    let opencage_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_from_opencage()))
        .expect(0)
        .mount(&opencage_server)
        .await;

    let nominatim_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_from_nominatim()))
        .expect(1)
        .mount(&nominatim_server)
        .await;

    let config = Config {
        geocoding_provider: "opencage".to_string(),
        opencage_base_url: opencage_server.uri(),
        nominatim_base_url: nominatim_server.uri(),
        http_timeout: Duration::from_secs(5),
        ..Config::default()
    };

    let geocoder = Geocoder::from_config(&config).unwrap();
    let result = geocoder.resolve_with_fallback("Tokyo").await;

    assert!(result.success);
    assert_eq!(result.source.as_deref(), Some("Nominatim (OpenStreetMap)"));
    assert_eq!(
        result.note.as_deref(),
        Some("Fallback provider used (primary provider \"opencage\" failed)")
    );
}

/// OpenCypher queries are posted as JSON and `results` rows are unwrapped
#[tokio::test]
async fn test_neptune_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openCypher"))
        .and(body_partial_json(json!({"parameters": {"vertex_id": "v1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"vertex_id": "v1", "vertex_labels": ["City"], "properties": {"name": "Oslo"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NeptuneClient::with_client(http_client(Duration::from_secs(5)), server.uri());
    let vertex = city_locator::graph::get_vertex_by_id(&client, "v1")
        .await
        .unwrap()
        .expect("vertex should be found");

    assert_eq!(vertex.vertex_id, json!("v1"));
    assert_eq!(vertex.vertex_label, "City");
    assert_eq!(vertex.properties["name"], "Oslo");
}

#[tokio::test]
async fn test_neptune_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openCypher"))
        .respond_with(ResponseTemplate::new(500).set_body_string("MalformedQueryException"))
        .mount(&server)
        .await;

    let client = NeptuneClient::with_client(http_client(Duration::from_secs(5)), server.uri());
    let err = client
        .execute_query("MATCH (n) RETURN n", json!({}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "Unexpected error: {}", err);
}

/// POST /invoke serves the envelope with the same HTTP status it reports
#[tokio::test]
async fn test_http_invoke_endpoint() {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    let nominatim_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_from_nominatim()))
        .mount(&nominatim_server)
        .await;

    let config = Config {
        nominatim_base_url: nominatim_server.uri(),
        ..Config::default()
    };
    let dispatcher = Arc::new(Dispatcher::from_config(&config).unwrap());

    let event = serde_json::to_vec(&ActionRequest::new(
        paths::CITY_COORDINATES,
        &[("cityName", "Tokyo")],
    ))
    .unwrap();

    let response = web::router(dispatcher.clone())
        .oneshot(
            Request::post("/invoke")
                .header("content-type", "application/json")
                .body(Body::from(event))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope["messageVersion"], "1.0");
    let body: serde_json::Value = serde_json::from_str(
        envelope["response"]["responseBody"]["application/json"]["body"]
            .as_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["country"], "Japan");

    let response = web::router(dispatcher)
        .oneshot(
            Request::post("/invoke")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
