use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::AppState;
use crate::{
    models::{Location, LocationPayload},
    services::location::ServiceError,
};

/// Content types `/add` and `/update` will parse; anything else gets `{}`
const ACCEPTED_CONTENT_TYPES: [&str; 3] = [
    "application/json",
    "application/json; charset=utf-8",
    "text/plain",
];

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Every handler answers 200; failures are reported as an empty object
fn empty_object() -> Response {
    Json(serde_json::json!({})).into_response()
}

fn found(location: Option<Location>) -> Response {
    match location {
        Some(location) => Json(location).into_response(),
        None => empty_object(),
    }
}

fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Option<LocationPayload> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    if !content_type.is_some_and(|ct| ACCEPTED_CONTENT_TYPES.contains(&ct)) {
        debug!("Ignoring body with content type {:?}", content_type);
        return None;
    }

    match serde_json::from_slice(body) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Unreadable location payload: {}", e);
            None
        }
    }
}

/// GET /locations
pub async fn list(State(service): State<AppState>) -> Response {
    match service.list().await {
        Ok(locations) => Json(locations).into_response(),
        Err(e) => {
            error!("Failed to list locations: {}", e);
            Json(Vec::<Location>::new()).into_response()
        }
    }
}

/// GET /location?name=... or GET /location?latitude=...&longitude=...
pub async fn find(
    State(service): State<AppState>,
    query: Option<Query<LocationQuery>>,
) -> Response {
    let Some(Query(query)) = query else {
        return empty_object();
    };

    let result = match (query.name, query.latitude, query.longitude) {
        (Some(name), _, _) => service.get(&name).await,
        (None, Some(latitude), Some(longitude)) => service.find_at(latitude, longitude).await,
        _ => return empty_object(),
    };

    match result {
        Ok(location) => found(location),
        Err(e) => {
            error!("Location lookup failed: {}", e);
            empty_object()
        }
    }
}

/// POST /add
pub async fn add(State(service): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(payload) = parse_payload(&headers, &body) else {
        return empty_object();
    };

    match service.add(payload).await {
        Ok(location) => Json(location).into_response(),
        Err(e) => {
            error!("Failed to add location: {}", e);
            empty_object()
        }
    }
}

/// PUT /update
pub async fn update(State(service): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(payload) = parse_payload(&headers, &body) else {
        return empty_object();
    };

    match service.update(payload).await {
        Ok(location) => Json(location).into_response(),
        Err(ServiceError::NotFound(name)) => {
            warn!("Update for unknown location {:?}", name);
            empty_object()
        }
        Err(e) => {
            error!("Failed to update location: {}", e);
            empty_object()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    const BODY: &[u8] = br#"{"name":"home","latitude":1.5,"longitude":2.5}"#;

    #[test]
    fn test_accepted_content_types() {
        for content_type in ACCEPTED_CONTENT_TYPES {
            let payload = parse_payload(&headers(content_type), BODY).unwrap();
            assert_eq!(payload.name, "home");
        }
    }

    #[test]
    fn test_other_content_types_rejected() {
        assert!(parse_payload(&headers("application/xml"), BODY).is_none());
        assert!(parse_payload(&headers("application/json;charset=UTF-8"), BODY).is_none());
        assert!(parse_payload(&HeaderMap::new(), BODY).is_none());
    }

    #[test]
    fn test_malformed_body_rejected() {
        assert!(parse_payload(&headers("application/json"), b"{not json").is_none());
        assert!(parse_payload(&headers("text/plain"), b"plain words").is_none());
    }
}
