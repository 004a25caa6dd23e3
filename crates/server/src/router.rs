//! Request routing: REST surface to store operations.
//!
//! The route table, with collection names addressed directly in the path:
//!
//! | Method & Path | Operation |
//! |---|---|
//! | GET `/` | welcome banner |
//! | POST `/api/<c>` | create |
//! | GET `/api/<c>` | list (`?limit=&offset=`) |
//! | GET `/api/<c>/<id>` | get by id |
//! | PUT `/api/<c>/<id>` | update |
//! | DELETE `/api/<c>/<id>` | delete |
//! | GET `/api/<c>/price/<min>/<max>` | numeric range over `price` |
//! | GET `/api/search?q=` | substring search over `name` |
//!
//! This is the only place store errors become status codes. Unclassified
//! failures surface as a generic 500; the underlying kind is logged, never
//! leaked.

use crate::http::{Method, Request, Response};
use dynamickv_core::{Error, Fields, Result, Value};
use dynamickv_engine::{query, Store};
use std::sync::Arc;
use tracing::{debug, error};

/// Field scanned by the price-range route
const PRICE_FIELD: &str = "price";
/// Field scanned by the search route
const SEARCH_FIELD: &str = "name";

/// HTTP-facing request router over one store handle
pub struct Gateway {
    store: Arc<Store>,
    search_collection: String,
}

impl Gateway {
    /// Create a gateway; `search_collection` is the collection the
    /// `/api/search` route scans.
    pub fn new(store: Arc<Store>, search_collection: impl Into<String>) -> Self {
        Gateway {
            store,
            search_collection: search_collection.into(),
        }
    }

    /// Handle one request. Never panics, never leaks internal errors.
    pub fn handle(&self, request: &Request) -> Response {
        let response = match self.route(request) {
            Ok(response) => response,
            Err(err) => error_response(&err),
        };
        debug!(
            method = ?request.method,
            path = %request.path,
            status = response.status,
            "handled request"
        );
        response
    }

    fn route(&self, request: &Request) -> Result<Response> {
        let segments = request.path_segments();

        match (&request.method, segments.as_slice()) {
            (Method::Get, []) => Ok(Response::text(200, "Welcome to DynamicKV!")),

            (Method::Get, ["api", "search"]) => self.search(request),

            (Method::Post, ["api", name]) => self.create(name, &request.body),
            (Method::Get, ["api", name]) => self.list(name, request),

            (Method::Get, ["api", name, "price", min, max]) => self.price_range(name, min, max),

            (Method::Get, ["api", name, id]) => self.get(name, id),
            (Method::Put, ["api", name, id]) => self.update(name, id, &request.body),
            (Method::Delete, ["api", name, id]) => self.delete(name, id),

            _ => Ok(Response::message(404, "no such route")),
        }
    }

    fn create(&self, name: &str, body: &[u8]) -> Result<Response> {
        let fields = parse_body(body)?;
        let collection = self.store.collection(name)?;
        let record = collection.create(fields)?;
        Ok(Response::json(201, &record.to_json()))
    }

    fn get(&self, name: &str, id: &str) -> Result<Response> {
        let collection = self.store.collection(name)?;
        match query::by_id(&collection, id) {
            Some(record) => Ok(Response::json(200, &record.to_json())),
            None => Err(Error::not_found(name, id)),
        }
    }

    fn list(&self, name: &str, request: &Request) -> Result<Response> {
        let limit = parse_usize_param(request, "limit")?;
        let offset = parse_usize_param(request, "offset")?;
        let collection = self.store.collection(name)?;
        Ok(records_response(collection.list(limit, offset)))
    }

    fn update(&self, name: &str, id: &str, body: &[u8]) -> Result<Response> {
        let fields = parse_body(body)?;
        let collection = self.store.collection(name)?;
        let record = collection.update(id, fields)?;
        Ok(Response::json(200, &record.to_json()))
    }

    fn delete(&self, name: &str, id: &str) -> Result<Response> {
        let collection = self.store.collection(name)?;
        if collection.delete(id)? {
            Ok(Response::json(200, &serde_json::json!({ "deleted": true })))
        } else {
            Err(Error::not_found(name, id))
        }
    }

    fn price_range(&self, name: &str, min: &str, max: &str) -> Result<Response> {
        let min: f64 = min
            .parse()
            .map_err(|_| Error::validation(format!("price bound '{}' is not numeric", min)))?;
        let max: f64 = max
            .parse()
            .map_err(|_| Error::validation(format!("price bound '{}' is not numeric", max)))?;
        let collection = self.store.collection(name)?;
        let records = query::by_range(&collection, PRICE_FIELD, min, max)?;
        Ok(records_response(records))
    }

    fn search(&self, request: &Request) -> Result<Response> {
        let Some(needle) = request.query_param("q") else {
            return Err(Error::validation("missing search query parameter 'q'"));
        };
        let collection = self.store.collection(&self.search_collection)?;
        let records = query::by_substring(&collection, SEARCH_FIELD, needle);
        Ok(records_response(records))
    }
}

/// Parse a request body as a JSON object into a field map
fn parse_body(body: &[u8]) -> Result<Fields> {
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("invalid JSON body: {}", e)))?;
    let serde_json::Value::Object(map) = json else {
        return Err(Error::validation("request body must be a JSON object"));
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| (name, Value::from(value)))
        .collect())
}

fn parse_usize_param(request: &Request, name: &str) -> Result<Option<usize>> {
    match request.query_param(name) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            Error::validation(format!("query parameter '{}' must be a non-negative integer", name))
        }),
    }
}

fn records_response(records: Vec<dynamickv_core::Record>) -> Response {
    let body: Vec<serde_json::Value> = records.iter().map(|r| r.to_json()).collect();
    Response::json(200, &serde_json::Value::Array(body))
}

/// Translate a typed store error into a status + error body.
fn error_response(err: &Error) -> Response {
    match err {
        Error::NotFound { .. } => Response::message(404, &err.to_string()),
        Error::Validation(_) => Response::message(400, &err.to_string()),
        // Codec failures on the request path mean the caller sent
        // something the store cannot represent
        Error::Encode(_) | Error::Decode(_) => Response::message(400, &err.to_string()),
        Error::Storage(_) | Error::Corruption(_) | Error::Io(_) => {
            error!(error = %err, "internal error while handling request");
            Response::message(500, "internal server error")
        }
    }
}
