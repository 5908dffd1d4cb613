use crate::app::{AppState, NamespaceQuery};
use crate::error::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rmq_permissions_core::mapper::record_from_resource;
use rmq_permissions_core::{BuildInfo, PermissionRecord};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info};

const UNRESOLVED_NAMESPACE: &str = "unresolved";

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub user: String,
    pub vhost: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> Json<BuildInfo> {
    Json(state.build)
}

pub async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<NamespaceQuery>, QueryRejection>,
) -> Response {
    let audit = Audit::start(&headers, "list");
    let namespace = match state.resolve_namespace(query) {
        Ok(namespace) => namespace,
        Err(err) => return audit.finish(UNRESOLVED_NAMESPACE, Err::<(), _>(err)),
    };

    let result = state.service.list(&namespace).await.map(Json).map_err(ApiError::from);
    audit.finish(&namespace, result)
}

pub async fn upsert_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<NamespaceQuery>, QueryRejection>,
    payload: Result<Json<PermissionRecord>, JsonRejection>,
) -> Response {
    let mut audit = Audit::start(&headers, "upsert");
    let namespace = match state.resolve_namespace(query) {
        Ok(namespace) => namespace,
        Err(err) => return audit.finish(UNRESOLVED_NAMESPACE, Err::<(), _>(err)),
    };
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            return audit.finish(&namespace, Err::<(), _>(ApiError::decode(rejection.body_text())))
        }
    };

    audit.subject(&record.user, &record.vhost);

    let result = state
        .service
        .upsert(&namespace, &record)
        .await
        .map(|outcome| {
            debug!(outcome = %outcome, "upsert done");
            success()
        })
        .map_err(ApiError::from);
    audit.finish(&namespace, result)
}

pub async fn delete_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<NamespaceQuery>, QueryRejection>,
    payload: Result<Json<PermissionRecord>, JsonRejection>,
) -> Response {
    let mut audit = Audit::start(&headers, "delete");
    let namespace = match state.resolve_namespace(query) {
        Ok(namespace) => namespace,
        Err(err) => return audit.finish(UNRESOLVED_NAMESPACE, Err::<(), _>(err)),
    };
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            return audit.finish(&namespace, Err::<(), _>(ApiError::decode(rejection.body_text())))
        }
    };

    audit.subject(&record.user, &record.vhost);

    let result = state
        .service
        .delete(&namespace, &record.user, &record.vhost)
        .await
        .map(|()| success())
        .map_err(ApiError::from);
    audit.finish(&namespace, result)
}

pub async fn lookup_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> Response {
    let mut audit = Audit::start(&headers, "lookup");
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return audit.finish(
                UNRESOLVED_NAMESPACE,
                Err::<(), _>(ApiError::decode(rejection.body_text())),
            )
        }
    };
    audit.subject(&query.user, &query.vhost);
    let namespace = state.namespace_or_default(query.namespace);

    let result = state
        .service
        .get(&namespace, &query.user, &query.vhost)
        .await
        .map(|permission| Json(record_from_resource(&permission)))
        .map_err(ApiError::from);
    audit.finish(&namespace, result)
}

fn success() -> Json<Value> {
    Json(json!({"message": "success"}))
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// One structured audit line per handled request. `user` and `vhost` stay
/// empty for listings and for bodies that failed to decode.
struct Audit {
    request_id: String,
    operation: &'static str,
    user: String,
    vhost: String,
    started: Instant,
}

impl Audit {
    fn start(headers: &HeaderMap, operation: &'static str) -> Self {
        Self {
            request_id: request_id_from_headers(headers),
            operation,
            user: String::new(),
            vhost: String::new(),
            started: Instant::now(),
        }
    }

    fn subject(&mut self, user: &str, vhost: &str) {
        self.user = user.to_string();
        self.vhost = vhost.to_string();
    }

    fn finish<T: IntoResponse>(self, namespace: &str, result: Result<T, ApiError>) -> Response {
        let latency_ms = self.started.elapsed().as_millis() as u64;
        let (status, outcome, error_code, response) = match result {
            Ok(body) => (StatusCode::OK, "success", "", body.into_response()),
            Err(err) => (err.status, "error", err.code, err.into_response()),
        };

        info!(
            event_type = "audit",
            request_id = %self.request_id,
            operation = self.operation,
            namespace,
            user = %self.user,
            vhost = %self.vhost,
            outcome,
            error_code,
            status = %status,
            latency_ms,
            "permission request"
        );

        response
    }
}
