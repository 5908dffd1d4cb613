use crate::error::ApiError;
use crate::handlers;
use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use rmq_permissions_core::{BuildInfo, PermissionService};
use serde::Deserialize;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub const API_PREFIX: &str = "/rmq/v1";
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: PermissionService,
    pub default_namespace: String,
    pub build: BuildInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct NamespaceQuery {
    pub namespace: Option<String>,
}

impl AppState {
    pub fn new(service: PermissionService, default_namespace: impl Into<String>) -> Self {
        let build = BuildInfo::new(
            "rmq-permissions-api",
            env!("CARGO_PKG_VERSION"),
            service.backend_name(),
        );
        Self { service, default_namespace: default_namespace.into(), build }
    }

    pub fn resolve_namespace(
        &self,
        query: Result<Query<NamespaceQuery>, QueryRejection>,
    ) -> Result<String, ApiError> {
        let Query(query) = query.map_err(|rejection| ApiError::decode(rejection.body_text()))?;
        Ok(self.namespace_or_default(query.namespace))
    }

    pub fn namespace_or_default(&self, namespace: Option<String>) -> String {
        namespace
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.default_namespace.clone())
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let permissions = Router::new()
        .route(
            "/permissions",
            get(handlers::list_permissions).post(handlers::upsert_permission),
        )
        .route("/permissions/delete", post(handlers::delete_permission))
        .route("/permissions/lookup", get(handlers::lookup_permission));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest(API_PREFIX, permissions)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TraceLayer::new_for_http()),
        )
}

async fn handle_timeout_error(error: BoxError) -> (StatusCode, &'static str) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}
