use axum::body::Body;
use axum::http::Request;
use axum::routing::RouterIntoService;
use rmq_permissions_api::{build_router, AppState};
use rmq_permissions_core::{
    Access, InMemoryAccessor, PermissionAccessor, PermissionRecord, PermissionService,
    ResourceMapper,
};
use std::sync::Arc;
use std::time::Duration;

pub const NAMESPACE: &str = "default";
pub const CLUSTER_REF: &str = "rabbitmqcluster-sample";

pub async fn seeded_app(
    pairs: &[(&str, &str)],
) -> (Arc<InMemoryAccessor>, RouterIntoService<Body>) {
    let accessor = Arc::new(InMemoryAccessor::new());
    let mapper = ResourceMapper::new(CLUSTER_REF);

    for (user, vhost) in pairs {
        let record = PermissionRecord::new(user, vhost, Access::new("*", "*", "*"));
        accessor.create(NAMESPACE, &mapper.to_resource(NAMESPACE, &record)).await.expect("seed");
    }

    let service = PermissionService::new(accessor.clone(), mapper);
    let app = build_router(AppState::new(service, NAMESPACE), Duration::from_secs(5));
    (accessor, app.into_service())
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn raw_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
