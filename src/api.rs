//! The management REST surface. Handlers funnel through one mutex around
//! the engine; the order requests take the lock is the order their edits
//! are observed in the kernel.

use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::nat::SnatRule;
use crate::policy::Policy;
use crate::{iface, Error, Firewall, InterfaceInfo};

pub type SharedFirewall = Arc<Mutex<Firewall>>;

/// Builds the `/api/v1` router over a shared engine.
pub fn router(firewall: SharedFirewall) -> axum::Router {
    axum::Router::new()
        .route("/api/v1/interfaces", get(get_interfaces))
        .route("/api/v1/policies", get(get_policies).post(post_policy))
        .route("/api/v1/policies/:id", put(put_policy).delete(delete_policy))
        .route("/api/v1/nat", get(get_nat).post(post_nat))
        .route("/api/v1/nat/:id", delete(delete_nat))
        .route("/api/v1/export", get(get_export))
        .route("/api/v1/connections", get(get_connections))
        .with_state(firewall)
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "ok": false, "message": self.1 }));
        (self.0, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::InvalidRange(_)
            | Error::InvalidProtocolFamily(_)
            | Error::UnknownIpset(_)
            | Error::UnknownZone(_)
            | Error::UnknownInterface(_)
            | Error::Builder(_) => StatusCode::BAD_REQUEST,
            Error::EntryNotFound(_) => StatusCode::NOT_FOUND,
            Error::SnatTargetUnimplemented | Error::DnatUnimplemented => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Kernel(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

fn lock(firewall: &SharedFirewall) -> MutexGuard<'_, Firewall> {
    firewall.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn ok() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

#[derive(Deserialize)]
struct BeforeQuery {
    before: Option<u64>,
}

async fn get_interfaces(
    State(firewall): State<SharedFirewall>,
) -> Result<Json<Vec<InterfaceInfo>>, ApiError> {
    let mut interfaces = iface::list_interfaces()
        .map_err(|err| ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    let firewall = lock(&firewall);
    for info in &mut interfaces {
        info.zone = firewall.zones().zone_of(&info.name).map(str::to_string);
    }

    Ok(Json(interfaces))
}

async fn get_policies(State(firewall): State<SharedFirewall>) -> Json<Vec<Policy>> {
    Json(lock(&firewall).policies().to_vec())
}

async fn post_policy(
    State(firewall): State<SharedFirewall>,
    Query(query): Query<BeforeQuery>,
    Json(policy): Json<Policy>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut firewall = lock(&firewall);
    let id = match query.before {
        Some(before) => firewall.insert_policy_before(policy, before)?,
        None => firewall.append_policy(policy)?,
    };
    Ok(Json(json!({ "ok": true, "id": id })))
}

async fn put_policy(
    State(firewall): State<SharedFirewall>,
    Path(id): Path<u64>,
    Query(query): Query<BeforeQuery>,
    Json(mut policy): Json<Policy>,
) -> Result<Json<serde_json::Value>, ApiError> {
    policy.id = id;
    lock(&firewall).update_policy(policy, query.before)?;
    Ok(ok())
}

async fn delete_policy(
    State(firewall): State<SharedFirewall>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    lock(&firewall).remove_policy(id)?;
    Ok(ok())
}

async fn get_nat(State(firewall): State<SharedFirewall>) -> Json<Vec<SnatRule>> {
    Json(lock(&firewall).snat_rules().to_vec())
}

async fn post_nat(
    State(firewall): State<SharedFirewall>,
    Json(rule): Json<SnatRule>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = lock(&firewall).append_snat_rule(rule)?;
    Ok(Json(json!({ "ok": true, "id": id })))
}

async fn delete_nat(
    State(firewall): State<SharedFirewall>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    lock(&firewall).remove_snat_rule(id)?;
    Ok(ok())
}

/// Dumps the live ruleset as the `nft` tool reports it.
async fn get_export() -> Result<Json<serde_json::Value>, ApiError> {
    let output = Command::new("nft")
        .args(&["--json", "list", "ruleset"])
        .output()
        .map_err(|err| ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    if !output.status.success() {
        return Err(ApiError(
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    let ruleset: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|err| ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(ruleset))
}

async fn get_connections() -> Result<Json<serde_json::Value>, ApiError> {
    let raw = std::fs::read_to_string("/proc/net/nf_conntrack")
        .map_err(|err| ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(json!({ "raw": raw })))
}
