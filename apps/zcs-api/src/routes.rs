use axum::{
	Json, Router,
	extract::{Path, Request, State},
	http::{StatusCode, header},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde::Serialize;

use crate::state::AppState;
use zcs_domain::cluster::ClusterHealthSnapshot;
use zcs_service::{
	Error as ServiceError, IndexedNamespaceItem, MigrationStatusItem, NamespaceAssignRequest,
	NodeItem, SearchBlobsRequest, SearchBlobsResponse, TriggerIndexResponse,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search/blobs", post(search_blobs))
		.with_state(state)
}

/// Every admin route sits behind the bearer token.
pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/zoekt/projects/{project_id}/index", put(trigger_project_index))
		.route("/v1/admin/zoekt/nodes", get(list_nodes))
		.route("/v1/admin/zoekt/nodes/{node_id}/indexed_namespaces", get(indexed_namespaces))
		.route(
			"/v1/admin/zoekt/nodes/{node_id}/indexed_namespaces/{namespace_id}",
			put(assign_namespace).delete(unassign_namespace),
		)
		.route("/v1/admin/search/migrations", get(migration_statuses))
		.route("/v1/admin/search/cluster", get(cluster_snapshot))
		.layer(middleware::from_fn_with_state(state.clone(), require_admin_token))
		.with_state(state)
}

async fn require_admin_token(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let expected = state.service.cfg.security.admin_auth_token.as_deref();
	let provided = req
		.headers()
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));

	match (expected, provided) {
		(Some(expected), Some(provided)) if expected == provided => Ok(next.run(req).await),
		_ => Err(json_error(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"A valid admin bearer token is required.",
			None,
		)),
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search_blobs(
	State(state): State<AppState>,
	Json(payload): Json<SearchBlobsRequest>,
) -> Result<Json<SearchBlobsResponse>, ApiError> {
	let response = state.service.search_blobs(payload).await?;

	Ok(Json(response))
}

async fn trigger_project_index(
	State(state): State<AppState>,
	Path(project_id): Path<i64>,
) -> Result<Json<TriggerIndexResponse>, ApiError> {
	let response = state.service.trigger_project_index(project_id).await?;

	Ok(Json(response))
}

async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<NodeItem>>, ApiError> {
	let response = state.service.list_nodes().await?;

	Ok(Json(response))
}

async fn indexed_namespaces(
	State(state): State<AppState>,
	Path(node_id): Path<i64>,
) -> Result<Json<Vec<IndexedNamespaceItem>>, ApiError> {
	let response = state.service.indexed_namespaces(node_id).await?;

	Ok(Json(response))
}

async fn assign_namespace(
	State(state): State<AppState>,
	Path((node_id, namespace_id)): Path<(i64, i64)>,
	payload: Option<Json<NamespaceAssignRequest>>,
) -> Result<Json<IndexedNamespaceItem>, ApiError> {
	let req = payload.map(|Json(req)| req).unwrap_or_default();
	let response = state.service.assign_namespace(node_id, namespace_id, req).await?;

	Ok(Json(response))
}

async fn unassign_namespace(
	State(state): State<AppState>,
	Path((node_id, namespace_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
	state.service.unassign_namespace(node_id, namespace_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn migration_statuses(
	State(state): State<AppState>,
) -> Result<Json<Vec<MigrationStatusItem>>, ApiError> {
	let response = state.service.migration_statuses().await?;

	Ok(Json(response))
}

async fn cluster_snapshot(
	State(state): State<AppState>,
) -> Result<Json<ClusterHealthSnapshot>, ApiError> {
	let response = state.service.cluster_snapshot().await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			ServiceError::FeatureDisabled { message } =>
				json_error(StatusCode::BAD_REQUEST, "feature_disabled", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message, None),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message, None)
			},
			ServiceError::Remote { message } =>
				json_error(StatusCode::BAD_GATEWAY, "remote_error", message, None),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
