use axum::Json;
use axum::extract::State;
use tokio_util::sync::CancellationToken;

use tieline_application::ConnectionFilter;

use crate::dto::{
    ConnectionResponse, ExplainResponse, HealthResponse, QueryConnectionsRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn query_connections_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryConnectionsRequest>,
) -> ApiResult<Json<Vec<ConnectionResponse>>> {
    let filter = ConnectionFilter::from(payload.filter);

    let records = state
        .connection_service
        .resolve_connections(&filter, payload.direction.into(), &CancellationToken::new())
        .await?
        .into_iter()
        .map(ConnectionResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn explain_connections_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryConnectionsRequest>,
) -> ApiResult<Json<ExplainResponse>> {
    let filter = ConnectionFilter::from(payload.filter);

    let statement = state
        .connection_service
        .explain_query(&filter, payload.direction.into())?;

    Ok(Json(ExplainResponse { statement }))
}
