use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use orchard_core::{ItemHandler, ItemStore, JsonFileStore, MemoryStore, Rejection};
use orchard_types::{Item, ItemPayload};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{auth::BearerToken, config::ServerConfig};

#[derive(Clone)]
pub struct AppState {
    pub handler: ItemHandler,
}

/// Build the HTTP router around an already-wired handler.
pub fn router(handler: ItemHandler) -> Router {
    Router::new()
        // Public endpoints (no auth required)
        .route("/healthz", get(healthz))
        .route("/api/v1/items", get(list_items).post(create_item))
        // Owner-only endpoints
        .route("/api/v1/items/{id}", put(update_item).delete(delete_item))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { handler })
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn ItemStore> = match &config.data_file {
        Some(path) => Arc::new(
            JsonFileStore::open(path)
                .await
                .with_context(|| format!("failed to open item store at {}", path.display()))?,
        ),
        None => {
            info!("no data file configured, items are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let resolver = config.auth.build_resolver();
    if !resolver.has_key() {
        warn!("no auth secret configured, all mutations will be rejected as unauthenticated");
    }

    let app = router(ItemHandler::new(store, Arc::new(resolver)));

    info!(addr = %config.listen_addr, "orchard listening");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("orchard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Request body for create and update: `{"item": {...}}`
#[derive(Deserialize)]
struct ItemEnvelope {
    item: Option<ItemPayload>,
}

#[derive(Serialize)]
struct ItemResponse {
    item: Item,
}

#[derive(Serialize)]
struct ItemsResponse {
    items: Vec<Item>,
}

/// A body that is absent, not JSON, or shaped wrong carries no payload.
fn decode_payload(body: &[u8]) -> Option<ItemPayload> {
    serde_json::from_slice::<ItemEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.item)
}

async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.handler.list().await?;
    Ok(Json(ItemsResponse { items }))
}

async fn create_item(
    State(state): State<AppState>,
    token: BearerToken,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .handler
        .create(decode_payload(&body), token.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

async fn update_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
    token: BearerToken,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .handler
        .update(&id, decode_payload(&body), token.as_deref())
        .await?;
    Ok(Json(ItemResponse { item }))
}

async fn delete_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    state.handler.delete(&id, token.as_deref()).await?;
    Ok(StatusCode::OK)
}

/// HTTP face of a [`Rejection`]. Bodies are fixed strings so internal
/// detail never reaches the caller.
#[derive(Debug)]
pub struct ApiError(pub Rejection);

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Rejection::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request").into_response(),
            Rejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Rejection::Forbidden(_) => (
                StatusCode::FORBIDDEN,
                "Unauthorized: Only the user who added the item may change it",
            )
                .into_response(),
            Rejection::NotFound(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Rejection::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        let payload = decode_payload(br#"{"item": {"name": "apple", "colour": "red"}}"#).unwrap();
        assert_eq!(payload.name, "apple");
        assert_eq!(payload.attributes["colour"], "red");

        assert!(decode_payload(b"").is_none());
        assert!(decode_payload(b"not json").is_none());
        assert!(decode_payload(br#"{"fruit": {"name": "apple"}}"#).is_none());
        assert!(decode_payload(br#"{"item": {"description": "no name"}}"#).is_none());
    }

    #[test]
    fn test_rejection_status_codes() {
        let cases = [
            (Rejection::BadRequest("x"), StatusCode::BAD_REQUEST),
            (Rejection::Unauthenticated, StatusCode::UNAUTHORIZED),
            (Rejection::Forbidden(1.into()), StatusCode::FORBIDDEN),
            (Rejection::NotFound(1.into()), StatusCode::NOT_FOUND),
            (Rejection::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (rejection, status) in cases {
            assert_eq!(ApiError(rejection).into_response().status(), status);
        }
    }
}
