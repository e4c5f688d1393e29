use std::{future::Future, sync::Arc};

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    clients::{database::UserStore, redis::UserCache},
    dispatch::Dispatcher,
    models::{
        health::HealthCheckResponse, message::NotificationRequest, response::ApiResponse,
        user::CreateUser,
    },
};

pub struct GatewayState {
    pub dispatcher: Dispatcher,
}

pub struct UserServiceState {
    pub store: Arc<dyn UserStore>,
    pub cache: Arc<dyn UserCache>,
}

pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/notifications", post(create_notification))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn user_service_router(state: Arc<UserServiceState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(user_service_root))
        .route("/api/v1/users", post(create_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` until `shutdown` resolves, then waits for in-flight requests.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(address = %addr, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!(address = %addr, "HTTP server stopped");

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthCheckResponse::ok()))
}

async fn create_notification(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(request)) => state.dispatcher.dispatch(request).await.into_response(),
        Err(rejection) => invalid_body(rejection),
    }
}

async fn user_service_root() -> impl IntoResponse {
    Json(json!({ "hello": "from user-service" }))
}

async fn create_user(
    State(state): State<Arc<UserServiceState>>,
    body: Result<Json<CreateUser>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    let Some(user) = body.validate() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_with_message(
                "Validation failed",
                "name, email, and password are required",
            )),
        )
            .into_response();
    };

    let record = match state.store.create_user(&user).await {
        Ok(record) => record,
        Err(e) => return internal_error(e),
    };

    if let Err(e) = state.cache.cache_email(record.id, &record.email).await {
        return internal_error(e);
    }

    info!(user_id = record.id, "User created");

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(record, "User created")),
    )
        .into_response()
}

fn invalid_body(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "Rejecting malformed request body");

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error("Invalid request body")),
    )
        .into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    error!(error = %e, "Request failed");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error_with_message(
            "Internal server error",
            e.to_string(),
        )),
    )
        .into_response()
}
