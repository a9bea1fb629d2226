//! HTTP boundary: request parsing, status mapping, and the listener loop.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::{State, rejection::BytesRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde_json::Value;
use tokio::{net::TcpListener, signal};
// self
use crate::{_prelude::*, auth::AccessToken, exchange::Exchanger};

/// Exchange route.
pub const VERIFY_TOKEN_PATH: &str = "/verifyToken";
/// Body returned when the request carries no token.
pub const MISSING_TOKEN_MESSAGE: &str = "Access Token not found";
/// Body returned for every pipeline failure.
pub const EXCHANGE_FAILED_MESSAGE: &str = "Authentication error: Cannot verify access token.";

/// Successful exchange body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResponse {
	/// Custom token for the client SDK.
	pub firebase_token: String,
}

/// Failure body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Human-readable failure summary.
	pub error_message: String,
}

/// Health check body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
	/// Service name.
	pub name: String,
	/// Always `ok` while the process serves requests.
	pub status: String,
}

/// Builds the service router.
pub fn router(exchanger: Arc<Exchanger>) -> Router {
	Router::new()
		.route("/", get(health))
		.route(VERIFY_TOKEN_PATH, post(verify_token))
		.with_state(exchanger)
}

/// Serves the router on `addr` until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, exchanger: Arc<Exchanger>) -> std::io::Result<()> {
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "listening");

	axum::serve(listener, router(exchanger)).with_graceful_shutdown(shutdown_signal()).await
}

async fn health() -> Json<HealthResponse> {
	Json(HealthResponse { name: env!("CARGO_PKG_NAME").into(), status: "ok".into() })
}

async fn verify_token(
	State(exchanger): State<Arc<Exchanger>>,
	body: Result<Bytes, BytesRejection>,
) -> Response {
	// Unreadable or oversized bodies carry no usable token.
	let body = match body {
		Ok(body) => body,
		Err(e) => {
			tracing::debug!(error = %e, "request body rejected");

			return reject(StatusCode::BAD_REQUEST, MISSING_TOKEN_MESSAGE);
		},
	};
	let Some(token) = extract_token(&body) else {
		return reject(StatusCode::BAD_REQUEST, MISSING_TOKEN_MESSAGE);
	};

	match exchanger.exchange(&token).await {
		Ok(outcome) => {
			tracing::info!(uid = %outcome.user.uid, created = outcome.created, "token exchanged");

			let body =
				ExchangeResponse { firebase_token: outcome.credential.expose().to_owned() };

			(StatusCode::OK, Json(body)).into_response()
		},
		Err(Error::MissingInput) => reject(StatusCode::BAD_REQUEST, MISSING_TOKEN_MESSAGE),
		Err(e) => {
			tracing::error!(error = %e, detail = ?e, "token exchange failed");

			reject(StatusCode::FORBIDDEN, EXCHANGE_FAILED_MESSAGE)
		},
	}
}

/// Returns the non-empty `token` string of a JSON object body.
fn extract_token(body: &[u8]) -> Option<AccessToken> {
	let value = serde_json::from_slice::<Value>(body).ok()?;
	let token = value.as_object()?.get("token")?.as_str()?;

	if token.is_empty() {
		return None;
	}

	Some(AccessToken::new(token))
}

fn reject(status: StatusCode, message: &str) -> Response {
	(status, Json(ErrorResponse { error_message: message.into() })).into_response()
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to install Ctrl-C handler");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			},
			Err(e) => {
				tracing::error!(error = %e, "failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("shutdown signal received, draining connections");
}
