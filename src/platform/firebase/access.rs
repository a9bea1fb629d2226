//! Admin access tokens for Identity Toolkit calls.
//!
//! [`ServiceAccountTokenSource`] trades a signed JWT-bearer assertion for a Google OAuth access
//! token and caches it until it enters the preemptive refresh window. Refreshes are single-flight:
//! concurrent callers wait on one async lock and reuse the token it produces.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	credential::{ServiceAccountKey, ServiceAccountSigner},
	error::{ConfigError, PlatformError},
	http::ReqwestHttpClient,
	platform::PlatformFuture,
};

/// OAuth grant used to exchange a signed assertion for an access token.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Scopes requested for Identity Toolkit admin calls.
pub const ADMIN_SCOPES: &str =
	"https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/identitytoolkit";

const ACCESS_TOKEN: &str = "access_token";

/// Supplies bearer tokens for identity-platform admin calls.
pub trait AccessTokenSource
where
	Self: Send + Sync,
{
	/// Returns a token valid for at least the next request.
	fn access_token(&self) -> PlatformFuture<'_, TokenSecret>;
}

/// Always returns the same token; used for the Auth emulator.
#[derive(Clone, Debug)]
pub struct StaticTokenSource(TokenSecret);
impl StaticTokenSource {
	/// Wraps a fixed bearer token.
	pub fn new(token: impl Into<String>) -> Self {
		Self(TokenSecret::new(token))
	}
}
impl AccessTokenSource for StaticTokenSource {
	fn access_token(&self) -> PlatformFuture<'_, TokenSecret> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: TokenSecret,
	expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

#[derive(Clone, Debug)]
struct CachedToken {
	secret: TokenSecret,
	expires_at: OffsetDateTime,
}

/// Caching JWT-bearer token source backed by a service-account key.
#[derive(Debug)]
pub struct ServiceAccountTokenSource {
	signer: ServiceAccountSigner,
	token_uri: Url,
	scope: String,
	http: ReqwestHttpClient,
	preemptive_window: Duration,
	cached: Mutex<Option<CachedToken>>,
	refresh: AsyncMutex<()>,
}
impl ServiceAccountTokenSource {
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Creates a source for `key`, requesting [`ADMIN_SCOPES`].
	pub fn new(key: &ServiceAccountKey, http: ReqwestHttpClient) -> Result<Self, ConfigError> {
		Ok(Self {
			signer: ServiceAccountSigner::new(key)?,
			token_uri: key.token_uri.clone(),
			scope: ADMIN_SCOPES.into(),
			http,
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
			cached: Mutex::new(None),
			refresh: AsyncMutex::new(()),
		})
	}

	/// Overrides how long before expiry a cached token is considered stale (defaults to 60 s).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	fn fresh(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.cached
			.lock()
			.as_ref()
			.filter(|cached| cached.expires_at - now > self.preemptive_window)
			.map(|cached| cached.secret.clone())
	}

	async fn fetch(&self) -> Result<TokenSecret, PlatformError> {
		if let Some(token) = self.fresh(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.refresh.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = self.fresh(now) {
			return Ok(token);
		}

		let assertion = self.signer.assertion_at(&self.scope, &self.token_uri, now)?;
		let reply = self
			.http
			.post_form(
				&self.token_uri,
				&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
			)
			.await
			.map_err(|source| PlatformError::Transport { operation: ACCESS_TOKEN, source })?;

		if !reply.is_success() {
			let message = serde_json::from_slice::<TokenErrorResponse>(&reply.body)
				.map(|e| match e.error_description {
					Some(description) => format!("{}: {description}", e.error),
					None => e.error,
				})
				.unwrap_or_else(|_| reply.body_preview());

			return Err(PlatformError::Status {
				operation: ACCESS_TOKEN,
				status: reply.status,
				message,
			});
		}

		let response: TokenResponse = reply.json().map_err(|source| {
			PlatformError::MalformedResponse { operation: ACCESS_TOKEN, source }
		})?;
		let expires_at = now + Duration::seconds(response.expires_in.max(0));

		tracing::debug!(expires_at = %expires_at, "refreshed identity platform access token");

		*self.cached.lock() =
			Some(CachedToken { secret: response.access_token.clone(), expires_at });

		Ok(response.access_token)
	}
}
impl AccessTokenSource for ServiceAccountTokenSource {
	fn access_token(&self) -> PlatformFuture<'_, TokenSecret> {
		Box::pin(self.fetch())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::TEST_SERVICE_ACCOUNT_JSON, platform::firebase::EMULATOR_ADMIN_TOKEN};

	fn source() -> ServiceAccountTokenSource {
		let key = ServiceAccountKey::from_json(TEST_SERVICE_ACCOUNT_JSON.as_bytes())
			.expect("Fixture service account should parse.");

		ServiceAccountTokenSource::new(&key, ReqwestHttpClient::default())
			.expect("Fixture key should build a token source.")
	}

	#[test]
	fn cached_token_respects_preemptive_window() {
		let source = source();
		let now = OffsetDateTime::now_utc();

		*source.cached.lock() = Some(CachedToken {
			secret: TokenSecret::new("cached"),
			expires_at: now + Duration::seconds(30),
		});

		assert!(source.fresh(now).is_none(), "Tokens inside the window must be refreshed.");

		*source.cached.lock() = Some(CachedToken {
			secret: TokenSecret::new("cached"),
			expires_at: now + Duration::minutes(30),
		});

		assert_eq!(source.fresh(now).map(|t| t.expose().to_owned()), Some("cached".into()));
	}

	#[test]
	fn negative_window_is_clamped() {
		let source = source().with_preemptive_window(Duration::seconds(-5));

		assert_eq!(source.preemptive_window, Duration::ZERO);
	}

	#[tokio::test]
	async fn static_source_returns_fixed_token() {
		let token = StaticTokenSource::new(EMULATOR_ADMIN_TOKEN)
			.access_token()
			.await
			.expect("Static source never fails.");

		assert_eq!(token.expose(), EMULATOR_ADMIN_TOKEN);
	}
}
