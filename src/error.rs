//! Exchange-level error types shared across the verifier, identity mapper, and minter.

// self
use crate::_prelude::*;

/// Exchange-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical exchange error exposed by public APIs.
///
/// Every variant except [`Error::MissingInput`] collapses to the same generic rejection at the
/// HTTP boundary; the variants exist so the server can log what actually happened.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request did not carry an access token.
	#[error("Request is missing the access token.")]
	MissingInput,
	/// Provider rejected the token, could not be reached, or answered with garbage.
	#[error("Provider could not verify the access token.")]
	InvalidToken(
		#[from]
		#[source]
		ProviderError,
	),
	/// Token was issued for a different channel than the one this deployment serves.
	#[error("Token audience `{actual}` does not match the configured channel `{expected}`.")]
	AudienceMismatch {
		/// Configured channel identifier.
		expected: String,
		/// Channel identifier reported by the provider.
		actual: String,
	},
	/// Identity platform lookup, creation, or credential signing failed.
	#[error("Identity platform request failed.")]
	UpstreamUserStore(
		#[from]
		#[source]
		PlatformError,
	),
}

/// Failures raised while talking to the identity provider (verification or profile).
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Network, TLS, or timeout failure.
	#[error("Provider {endpoint} endpoint is unreachable.")]
	Transport {
		/// Endpoint label (`verify` or `profile`).
		endpoint: &'static str,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
	/// Provider answered with a non-success status.
	#[error("Provider {endpoint} endpoint returned HTTP {status}: {body}.")]
	Rejected {
		/// Endpoint label (`verify` or `profile`).
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Provider answered with JSON that does not match the expected shape.
	#[error("Provider {endpoint} endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Endpoint label (`verify` or `profile`).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider subject identifier cannot be turned into a local uid.
	#[error("Provider subject cannot be mapped to a local uid.")]
	InvalidSubject(#[from] crate::auth::IdentifierError),
}

/// Failures raised by the identity platform (user directory, admin auth, token signing).
#[derive(Debug, ThisError)]
pub enum PlatformError {
	/// Network, TLS, or timeout failure.
	#[error("Identity platform is unreachable during {operation}.")]
	Transport {
		/// Operation label (`lookup`, `create`, `access_token`).
		operation: &'static str,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
	/// Platform answered with a non-success status.
	#[error("Identity platform returned HTTP {status} during {operation}: {message}.")]
	Status {
		/// Operation label (`lookup`, `create`, `access_token`).
		operation: &'static str,
		/// HTTP status code.
		status: u16,
		/// Platform error message or truncated body.
		message: String,
	},
	/// Platform answered with JSON that does not match the expected shape.
	#[error("Identity platform returned malformed JSON during {operation}.")]
	MalformedResponse {
		/// Operation label (`lookup`, `create`, `access_token`).
		operation: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A user with the same uid already exists.
	#[error("User `{uid}` already exists.")]
	UserAlreadyExists {
		/// Conflicting uid.
		uid: String,
	},
	/// JWT signing failed (custom token or service-account assertion).
	#[error("Failed to sign {purpose}.")]
	Signing {
		/// What was being signed.
		purpose: &'static str,
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Backend-level failure reported by a non-HTTP directory implementation.
	#[error("Directory backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Configuration and validation failures raised before the service starts.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting is absent.
	#[error("Required setting `{name}` is not set.")]
	Missing {
		/// Setting (environment variable) name.
		name: &'static str,
	},
	/// A setting is present but cannot be used.
	#[error("Setting `{name}` is invalid: {reason}.")]
	Invalid {
		/// Setting (environment variable) name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Service-account key file cannot be read.
	#[error("Service account key `{path}` cannot be read.")]
	ServiceAccountRead {
		/// Key file path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Service-account key file is not valid JSON.
	#[error("Service account key is malformed.")]
	ServiceAccountParse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Service-account private key is not a usable RSA PEM.
	#[error("Service account private key is not a valid RSA PEM.")]
	InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
		Self::Invalid { name, reason: reason.into() }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Outbound call did not finish within the configured timeout.
	#[error("Outbound request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred during the outbound request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

/// Failures that stop the binary before or while serving.
#[derive(Debug, ThisError)]
pub enum StartupError {
	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Listener could not be bound or the server loop failed.
	#[error("Server I/O failure.")]
	Io(#[from] std::io::Error),
}
