//! Service-account signing: Firebase custom tokens and OAuth JWT-bearer assertions.
//!
//! Custom tokens are RS256 JWTs signed locally with the service-account key, so minting never
//! touches the network. The same key signs the assertions the platform token source trades for
//! admin access tokens.

// std
use std::{fs, path::Path};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{CustomToken, LocalUid},
	error::{ConfigError, PlatformError},
	platform::PlatformFuture,
};

/// Audience every Firebase custom token must carry.
pub const CUSTOM_TOKEN_AUDIENCE: &str =
	"https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";
/// Lifetime of minted custom tokens; Firebase rejects anything longer than an hour.
pub const CUSTOM_TOKEN_TTL: Duration = Duration::hours(1);
/// Lifetime requested for JWT-bearer assertions.
pub const ASSERTION_TTL: Duration = Duration::hours(1);

/// Claims Firebase reserves for itself; developer claims may not reuse them.
const RESERVED_CLAIMS: &[&str] = &[
	"acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
	"iat", "iss", "jti", "nbf", "nonce", "sub",
];

/// Issues sign-in credentials bound to a local uid.
pub trait CredentialMinter
where
	Self: Send + Sync,
{
	/// Mints a credential the client SDK can redeem for a session as `uid`.
	fn mint<'a>(&'a self, uid: &'a LocalUid) -> PlatformFuture<'a, CustomToken>;
}

/// Fields read from a Google service-account JSON key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
	/// Project the key belongs to.
	pub project_id: String,
	/// Service-account email; issuer of every token this key signs.
	pub client_email: String,
	/// PEM-encoded RSA private key.
	pub private_key: String,
	/// Key identifier placed in the JWT header.
	#[serde(default)]
	pub private_key_id: Option<String>,
	/// OAuth token endpoint used for JWT-bearer exchanges.
	pub token_uri: Url,
}
impl ServiceAccountKey {
	/// Parses a service-account key from JSON bytes.
	pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de).map_err(ConfigError::ServiceAccountParse)
	}

	/// Reads and parses a service-account key file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let bytes = fs::read(path).map_err(|source| ConfigError::ServiceAccountRead {
			path: path.display().to_string(),
			source,
		})?;

		Self::from_json(&bytes)
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("project_id", &self.project_id)
			.field("client_email", &self.client_email)
			.field("private_key", &"<redacted>")
			.field("private_key_id", &self.private_key_id)
			.field("token_uri", &self.token_uri.as_str())
			.finish()
	}
}

#[derive(Serialize)]
struct CustomTokenClaims<'a> {
	iss: &'a str,
	sub: &'a str,
	aud: &'a str,
	iat: i64,
	exp: i64,
	uid: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	claims: Option<&'a Map<String, Value>>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
	iss: &'a str,
	scope: &'a str,
	aud: &'a str,
	iat: i64,
	exp: i64,
}

/// RS256 signer backed by a service-account key.
#[derive(Clone)]
pub struct ServiceAccountSigner {
	client_email: String,
	key_id: Option<String>,
	encoding_key: EncodingKey,
}
impl ServiceAccountSigner {
	/// Parses the key's PEM; fails at startup rather than on the first request.
	pub fn new(key: &ServiceAccountKey) -> Result<Self, ConfigError> {
		let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
			.map_err(ConfigError::InvalidPrivateKey)?;

		Ok(Self {
			client_email: key.client_email.clone(),
			key_id: key.private_key_id.clone(),
			encoding_key,
		})
	}

	/// Service-account email used as issuer.
	pub fn client_email(&self) -> &str {
		&self.client_email
	}

	/// Signs a custom token for `uid` issued at `now`, optionally carrying developer claims.
	pub fn custom_token_at(
		&self,
		uid: &LocalUid,
		developer_claims: Option<&Map<String, Value>>,
		now: OffsetDateTime,
	) -> Result<CustomToken, PlatformError> {
		let reserved = developer_claims
			.and_then(|claims| claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())));

		if let Some(reserved) = reserved {
			return Err(PlatformError::Backend {
				message: format!("developer claim `{reserved}` is reserved"),
			});
		}

		let iat = now.unix_timestamp();
		let claims = CustomTokenClaims {
			iss: &self.client_email,
			sub: &self.client_email,
			aud: CUSTOM_TOKEN_AUDIENCE,
			iat,
			exp: iat + CUSTOM_TOKEN_TTL.whole_seconds(),
			uid: uid.as_ref(),
			claims: developer_claims.filter(|c| !c.is_empty()),
		};

		self.sign("custom token", &claims).map(CustomToken::new)
	}

	/// Signs an OAuth JWT-bearer assertion for `scope`, addressed to `token_uri`.
	pub fn assertion_at(
		&self,
		scope: &str,
		token_uri: &Url,
		now: OffsetDateTime,
	) -> Result<String, PlatformError> {
		let iat = now.unix_timestamp();
		let claims = AssertionClaims {
			iss: &self.client_email,
			scope,
			aud: token_uri.as_str(),
			iat,
			exp: iat + ASSERTION_TTL.whole_seconds(),
		};

		self.sign("service account assertion", &claims)
	}

	fn sign<T>(&self, purpose: &'static str, claims: &T) -> Result<String, PlatformError>
	where
		T: Serialize,
	{
		let mut header = Header::new(Algorithm::RS256);

		header.kid = self.key_id.clone();

		jsonwebtoken::encode(&header, claims, &self.encoding_key)
			.map_err(|source| PlatformError::Signing { purpose, source })
	}
}
impl CredentialMinter for ServiceAccountSigner {
	fn mint<'a>(&'a self, uid: &'a LocalUid) -> PlatformFuture<'a, CustomToken> {
		Box::pin(async move { self.custom_token_at(uid, None, OffsetDateTime::now_utc()) })
	}
}
impl Debug for ServiceAccountSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountSigner")
			.field("client_email", &self.client_email)
			.field("key_id", &self.key_id)
			.finish_non_exhaustive()
	}
}
