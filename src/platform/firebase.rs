//! Firebase Authentication directory backed by the Identity Toolkit REST API.
//!
//! Lookups call `accounts:lookup` and treat a response without `users` as "not found"; creates
//! call `accounts` and classify `DUPLICATE_LOCAL_ID` as [`PlatformError::UserAlreadyExists`].
//! Requests authenticate with an admin access token from an [`AccessTokenSource`]. Pointing the
//! directory at the Auth emulator swaps the base URL and uses the emulator's static token.

pub mod access;

pub use access::*;

// self
use crate::{
	_prelude::*,
	auth::LocalUid,
	error::{ConfigError, PlatformError},
	http::{HttpReply, ReqwestHttpClient},
	platform::{NewUser, PlatformFuture, UserDirectory, UserLookup, UserRecord},
};

/// Production Identity Toolkit base URL.
pub const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/";
/// Bearer token the Auth emulator accepts for admin calls.
pub const EMULATOR_ADMIN_TOKEN: &str = "owner";

const LOOKUP: &str = "lookup";
const CREATE: &str = "create";
const DUPLICATE_LOCAL_ID: &str = "DUPLICATE_LOCAL_ID";

#[derive(Serialize)]
struct LookupRequest<'a> {
	#[serde(rename = "localId")]
	local_id: [&'a str; 1],
}

#[derive(Deserialize)]
struct LookupResponse {
	#[serde(default)]
	users: Vec<WireUser>,
}

#[derive(Deserialize)]
struct WireUser {
	#[serde(rename = "localId")]
	local_id: LocalUid,
	#[serde(rename = "displayName", default)]
	display_name: Option<String>,
	#[serde(rename = "photoUrl", default)]
	photo_url: Option<String>,
}
impl From<WireUser> for UserRecord {
	fn from(user: WireUser) -> Self {
		Self { uid: user.local_id, display_name: user.display_name, photo_url: user.photo_url }
	}
}

#[derive(Serialize)]
struct CreateRequest<'a> {
	#[serde(rename = "localId")]
	local_id: &'a str,
	#[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
	display_name: Option<&'a str>,
	#[serde(rename = "photoUrl", skip_serializing_if = "Option::is_none")]
	photo_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreateResponse {
	#[serde(rename = "localId")]
	local_id: LocalUid,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

/// [`UserDirectory`] that talks to Firebase Authentication.
#[derive(Clone)]
pub struct FirebaseDirectory {
	http: ReqwestHttpClient,
	tokens: Arc<dyn AccessTokenSource>,
	project_id: String,
	lookup_url: Url,
	create_url: Url,
}
impl FirebaseDirectory {
	/// Creates a directory for `project_id` against the production Identity Toolkit.
	pub fn new(
		project_id: impl Into<String>,
		http: ReqwestHttpClient,
		tokens: Arc<dyn AccessTokenSource>,
	) -> Result<Self, ConfigError> {
		let base = Url::parse(IDENTITY_TOOLKIT_BASE)
			.map_err(|e| ConfigError::invalid("IDENTITY_TOOLKIT_BASE", e.to_string()))?;

		Self::with_base_url(base, project_id, http, tokens)
	}

	/// Creates a directory that targets the Auth emulator listening on `host` (`host:port`).
	pub fn emulator(
		host: &str,
		project_id: impl Into<String>,
		http: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let base = Url::parse(&format!("http://{host}/identitytoolkit.googleapis.com/"))
			.map_err(|e| ConfigError::invalid("FIREBASE_AUTH_EMULATOR_HOST", e.to_string()))?;
		let tokens: Arc<dyn AccessTokenSource> =
			Arc::new(StaticTokenSource::new(EMULATOR_ADMIN_TOKEN));

		Self::with_base_url(base, project_id, http, tokens)
	}

	/// Creates a directory rooted at an arbitrary Identity Toolkit base URL.
	pub fn with_base_url(
		mut base: Url,
		project_id: impl Into<String>,
		http: ReqwestHttpClient,
		tokens: Arc<dyn AccessTokenSource>,
	) -> Result<Self, ConfigError> {
		let project_id = project_id.into();

		if project_id.is_empty() || project_id.contains('/') {
			return Err(ConfigError::invalid("FIREBASE_PROJECT_ID", "must be a bare project id"));
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let join = |suffix: &str| {
			base.join(&format!("v1/projects/{project_id}/{suffix}"))
				.map_err(|e| ConfigError::invalid("FIREBASE_PROJECT_ID", e.to_string()))
		};
		let lookup_url = join("accounts:lookup")?;
		let create_url = join("accounts")?;

		Ok(Self { http, tokens, project_id, lookup_url, create_url })
	}

	/// Project the directory writes to.
	pub fn project_id(&self) -> &str {
		&self.project_id
	}

	async fn lookup(&self, uid: &LocalUid) -> Result<UserLookup, PlatformError> {
		let token = self.tokens.access_token().await?;
		let body = LookupRequest { local_id: [uid.as_ref()] };
		let reply = self
			.http
			.post_json(&self.lookup_url, token.expose(), &body)
			.await
			.map_err(|source| PlatformError::Transport { operation: LOOKUP, source })?;
		let response: LookupResponse = parse(LOOKUP, &reply)?;

		Ok(response
			.users
			.into_iter()
			.find(|user| &user.local_id == uid)
			.map_or(UserLookup::NotFound, |user| UserLookup::Found(user.into())))
	}

	async fn create(&self, user: NewUser) -> Result<UserRecord, PlatformError> {
		let token = self.tokens.access_token().await?;
		let body = CreateRequest {
			local_id: user.uid.as_ref(),
			display_name: user.display_name.as_deref(),
			photo_url: user.photo_url.as_deref(),
		};
		let reply = self
			.http
			.post_json(&self.create_url, token.expose(), &body)
			.await
			.map_err(|source| PlatformError::Transport { operation: CREATE, source })?;

		if !reply.is_success() && error_message(&reply).starts_with(DUPLICATE_LOCAL_ID) {
			return Err(PlatformError::UserAlreadyExists { uid: user.uid.to_string() });
		}

		let response: CreateResponse = parse(CREATE, &reply)?;

		Ok(UserRecord { uid: response.local_id, ..user.into() })
	}
}
impl UserDirectory for FirebaseDirectory {
	fn get_user<'a>(&'a self, uid: &'a LocalUid) -> PlatformFuture<'a, UserLookup> {
		Box::pin(self.lookup(uid))
	}

	fn create_user(&self, user: NewUser) -> PlatformFuture<'_, UserRecord> {
		Box::pin(self.create(user))
	}
}
impl Debug for FirebaseDirectory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FirebaseDirectory")
			.field("project_id", &self.project_id)
			.field("lookup_url", &self.lookup_url.as_str())
			.field("create_url", &self.create_url.as_str())
			.finish_non_exhaustive()
	}
}

fn parse<T>(operation: &'static str, reply: &HttpReply) -> Result<T, PlatformError>
where
	T: serde::de::DeserializeOwned,
{
	if !reply.is_success() {
		return Err(PlatformError::Status {
			operation,
			status: reply.status,
			message: error_message(reply),
		});
	}

	reply.json().map_err(|source| PlatformError::MalformedResponse { operation, source })
}

/// Extracts `error.message` from a Google API error envelope, falling back to the raw body.
fn error_message(reply: &HttpReply) -> String {
	serde_json::from_slice::<ErrorEnvelope>(&reply.body)
		.map(|envelope| envelope.error.message)
		.unwrap_or_else(|_| reply.body_preview())
}
