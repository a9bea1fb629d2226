//! Bearer-authenticated client for LINE's verification and profile endpoints.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SubjectId},
	error::ProviderError,
	http::{HttpReply, ReqwestHttpClient},
	provider::ProviderDescriptor,
};

const VERIFY: &str = "verify";
const PROFILE: &str = "profile";

/// Trusted output of the provider's verification endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
	/// Provider subject (`mid`).
	pub subject_id: SubjectId,
	/// Channel the token was issued for (`channelId`), normalized to a string.
	pub audience_id: String,
}

/// Profile fields used to populate a newly provisioned user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderProfile {
	/// Display name shown by the provider.
	pub display_name: String,
	/// Avatar URL, when the user has one.
	pub picture_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
	mid: String,
	#[serde(rename = "channelId")]
	channel_id: WireChannelId,
}

/// LINE has reported `channelId` both as a JSON number and as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireChannelId {
	Number(u64),
	Text(String),
}
impl From<WireChannelId> for String {
	fn from(value: WireChannelId) -> Self {
		match value {
			WireChannelId::Number(n) => n.to_string(),
			WireChannelId::Text(s) => s,
		}
	}
}

#[derive(Deserialize)]
struct ProfileBody {
	#[serde(rename = "displayName")]
	display_name: String,
	#[serde(rename = "pictureUrl", default)]
	picture_url: Option<String>,
}

/// Client for the provider endpoints declared by a [`ProviderDescriptor`].
#[derive(Clone, Debug)]
pub struct LineClient {
	http: ReqwestHttpClient,
	descriptor: ProviderDescriptor,
}
impl LineClient {
	/// Creates a client that calls the descriptor's endpoints through `http`.
	pub fn new(descriptor: ProviderDescriptor, http: ReqwestHttpClient) -> Self {
		Self { http, descriptor }
	}

	/// Returns the descriptor backing this client.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Asks the provider who `token` belongs to and which channel it was issued for.
	///
	/// This does not compare the audience; that decision belongs to the caller.
	pub async fn verify(&self, token: &AccessToken) -> Result<Verification, ProviderError> {
		let reply = self
			.http
			.get_bearer(&self.descriptor.endpoints.verify, token.expose())
			.await
			.map_err(|source| ProviderError::Transport { endpoint: VERIFY, source })?;
		let body: VerifyBody = parse(VERIFY, &reply)?;

		Ok(Verification {
			subject_id: SubjectId::new(body.mid)?,
			audience_id: body.channel_id.into(),
		})
	}

	/// Fetches the profile of the user `token` belongs to.
	pub async fn profile(&self, token: &AccessToken) -> Result<ProviderProfile, ProviderError> {
		let reply = self
			.http
			.get_bearer(&self.descriptor.endpoints.profile, token.expose())
			.await
			.map_err(|source| ProviderError::Transport { endpoint: PROFILE, source })?;
		let body: ProfileBody = parse(PROFILE, &reply)?;

		Ok(ProviderProfile {
			display_name: body.display_name,
			picture_url: body.picture_url.filter(|url| !url.is_empty()),
		})
	}
}

fn parse<T>(endpoint: &'static str, reply: &HttpReply) -> Result<T, ProviderError>
where
	T: serde::de::DeserializeOwned,
{
	if !reply.is_success() {
		return Err(ProviderError::Rejected {
			endpoint,
			status: reply.status,
			body: reply.body_preview(),
		});
	}

	reply.json().map_err(|source| ProviderError::MalformedResponse { endpoint, source })
}
