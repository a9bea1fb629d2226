//! Provider descriptor data structures shared by the verifier and identity mapper.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// Namespace prefixed to every LINE subject when deriving local uids.
pub const LINE_NAMESPACE: &str = "line";
/// LINE token verification endpoint.
pub const LINE_VERIFY_ENDPOINT: &str = "https://api.line.me/v1/oauth/verify";
/// LINE profile endpoint.
pub const LINE_PROFILE_ENDPOINT: &str = "https://api.line.me/v1/profile";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Token verification (introspection) endpoint.
	pub verify: Url,
	/// Profile endpoint queried when provisioning a new user.
	pub profile: Url,
}

/// Immutable provider descriptor consumed by the exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Namespace used as the local uid prefix.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided namespace.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Returns a builder pre-populated with LINE's production endpoints.
	pub fn line() -> Result<ProviderDescriptorBuilder, ProviderDescriptorError> {
		let id = ProviderId::namespace(LINE_NAMESPACE)
			.map_err(|e| ProviderDescriptorError::InvalidNamespace { reason: e.to_string() })?;
		let verify = Url::parse(LINE_VERIFY_ENDPOINT)
			.map_err(|e| ProviderDescriptorError::invalid_url("verify", e))?;
		let profile = Url::parse(LINE_PROFILE_ENDPOINT)
			.map_err(|e| ProviderDescriptorError::invalid_url("profile", e))?;

		Ok(Self::builder(id).verify_endpoint(verify).profile_endpoint(profile))
	}
}
