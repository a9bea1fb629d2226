// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Verification endpoint is mandatory.
	#[error("Missing verify endpoint.")]
	MissingVerifyEndpoint,
	/// Profile endpoint is mandatory.
	#[error("Missing profile endpoint.")]
	MissingProfileEndpoint,
	/// Endpoints must use HTTPS (loopback hosts may use plain HTTP).
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint string could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL: {reason}.")]
	InvalidUrl {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Parser message.
		reason: String,
	},
	/// Namespace cannot be used as a uid prefix.
	#[error("Provider namespace is invalid: {reason}.")]
	InvalidNamespace {
		/// Validation message.
		reason: String,
	},
}
impl ProviderDescriptorError {
	pub(crate) fn invalid_url(endpoint: &'static str, err: url::ParseError) -> Self {
		Self::InvalidUrl { endpoint, reason: err.to_string() }
	}
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Namespace for the descriptor being constructed.
	pub id: ProviderId,
	/// Token verification endpoint.
	pub verify_endpoint: Option<Url>,
	/// Profile endpoint.
	pub profile_endpoint: Option<Url>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided namespace.
	pub fn new(id: ProviderId) -> Self {
		Self { id, verify_endpoint: None, profile_endpoint: None }
	}

	/// Sets the verification endpoint.
	pub fn verify_endpoint(mut self, url: Url) -> Self {
		self.verify_endpoint = Some(url);

		self
	}

	/// Sets the profile endpoint.
	pub fn profile_endpoint(mut self, url: Url) -> Self {
		self.profile_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let verify = self.verify_endpoint.ok_or(ProviderDescriptorError::MissingVerifyEndpoint)?;
		let profile =
			self.profile_endpoint.ok_or(ProviderDescriptorError::MissingProfileEndpoint)?;
		let descriptor =
			ProviderDescriptor { id: self.id, endpoints: ProviderEndpoints { verify, profile } };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if self.id.contains(':') {
			return Err(ProviderDescriptorError::InvalidNamespace {
				reason: "namespace contains `:`".into(),
			});
		}

		validate_endpoint("verify", &self.endpoints.verify)?;
		validate_endpoint("profile", &self.endpoints.profile)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain == "localhost",
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder(ProviderId::new("line").expect("valid namespace"))
	}

	#[test]
	fn rejects_missing_endpoints() {
		let err = builder()
			.profile_endpoint(url("https://api.example.com/profile"))
			.build()
			.expect_err("Missing verify endpoint should be rejected.");

		assert_eq!(err, ProviderDescriptorError::MissingVerifyEndpoint);

		let err = builder()
			.verify_endpoint(url("https://api.example.com/verify"))
			.build()
			.expect_err("Missing profile endpoint should be rejected.");

		assert_eq!(err, ProviderDescriptorError::MissingProfileEndpoint);
	}

	#[test]
	fn rejects_plain_http_for_remote_hosts() {
		let err = builder()
			.verify_endpoint(url("http://api.example.com/verify"))
			.profile_endpoint(url("https://api.example.com/profile"))
			.build()
			.expect_err("Plain HTTP should be rejected for remote hosts.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "verify", .. }));
	}

	#[test]
	fn allows_plain_http_on_loopback() {
		let descriptor = builder()
			.verify_endpoint(url("http://127.0.0.1:8080/verify"))
			.profile_endpoint(url("http://localhost:8080/profile"))
			.build()
			.expect("Loopback endpoints should be accepted.");

		assert_eq!(descriptor.endpoints.verify.port(), Some(8080));
	}
}
