//! Service configuration loaded from the environment and validated before the listener binds.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::ChannelId,
	credential::ServiceAccountKey,
	error::ConfigError,
	provider::ProviderDescriptor,
};

/// Expected provider audience.
pub const ENV_CHANNEL_ID: &str = "LINE_CHANNEL_ID";
/// Override for the provider verification endpoint.
pub const ENV_VERIFY_URL: &str = "LINE_VERIFY_URL";
/// Override for the provider profile endpoint.
pub const ENV_PROFILE_URL: &str = "LINE_PROFILE_URL";
/// Path to the service-account JSON key.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Override for the identity-platform project.
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
/// `host:port` of a local Auth emulator.
pub const ENV_EMULATOR_HOST: &str = "FIREBASE_AUTH_EMULATOR_HOST";
/// Listen address.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
/// Per-call outbound timeout in whole seconds.
pub const ENV_UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT_SECS";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
	SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);
/// Default per-call outbound timeout.
pub const DEFAULT_UPSTREAM_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Validated settings for one exchange service instance.
#[derive(Clone, Debug)]
pub struct ExchangeConfig {
	/// Channel tokens must have been issued for.
	pub channel_id: ChannelId,
	/// Provider namespace and endpoints.
	pub descriptor: ProviderDescriptor,
	/// Key used to mint custom tokens and authenticate admin calls.
	pub service_account: ServiceAccountKey,
	/// Identity-platform project users are written to.
	pub project_id: String,
	/// Auth emulator `host:port`, when targeting a local emulator.
	pub emulator_host: Option<String>,
	/// Listen address.
	pub bind_addr: SocketAddr,
	/// Timeout applied to every outbound call.
	pub upstream_timeout: StdDuration,
}
impl ExchangeConfig {
	/// Creates a new builder.
	pub fn builder() -> ExchangeConfigBuilder {
		ExchangeConfigBuilder::default()
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through `lookup`; empty values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let channel = get(ENV_CHANNEL_ID).ok_or(ConfigError::Missing { name: ENV_CHANNEL_ID })?;
		let channel_id =
			ChannelId::new(&channel).map_err(|e| ConfigError::invalid(ENV_CHANNEL_ID, e.to_string()))?;
		let mut descriptor = ProviderDescriptor::line()?;

		if let Some(url) = get(ENV_VERIFY_URL) {
			descriptor = descriptor.verify_endpoint(parse_url(ENV_VERIFY_URL, &url)?);
		}
		if let Some(url) = get(ENV_PROFILE_URL) {
			descriptor = descriptor.profile_endpoint(parse_url(ENV_PROFILE_URL, &url)?);
		}

		let key_path = get(ENV_CREDENTIALS).ok_or(ConfigError::Missing { name: ENV_CREDENTIALS })?;
		let mut builder = Self::builder()
			.channel_id(channel_id)
			.descriptor(descriptor.build()?)
			.service_account(ServiceAccountKey::from_file(&key_path)?);

		if let Some(project_id) = get(ENV_PROJECT_ID) {
			builder = builder.project_id(project_id);
		}
		if let Some(host) = get(ENV_EMULATOR_HOST) {
			builder = builder.emulator_host(host);
		}
		if let Some(addr) = get(ENV_BIND_ADDR) {
			let addr = addr
				.parse::<SocketAddr>()
				.map_err(|e| ConfigError::invalid(ENV_BIND_ADDR, e.to_string()))?;

			builder = builder.bind_addr(addr);
		}
		if let Some(secs) = get(ENV_UPSTREAM_TIMEOUT) {
			let secs = secs
				.parse::<u64>()
				.map_err(|e| ConfigError::invalid(ENV_UPSTREAM_TIMEOUT, e.to_string()))?;

			builder = builder.upstream_timeout(StdDuration::from_secs(secs));
		}

		builder.build()
	}
}

/// Builder for [`ExchangeConfig`].
#[derive(Clone, Debug, Default)]
pub struct ExchangeConfigBuilder {
	channel_id: Option<ChannelId>,
	descriptor: Option<ProviderDescriptor>,
	service_account: Option<ServiceAccountKey>,
	project_id: Option<String>,
	emulator_host: Option<String>,
	bind_addr: Option<SocketAddr>,
	upstream_timeout: Option<StdDuration>,
}
impl ExchangeConfigBuilder {
	/// Sets the expected channel.
	pub fn channel_id(mut self, channel_id: ChannelId) -> Self {
		self.channel_id = Some(channel_id);

		self
	}

	/// Sets the provider descriptor; defaults to LINE's production endpoints.
	pub fn descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = Some(descriptor);

		self
	}

	/// Sets the service-account key.
	pub fn service_account(mut self, key: ServiceAccountKey) -> Self {
		self.service_account = Some(key);

		self
	}

	/// Overrides the project taken from the service-account key.
	pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
		self.project_id = Some(project_id.into());

		self
	}

	/// Targets the Auth emulator on `host` (`host:port`).
	pub fn emulator_host(mut self, host: impl Into<String>) -> Self {
		self.emulator_host = Some(host.into());

		self
	}

	/// Sets the listen address.
	pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
		self.bind_addr = Some(addr);

		self
	}

	/// Sets the per-call outbound timeout.
	pub fn upstream_timeout(mut self, timeout: StdDuration) -> Self {
		self.upstream_timeout = Some(timeout);

		self
	}

	/// Validates the settings and produces an [`ExchangeConfig`].
	pub fn build(self) -> Result<ExchangeConfig, ConfigError> {
		let channel_id = self.channel_id.ok_or(ConfigError::Missing { name: ENV_CHANNEL_ID })?;
		let service_account =
			self.service_account.ok_or(ConfigError::Missing { name: ENV_CREDENTIALS })?;
		let descriptor = match self.descriptor {
			Some(descriptor) => descriptor,
			None => ProviderDescriptor::line()?.build()?,
		};
		let project_id = self.project_id.unwrap_or_else(|| service_account.project_id.clone());

		if project_id.is_empty() {
			return Err(ConfigError::Missing { name: ENV_PROJECT_ID });
		}

		let upstream_timeout = self.upstream_timeout.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT);

		if upstream_timeout.is_zero() {
			return Err(ConfigError::invalid(ENV_UPSTREAM_TIMEOUT, "must be greater than zero"));
		}

		Ok(ExchangeConfig {
			channel_id,
			descriptor,
			service_account,
			project_id,
			emulator_host: self.emulator_host,
			bind_addr: self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR),
			upstream_timeout,
		})
	}
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|e| ConfigError::invalid(name, e.to_string()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::{LINE_PROFILE_ENDPOINT, LINE_VERIFY_ENDPOINT, ProviderDescriptorError};

	const FIXTURE_KEY: &str =
		concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/service_account.json");

	fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	fn load(pairs: &[(&str, &str)]) -> Result<ExchangeConfig, ConfigError> {
		let vars = env(pairs);

		ExchangeConfig::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn minimal_environment_uses_defaults() -> color_eyre::Result<()> {
		let config = load(&[(ENV_CHANNEL_ID, "1234567890"), (ENV_CREDENTIALS, FIXTURE_KEY)])?;

		assert_eq!(config.channel_id.as_ref(), "1234567890");
		assert_eq!(config.project_id, "line-auth-test");
		assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
		assert_eq!(config.upstream_timeout, DEFAULT_UPSTREAM_TIMEOUT);
		assert_eq!(config.emulator_host, None);
		assert_eq!(config.descriptor.endpoints.verify.as_str(), LINE_VERIFY_ENDPOINT);
		assert_eq!(config.descriptor.endpoints.profile.as_str(), LINE_PROFILE_ENDPOINT);

		Ok(())
	}

	#[test]
	fn overrides_are_applied() -> color_eyre::Result<()> {
		let config = load(&[
			(ENV_CHANNEL_ID, "42"),
			(ENV_CREDENTIALS, FIXTURE_KEY),
			(ENV_PROJECT_ID, "other-project"),
			(ENV_EMULATOR_HOST, "127.0.0.1:9099"),
			(ENV_BIND_ADDR, "127.0.0.1:3000"),
			(ENV_UPSTREAM_TIMEOUT, "3"),
			(ENV_VERIFY_URL, "https://line.example.com/verify"),
		])?;

		assert_eq!(config.project_id, "other-project");
		assert_eq!(config.emulator_host.as_deref(), Some("127.0.0.1:9099"));
		assert_eq!(config.bind_addr.port(), 3000);
		assert_eq!(config.upstream_timeout, StdDuration::from_secs(3));
		assert_eq!(config.descriptor.endpoints.verify.as_str(), "https://line.example.com/verify");

		Ok(())
	}

	#[test]
	fn missing_channel_is_fatal() {
		let err = load(&[(ENV_CREDENTIALS, FIXTURE_KEY)]).expect_err("Channel is required.");

		assert!(matches!(err, ConfigError::Missing { name: ENV_CHANNEL_ID }));

		let err = load(&[(ENV_CHANNEL_ID, "  "), (ENV_CREDENTIALS, FIXTURE_KEY)])
			.expect_err("Blank channel counts as unset.");

		assert!(matches!(err, ConfigError::Missing { name: ENV_CHANNEL_ID }));
	}

	#[test]
	fn missing_or_unreadable_credentials_are_fatal() {
		let err = load(&[(ENV_CHANNEL_ID, "42")]).expect_err("Credentials are required.");

		assert!(matches!(err, ConfigError::Missing { name: ENV_CREDENTIALS }));

		let err = load(&[(ENV_CHANNEL_ID, "42"), (ENV_CREDENTIALS, "/nonexistent/key.json")])
			.expect_err("Unreadable key must fail.");

		assert!(matches!(err, ConfigError::ServiceAccountRead { .. }));
	}

	#[test]
	fn insecure_provider_endpoint_is_rejected() {
		let err = load(&[
			(ENV_CHANNEL_ID, "42"),
			(ENV_CREDENTIALS, FIXTURE_KEY),
			(ENV_PROFILE_URL, "http://line.example.com/profile"),
		])
		.expect_err("Plain HTTP must be rejected for remote hosts.");

		assert!(matches!(
			err,
			ConfigError::Descriptor(ProviderDescriptorError::InsecureEndpoint { .. })
		));
	}

	#[test]
	fn invalid_numbers_are_rejected() {
		let zero = load(&[
			(ENV_CHANNEL_ID, "42"),
			(ENV_CREDENTIALS, FIXTURE_KEY),
			(ENV_UPSTREAM_TIMEOUT, "0"),
		])
		.expect_err("Zero timeout must be rejected.");

		assert!(matches!(zero, ConfigError::Invalid { name: ENV_UPSTREAM_TIMEOUT, .. }));

		let addr = load(&[
			(ENV_CHANNEL_ID, "42"),
			(ENV_CREDENTIALS, FIXTURE_KEY),
			(ENV_BIND_ADDR, "not-an-addr"),
		])
		.expect_err("Unparseable bind address must be rejected.");

		assert!(matches!(addr, ConfigError::Invalid { name: ENV_BIND_ADDR, .. }));
	}
}
