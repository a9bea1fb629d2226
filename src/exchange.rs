//! Token-exchange orchestration: verify, map identity, mint.
//!
//! [`Exchanger`] owns the provider client, the configured channel, the user directory and the
//! credential minter. Steps run strictly in sequence; every outbound call is a single attempt.

pub mod identity;
pub mod mint;
pub mod verify;

pub use identity::ResolvedUser;

// crates.io
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ChannelId, CustomToken},
	config::ExchangeConfig,
	credential::{CredentialMinter, ServiceAccountSigner},
	error::ConfigError,
	http::ReqwestHttpClient,
	obs::{self, ExchangeStep, StepOutcome},
	platform::{
		AccessTokenSource, FirebaseDirectory, ServiceAccountTokenSource, UserDirectory, UserRecord,
	},
	provider::LineClient,
};

/// Successful exchange result.
#[derive(Clone, Debug)]
pub struct ExchangeOutcome {
	/// User the credential is bound to.
	pub user: UserRecord,
	/// Whether this exchange provisioned the user.
	pub created: bool,
	/// Custom token for the client SDK.
	pub credential: CustomToken,
}

/// Coordinates the three-step exchange against a single provider and identity platform.
#[derive(Clone)]
pub struct Exchanger {
	/// Client for the provider's verification and profile endpoints.
	pub provider: LineClient,
	/// Channel tokens must have been issued for.
	pub channel_id: ChannelId,
	/// Identity-platform user directory.
	pub directory: Arc<dyn UserDirectory>,
	/// Identity-platform credential minter.
	pub minter: Arc<dyn CredentialMinter>,
}
impl Exchanger {
	/// Creates an exchanger from its collaborators.
	pub fn new(
		provider: LineClient,
		channel_id: ChannelId,
		directory: Arc<dyn UserDirectory>,
		minter: Arc<dyn CredentialMinter>,
	) -> Self {
		Self { provider, channel_id, directory, minter }
	}

	/// Wires the production collaborators described by `config`.
	///
	/// Fails when the service-account key cannot sign or the HTTP client cannot be built, so the
	/// binary can refuse to start.
	pub fn from_config(config: &ExchangeConfig) -> Result<Self, ConfigError> {
		let http = ReqwestHttpClient::with_timeout(config.upstream_timeout)?;
		let provider = LineClient::new(config.descriptor.clone(), http.clone());
		let minter: Arc<dyn CredentialMinter> =
			Arc::new(ServiceAccountSigner::new(&config.service_account)?);
		let directory: Arc<dyn UserDirectory> = match &config.emulator_host {
			Some(host) => {
				tracing::info!(host = %host, "targeting the Auth emulator");

				Arc::new(FirebaseDirectory::emulator(host, config.project_id.clone(), http)?)
			},
			None => {
				let tokens: Arc<dyn AccessTokenSource> = Arc::new(ServiceAccountTokenSource::new(
					&config.service_account,
					http.clone(),
				)?);

				Arc::new(FirebaseDirectory::new(config.project_id.clone(), http, tokens)?)
			},
		};

		Ok(Self::new(provider, config.channel_id.clone(), directory, minter))
	}

	/// Exchanges a provider access token for a custom token, provisioning the user if needed.
	pub async fn exchange(&self, token: &AccessToken) -> Result<ExchangeOutcome> {
		if token.is_empty() {
			return Err(Error::MissingInput);
		}

		observe(ExchangeStep::Exchange, "exchange", async {
			let verification = self.verify(token).await?;
			let resolved = self.resolve_user(&verification, token).await?;
			let credential = self.mint(&resolved.user.uid).await?;

			Ok(ExchangeOutcome { user: resolved.user, created: resolved.created, credential })
		})
		.await
	}
}
impl Debug for Exchanger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Exchanger")
			.field("provider", self.provider.descriptor())
			.field("channel_id", &self.channel_id)
			.finish_non_exhaustive()
	}
}

/// Runs `fut` under the span of `step`, counting its entry and its result.
pub(crate) async fn observe<T, Fut>(step: ExchangeStep, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	obs::record_step_outcome(step, StepOutcome::Attempt);

	let result = fut.instrument(obs::step_span(step, stage)).await;

	obs::record_step_outcome(step, StepOutcome::of(&result));

	result
}
