//! Token verification: ask the provider who the token belongs to, then pin the audience.
//!
//! The profile endpoint alone cannot tell tokens issued for another channel apart from ours, so
//! the channel comparison is never skipped.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	exchange::{Exchanger, observe},
	obs::ExchangeStep,
	provider::Verification,
};

impl Exchanger {
	/// Verifies `token` with the provider and checks it was issued for the configured channel.
	pub async fn verify(&self, token: &AccessToken) -> Result<Verification> {
		observe(ExchangeStep::Verify, "verify", async {
			let verification = self.provider.verify(token).await?;

			if verification.audience_id != self.channel_id.as_ref() {
				tracing::warn!(
					subject = %verification.subject_id,
					audience = %verification.audience_id,
					"access token was issued for a different channel"
				);

				return Err(Error::AudienceMismatch {
					expected: self.channel_id.to_string(),
					actual: verification.audience_id,
				});
			}

			Ok(verification)
		})
		.await
	}
}
