//! Identity mapping: provider subject to local user, provisioning on first sign-in.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, LocalUid},
	error::ProviderError,
	exchange::{Exchanger, observe},
	obs::ExchangeStep,
	platform::{NewUser, UserLookup, UserRecord},
	provider::Verification,
};

/// User resolved for a verified subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedUser {
	/// Directory record.
	pub user: UserRecord,
	/// True when the record was created by this call.
	pub created: bool,
}

impl Exchanger {
	/// Derives the local uid for a verified subject.
	pub fn local_uid(&self, verification: &Verification) -> Result<LocalUid> {
		LocalUid::derive(&self.provider.descriptor().id, &verification.subject_id)
			.map_err(|e| Error::InvalidToken(ProviderError::InvalidSubject(e)))
	}

	/// Returns the existing user for `verification`, or creates one from the provider profile.
	///
	/// An existing record is returned untouched. The profile is only fetched, with the caller's
	/// token, when the directory reports the uid as missing. Lookup failures propagate without a
	/// create attempt.
	pub async fn resolve_user(
		&self,
		verification: &Verification,
		token: &AccessToken,
	) -> Result<ResolvedUser> {
		observe(ExchangeStep::MapIdentity, "resolve_user", async {
			let uid = self.local_uid(verification)?;
			let lookup = self.directory.get_user(&uid).await?;

			match lookup {
				UserLookup::Found(user) => {
					tracing::debug!(uid = %user.uid, "existing user resolved");

					Ok(ResolvedUser { user, created: false })
				},
				UserLookup::NotFound => {
					let profile = self.provider.profile(token).await?;
					let user = self
						.directory
						.create_user(NewUser {
							uid,
							display_name: Some(profile.display_name),
							photo_url: profile.picture_url,
						})
						.await?;

					tracing::info!(uid = %user.uid, "provisioned new user");

					Ok(ResolvedUser { user, created: true })
				},
			}
		})
		.await
	}
}
